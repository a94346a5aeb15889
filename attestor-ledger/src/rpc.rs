//! JSON-RPC ledger client.
//!
//! Talks to a standard node RPC endpoint over HTTP. Transport and node
//! errors map to `LedgerError::Unavailable`; a transaction that fails to
//! confirm within the wait budget surfaces as `ConfirmationTimeout`. Revert
//! classification replays the call at the failing block and inspects the
//! node's error message.

use crate::client::LedgerClient;
use crate::types::{topics, Call, CallAction, LogEntry, LogFilter, Receipt, RevertReason, TxHandle, TxOutcome};
use async_trait::async_trait;
use attestor_core::{Address, AttributeKind, AttributeRecord, LedgerError, RoleId, Word};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Marker the attribute store's access-control guard embeds in its revert
/// message when the caller lacks the required role.
const MISSING_ROLE_MARKER: &str = "missing role";

/// [`LedgerClient`] backed by a JSON-RPC node endpoint.
///
/// Transaction signing is the node's concern: the submitting identity must
/// be unlocked at (or proxied through) the endpoint.
pub struct JsonRpcLedger {
    client: reqwest::Client,
    endpoint: String,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    request_id: AtomicU64,
}

impl JsonRpcLedger {
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        confirmation_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| LedgerError::unavailable(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            poll_interval: Duration::from_millis(500),
            confirmation_timeout,
            request_id: AtomicU64::new(1),
        })
    }

    async fn rpc(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| LedgerError::unavailable(format!("{method}: {err}")))?;
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| LedgerError::unavailable(format!("{method}: invalid response: {err}")))?;
        if let Some(error) = body.error {
            return Err(LedgerError::unavailable(format!(
                "{method}: node error {}: {}",
                error.code, error.message
            )));
        }
        body.result
            .ok_or_else(|| LedgerError::unavailable(format!("{method}: empty result")))
    }

    /// `eth_call` against current state, returning the raw return data.
    async fn view_call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let result = self
            .rpc(
                "eth_call",
                serde_json::json!([{ "to": to.to_string(), "data": encode_bytes(&data) }, "latest"]),
            )
            .await?;
        decode_bytes(&result)
    }

    /// Replay a failed transaction at its inclusion block to recover the
    /// revert message from the node error.
    async fn classify_revert(&self, tx: TxHandle, block: u64) -> Result<RevertReason, LedgerError> {
        let raw = self
            .rpc("eth_getTransactionByHash", serde_json::json!([tx.to_string()]))
            .await?;
        let fetched: RawTransaction = serde_json::from_value(raw)
            .map_err(|err| LedgerError::unavailable(format!("malformed transaction: {err}")))?;
        let replay = self
            .rpc(
                "eth_call",
                serde_json::json!([
                    { "from": fetched.from, "to": fetched.to, "data": fetched.input },
                    encode_quantity(block),
                ]),
            )
            .await;
        match replay {
            // The replay unexpectedly succeeds: report the raw failure.
            Ok(_) => Ok(RevertReason::Message("execution reverted".to_string())),
            Err(LedgerError::Unavailable { reason }) => {
                if reason.to_lowercase().contains(MISSING_ROLE_MARKER) {
                    Ok(RevertReason::MissingRole)
                } else {
                    Ok(RevertReason::Message(reason))
                }
            }
            Err(other) => Err(other),
        }
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn latest_block(&self) -> Result<u64, LedgerError> {
        let result = self.rpc("eth_blockNumber", serde_json::json!([])).await?;
        decode_quantity(&result)
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        if filter.range.is_empty() {
            return Ok(Vec::new());
        }
        // The node's range is inclusive; ours is half-open.
        let params = serde_json::json!([{
            "fromBlock": encode_quantity(filter.range.start),
            "toBlock": encode_quantity(filter.range.end - 1),
            "address": filter.contract.to_string(),
            "topics": [filter.topic0.to_string()],
        }]);
        let result = self.rpc("eth_getLogs", params).await?;
        let raw: Vec<RawLog> = serde_json::from_value(result)
            .map_err(|err| LedgerError::unavailable(format!("malformed log entry: {err}")))?;
        raw.into_iter().map(RawLog::into_entry).collect()
    }

    async fn read_slot(&self, contract: Address, slot: Word) -> Result<Word, LedgerError> {
        let result = self
            .rpc(
                "eth_getStorageAt",
                serde_json::json!([contract.to_string(), slot.to_string(), "latest"]),
            )
            .await?;
        decode_word(&result)
    }

    async fn get_attributes_bulk(
        &self,
        store: Address,
        account: Address,
        kinds: &[AttributeKind],
    ) -> Result<Vec<AttributeRecord>, LedgerError> {
        let data = abi::encode_get_attributes_bulk(account, kinds);
        let returned = self.view_call(store, data).await?;
        abi::decode_records(&returned)
    }

    async fn has_role(
        &self,
        governance: Address,
        role: RoleId,
        identity: Address,
    ) -> Result<bool, LedgerError> {
        let data = abi::encode_has_role(role, identity);
        let returned = self.view_call(governance, data).await?;
        abi::decode_bool(&returned)
    }

    async fn submit(&self, call: Call) -> Result<TxHandle, LedgerError> {
        let data = abi::encode_call(&call.action);
        let params = serde_json::json!([{
            "from": call.from.to_string(),
            "to": call.contract.to_string(),
            "data": encode_bytes(&data),
        }]);
        let result = self.rpc("eth_sendTransaction", params).await?;
        let hash = decode_word(&result)?;
        Ok(TxHandle(hash))
    }

    async fn confirm(&self, tx: TxHandle) -> Result<TxOutcome, LedgerError> {
        let started = Instant::now();
        loop {
            let result = self
                .rpc("eth_getTransactionReceipt", serde_json::json!([tx.to_string()]))
                .await?;
            if !result.is_null() {
                let raw: RawReceipt = serde_json::from_value(result)
                    .map_err(|err| LedgerError::unavailable(format!("malformed receipt: {err}")))?;
                let block_number = decode_quantity_str(&raw.block_number)?;
                if decode_quantity_str(&raw.status)? == 1 {
                    let migrated_topic = topics::ATTRIBUTE_MIGRATED.to_string();
                    let migrated = raw
                        .logs
                        .iter()
                        .filter(|log| log.topics.first() == Some(&migrated_topic))
                        .count() as u64;
                    return Ok(TxOutcome::Confirmed(Receipt { tx, block_number, migrated }));
                }
                let reason = self.classify_revert(tx, block_number).await?;
                return Ok(TxOutcome::Reverted(reason));
            }
            if started.elapsed() >= self.confirmation_timeout {
                return Err(LedgerError::ConfirmationTimeout {
                    tx: tx.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

// ============================================================================
// WIRE ENVELOPES
// ============================================================================

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: String,
    log_index: String,
}

impl RawLog {
    fn into_entry(self) -> Result<LogEntry, LedgerError> {
        let address = self
            .address
            .parse::<Address>()
            .map_err(|err| LedgerError::unavailable(format!("malformed log address: {err}")))?;
        let topics = self
            .topics
            .iter()
            .map(|topic| {
                topic
                    .parse::<Word>()
                    .map_err(|err| LedgerError::unavailable(format!("malformed topic: {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LogEntry {
            address,
            topics,
            data: decode_bytes_str(&self.data)?,
            block_number: decode_quantity_str(&self.block_number)?,
            log_index: decode_quantity_str(&self.log_index)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: String,
    block_number: String,
    #[serde(default)]
    logs: Vec<RawReceiptLog>,
}

#[derive(Deserialize)]
struct RawReceiptLog {
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Deserialize)]
struct RawTransaction {
    from: String,
    to: String,
    input: String,
}

// ============================================================================
// HEX QUANTITIES AND BYTES
// ============================================================================

fn encode_quantity(value: u64) -> String {
    format!("{value:#x}")
}

fn decode_quantity(value: &serde_json::Value) -> Result<u64, LedgerError> {
    let s = value
        .as_str()
        .ok_or_else(|| LedgerError::unavailable("expected hex quantity"))?;
    decode_quantity_str(s)
}

fn decode_quantity_str(s: &str) -> Result<u64, LedgerError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16)
        .map_err(|_| LedgerError::unavailable(format!("invalid hex quantity: {s}")))
}

fn encode_bytes(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn decode_bytes(value: &serde_json::Value) -> Result<Vec<u8>, LedgerError> {
    let s = value
        .as_str()
        .ok_or_else(|| LedgerError::unavailable("expected hex data"))?;
    decode_bytes_str(s)
}

fn decode_bytes_str(s: &str) -> Result<Vec<u8>, LedgerError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|_| LedgerError::unavailable(format!("invalid hex data: {s}")))
}

fn decode_word(value: &serde_json::Value) -> Result<Word, LedgerError> {
    let s = value
        .as_str()
        .ok_or_else(|| LedgerError::unavailable("expected hex word"))?;
    s.parse::<Word>()
        .map_err(|err| LedgerError::unavailable(format!("invalid word: {err}")))
}

// ============================================================================
// CALL ENCODING
// ============================================================================

/// Minimal ABI encoding for the handful of call shapes the coordinator
/// drives: 32-byte words, addresses left-padded, dynamic arrays as
/// offset + length + elements.
pub(crate) mod abi {
    use super::*;

    const WORD: usize = 32;

    fn push_word(buffer: &mut Vec<u8>, word: Word) {
        buffer.extend_from_slice(word.as_bytes());
    }

    pub fn encode_call(action: &CallAction) -> Vec<u8> {
        let mut data = action.selector().to_vec();
        match action {
            CallAction::MigrateAttributes(accounts) => {
                push_word(&mut data, Word::from_u64(WORD as u64)); // array offset
                push_word(&mut data, Word::from_u64(accounts.len() as u64));
                for account in accounts {
                    push_word(&mut data, Word::from_address(*account));
                }
            }
            CallAction::UpgradeLogic(logic) => {
                push_word(&mut data, Word::from_address(*logic));
            }
        }
        data
    }

    pub fn encode_get_attributes_bulk(account: Address, kinds: &[AttributeKind]) -> Vec<u8> {
        let selector = Word::named("getAttributesBulk(address,bytes32[])");
        let mut data = selector.as_bytes()[..4].to_vec();
        push_word(&mut data, Word::from_address(account));
        push_word(&mut data, Word::from_u64(2 * WORD as u64)); // array offset
        push_word(&mut data, Word::from_u64(kinds.len() as u64));
        for kind in kinds {
            push_word(&mut data, kind.as_word());
        }
        data
    }

    pub fn encode_has_role(role: RoleId, identity: Address) -> Vec<u8> {
        let selector = Word::named("hasRole(bytes32,address)");
        let mut data = selector.as_bytes()[..4].to_vec();
        push_word(&mut data, role.as_word());
        push_word(&mut data, Word::from_address(identity));
        data
    }

    fn word_at(data: &[u8], index: usize) -> Result<Word, LedgerError> {
        let start = index * WORD;
        let end = start + WORD;
        if data.len() < end {
            return Err(LedgerError::unavailable("truncated return data"));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&data[start..end]);
        Ok(Word(bytes))
    }

    /// Decode `(bytes32 value, uint64 epoch, address issuer)[]`.
    pub fn decode_records(data: &[u8]) -> Result<Vec<AttributeRecord>, LedgerError> {
        let length = word_at(data, 1)?.to_u64() as usize;
        let mut records = Vec::with_capacity(length);
        for i in 0..length {
            let base = 2 + i * 3;
            records.push(AttributeRecord {
                value: word_at(data, base)?,
                epoch: word_at(data, base + 1)?.to_u64(),
                issuer: word_at(data, base + 2)?.to_address(),
            });
        }
        Ok(records)
    }

    pub fn decode_bool(data: &[u8]) -> Result<bool, LedgerError> {
        Ok(!word_at(data, 0)?.is_zero())
    }

}
