//! Identity primitives for ledger entities.
//!
//! Addresses and storage words are fixed-length opaque keys. Both render as
//! `0x`-prefixed lowercase hex and round-trip through serde as strings so
//! they read naturally in checkpoints, configs, and wire payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The canonical null-origin sentinel. A mint event carries this as its
    /// origin; it is never a valid account.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a label. Test fixtures and
    /// documentation use this; production addresses come from configuration.
    pub fn derived(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_fixed::<20>(s)?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 32-byte ledger word: storage slot values, event topics, role and
/// attribute-kind identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Word(pub [u8; 32]);

impl Word {
    pub const ZERO: Word = Word([0u8; 32]);

    /// Derive a word from a domain-tagged label (SHA-256 of the label).
    /// Protocol-wide identifiers (event topics, role ids, attribute kinds)
    /// are all derived this way so both sides of the wire agree on them.
    pub fn named(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Word(bytes)
    }

    /// Embed an address into a word, left-padded with zeroes. Event topics
    /// and slot values carry addresses in this form.
    pub fn from_address(address: Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(address.as_bytes());
        Word(bytes)
    }

    /// Extract the address embedded in the low 20 bytes of this word.
    pub fn to_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.0[12..]);
        Address(bytes)
    }

    /// Embed a u64 into a word, big-endian, left-padded with zeroes.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Word(bytes)
    }

    /// Read the low 8 bytes of this word as a big-endian u64.
    pub fn to_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[24..]);
        u64::from_be_bytes(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Word {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_fixed::<32>(s)?;
        Ok(Word(bytes))
    }
}

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier for an attribute kind stored against an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct AttributeKind(pub Word);

impl AttributeKind {
    /// Derive a kind identifier from a protocol-tagged label.
    pub fn named(label: &str) -> Self {
        AttributeKind(Word::named(label))
    }

    pub fn as_word(&self) -> Word {
        self.0
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error when parsing a fixed-length hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexParseError {
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),
    #[error("Expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexParseError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let raw = hex::decode(stripped).map_err(|_| HexParseError::InvalidHex(s.to_string()))?;
    if raw.len() != N {
        return Err(HexParseError::WrongLength {
            expected: N,
            got: raw.len(),
        });
    }
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&raw);
    Ok(bytes)
}

// ============================================================================
// WELL-KNOWN ATTRIBUTE KINDS
// ============================================================================

/// Attribute kinds the attestation protocol ships with. Deployments may
/// register further kinds; the coordinator treats all of them opaquely.
pub mod kinds {
    use super::AttributeKind;
    use once_cell::sync::Lazy;

    /// Digest of the account's attested identity document.
    pub static IDENTITY_DIGEST: Lazy<AttributeKind> =
        Lazy::new(|| AttributeKind::named("attestor.v1.kind.identity-digest"));

    /// Jurisdiction code the issuer attested for the account.
    pub static JURISDICTION: Lazy<AttributeKind> =
        Lazy::new(|| AttributeKind::named("attestor.v1.kind.jurisdiction"));

    /// Compliance screening status.
    pub static COMPLIANCE_STATUS: Lazy<AttributeKind> =
        Lazy::new(|| AttributeKind::named("attestor.v1.kind.compliance-status"));

    /// Epoch the account's record set was first issued in.
    pub static ISSUANCE_EPOCH: Lazy<AttributeKind> =
        Lazy::new(|| AttributeKind::named("attestor.v1.kind.issuance-epoch"));

    /// The kinds every deployment carries, in registration order.
    pub fn standard() -> Vec<AttributeKind> {
        vec![
            *IDENTITY_DIGEST,
            *JURISDICTION,
            *COMPLIANCE_STATUS,
            *ISSUANCE_EPOCH,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let address = Address::derived("holder-1");
        let rendered = address.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 42);
        let parsed: Address = rendered.parse().unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0xdeadbeef".parse::<Address>().unwrap_err();
        assert!(matches!(err, HexParseError::WrongLength { expected: 20, got: 4 }));
    }

    #[test]
    fn test_word_address_embedding() {
        let address = Address::derived("issuer-1");
        let word = Word::from_address(address);
        assert_eq!(word.to_address(), address);
        assert_eq!(&word.as_bytes()[..12], &[0u8; 12]);
    }

    #[test]
    fn test_word_u64_roundtrip() {
        let word = Word::from_u64(123_456);
        assert_eq!(word.to_u64(), 123_456);
    }

    #[test]
    fn test_zero_sentinels() {
        assert!(Address::ZERO.is_zero());
        assert!(Word::ZERO.is_zero());
        assert!(!Address::derived("holder-1").is_zero());
    }

    #[test]
    fn test_named_words_are_stable_and_distinct() {
        assert_eq!(Word::named("a"), Word::named("a"));
        assert_ne!(Word::named("a"), Word::named("b"));
        let standard = kinds::standard();
        for (i, kind) in standard.iter().enumerate() {
            for other in &standard[i + 1..] {
                assert_ne!(kind, other);
            }
        }
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let address = Address::derived("holder-2");
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
