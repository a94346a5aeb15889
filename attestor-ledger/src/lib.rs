//! Ledger client seam for the Attestor coordinator.
//!
//! The coordinator only ever touches the remote state machine through the
//! [`LedgerClient`] trait: historical log queries, state reads, call
//! submission, and confirmation waits. Two implementations ship here: the
//! JSON-RPC client used in production and an in-memory mock for tests.

pub mod client;
pub mod mock;
pub mod retry;
pub mod rpc;
pub mod types;

pub use client::LedgerClient;
pub use mock::MockLedger;
pub use retry::with_backoff;
pub use rpc::JsonRpcLedger;
pub use types::{
    topics, Call, CallAction, LogEntry, LogFilter, Receipt, RevertReason, TxHandle, TxOutcome,
};
