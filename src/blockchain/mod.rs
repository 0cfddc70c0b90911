//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Mint pipeline
//!     → ledger.rs (TokenLedger seam)
//!     → client.rs (RPC ledger: build, sign, confirm)
//!     → memory.rs (in-process ledger for dry runs and tests)
//! ```
//!
//! # Security Constraints
//! - Signing keys come from custody, never from this module
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod ledger;
pub mod memory;
pub mod types;

pub use client::RpcLedger;
pub use ledger::TokenLedger;
pub use memory::{LedgerOp, MemoryLedger};
pub use types::{base_units, AuthorityKind, LedgerError, LedgerResult, MintState};
