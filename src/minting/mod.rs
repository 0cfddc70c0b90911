//! Token minting subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/mint (form)
//!     → pipeline.rs (guard, validate, checkpointed on-chain steps)
//!     → status.rs (status/error pair, event fan-out)
//!     → GET /api/status, GET /api/events
//! ```
//!
//! # Design Decisions
//! - One attempt at a time; a second submission is rejected, not queued
//! - Every step reads chain state first, so re-running an attempt is safe
//! - The attempt's keys and checkpoint outlive failures until retired

pub mod checkpoint;
pub mod form;
pub mod phase;
pub mod pipeline;
pub mod status;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::blockchain::LedgerError;
use crate::custody::CustodyError;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
pub use form::{FormError, MintForm, MAX_SYMBOL_LEN};
pub use phase::{MintEvent, MintOutcome, MintPhase};
pub use pipeline::Minter;
pub use status::{BoardClaim, StatusBoard, StatusSnapshot};

/// Shown when a failure carries no message of its own.
pub const FALLBACK_ERROR: &str = "Error during minting";

/// Errors that end a mint attempt.
#[derive(Debug, Error)]
pub enum MintError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error(transparent)]
    InvalidForm(#[from] FormError),

    #[error("A mint is already in progress")]
    AlreadyRunning,

    #[error("Authority {address} holds {lamports} lamports, at least {required} are needed for fees")]
    Unfunded {
        address: Pubkey,
        lamports: u64,
        required: u64,
    },

    #[error("Unfinished mint {mint} must be resumed with the same wallet and decimals, or abandoned")]
    PendingCheckpoint { mint: Pubkey },

    /// Chain state contradicts the attempt being resumed.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl MintError {
    /// Text for the error region.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_ERROR.to_string()
        } else {
            message
        }
    }

    /// Label used in the attempts metric.
    pub fn label(&self) -> &'static str {
        match self {
            MintError::NotConnected => "not_connected",
            MintError::InvalidForm(_) => "invalid_form",
            MintError::AlreadyRunning => "already_running",
            MintError::Unfunded { .. } => "unfunded",
            MintError::PendingCheckpoint { .. } => "pending_checkpoint",
            MintError::Conflict(_) => "conflict",
            MintError::Ledger(_) => "ledger",
            MintError::Custody(_) => "custody",
            MintError::Checkpoint(_) => "checkpoint",
        }
    }
}

/// Result type for mint operations.
pub type MintResult<T> = Result<T, MintError>;
