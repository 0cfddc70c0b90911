//! Key custody for mint attempts.
//!
//! # Data Flow
//! ```text
//! Mint pipeline
//!     → KeyCustody::load_or_generate (pending authority + mint keypairs)
//!     → ... on-chain steps signed with those keys ...
//!     → KeyCustody::retire (after both authorities read as revoked)
//!
//! Abandoned attempt
//!     → KeyCustody::retire_mint (the authority stays pending, it may hold lamports)
//! ```
//!
//! # Security
//! - Pending keys survive restarts so an interrupted attempt can resume
//! - Retired keys are kept, not deleted: the authority may still hold lamports
//! - Keys are never logged or serialized outside the keypair files

pub mod file;
pub mod memory;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::path::PathBuf;
use thiserror::Error;

pub use file::FileCustody;
pub use memory::MemoryCustody;

/// Purpose of a pending keypair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Pays fees and holds mint and freeze authority until revocation.
    Authority,
    /// Address keypair of the mint account itself.
    Mint,
}

impl KeyRole {
    /// Every role, in retirement order.
    pub const ALL: [KeyRole; 2] = [KeyRole::Authority, KeyRole::Mint];

    /// File name used by file-backed custody.
    pub fn file_name(self) -> &'static str {
        match self {
            KeyRole::Authority => "authority.json",
            KeyRole::Mint => "mint.json",
        }
    }
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyRole::Authority => write!(f, "authority"),
            KeyRole::Mint => write!(f, "mint"),
        }
    }
}

/// Errors raised by key custody.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// Filesystem failure.
    #[error("Custody I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Keypair file could not be read or written.
    #[error("Keypair file {path:?}: {reason}")]
    Keypair { path: PathBuf, reason: String },
}

/// Result type for custody operations.
pub type CustodyResult<T> = Result<T, CustodyError>;

/// Holder of the signing keys for the current mint attempt.
pub trait KeyCustody: Send + Sync {
    /// Pending keypair for `role`, if one exists.
    fn pending(&self, role: KeyRole) -> CustodyResult<Option<Keypair>>;

    /// Pending keypair for `role`, generating and storing a fresh one if absent.
    fn load_or_generate(&self, role: KeyRole) -> CustodyResult<Keypair>;

    /// Move every pending keypair out of the pending slots.
    fn retire(&self) -> CustodyResult<()>;

    /// Move only the pending mint keypair aside, keeping the authority.
    ///
    /// Returns the retired mint address, if one was pending.
    fn retire_mint(&self) -> CustodyResult<Option<Pubkey>>;
}
