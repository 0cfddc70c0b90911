//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use spl_token::instruction::AuthorityType;
use thiserror::Error;

// Re-export RpcConfig from config module to avoid duplication
pub use crate::config::schema::RpcConfig;

/// Largest decimal precision the form accepts.
pub const MAX_DECIMALS: u8 = 9;

/// Errors that can occur during ledger operations.
///
/// RPC failures carry the node's message verbatim so funding and
/// rejection errors reach the user unchanged.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// RPC connection, simulation or transaction failure.
    #[error("{0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Instruction could not be built.
    #[error("Instruction error: {0}")]
    Instruction(String),

    /// Account exists but is not what the pipeline expects.
    #[error("Account {address} is invalid: {reason}")]
    InvalidAccount { address: Pubkey, reason: String },

    /// Ledger not configured.
    #[error("Ledger not available: {0}")]
    NotAvailable(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Which mint authority to revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    /// Permission to create new supply.
    Mint,
    /// Permission to freeze token accounts.
    Freeze,
}

impl From<AuthorityKind> for AuthorityType {
    fn from(kind: AuthorityKind) -> Self {
        match kind {
            AuthorityKind::Mint => AuthorityType::MintTokens,
            AuthorityKind::Freeze => AuthorityType::FreezeAccount,
        }
    }
}

/// Decoded on-chain mint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintState {
    pub address: Pubkey,
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
}

impl MintState {
    /// Authority currently held for the given kind.
    pub fn authority(&self, kind: AuthorityKind) -> Option<Pubkey> {
        match kind {
            AuthorityKind::Mint => self.mint_authority,
            AuthorityKind::Freeze => self.freeze_authority,
        }
    }

    /// True once both authorities read as unset.
    pub fn is_fixed(&self) -> bool {
        self.mint_authority.is_none() && self.freeze_authority.is_none()
    }
}

/// Base units that make up exactly one token at the given precision.
pub fn base_units(decimals: u8) -> u64 {
    10u64.pow(u32::from(decimals.min(MAX_DECIMALS)))
}

/// Parse a commitment level name.
pub fn parse_commitment(name: &str) -> Option<CommitmentConfig> {
    match name.to_ascii_lowercase().as_str() {
        "processed" => Some(CommitmentConfig::processed()),
        "confirmed" => Some(CommitmentConfig::confirmed()),
        "finalized" => Some(CommitmentConfig::finalized()),
        _ => None,
    }
}

/// Serde adapter storing public keys as base58 strings.
pub mod pubkey_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(D::Error::custom)
    }

    /// Same as the parent module for `Option<Pubkey>`.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(k) => serializer.collect_str(k),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| Pubkey::from_str(&s).map_err(D::Error::custom))
                .transpose()
        }
    }
}
