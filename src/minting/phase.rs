//! Mint attempt state machine and progress events.
//!
//! # State Transitions
//! ```text
//! Idle → Validating → CreatingMint → FetchingAccount → Minting
//!      → RevokingMintAuthority → RevokingFreezeAuthority → Done
//! any non-terminal state → Failed
//! Done | Failed → Validating (next submission)
//! ```

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use crate::blockchain::types::pubkey_string;

/// Phase of a mint attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintPhase {
    #[default]
    Idle,
    Validating,
    CreatingMint,
    FetchingAccount,
    Minting,
    RevokingMintAuthority,
    RevokingFreezeAuthority,
    Done,
    Failed,
}

impl MintPhase {
    /// On-chain steps in execution order.
    pub const STEPS: [MintPhase; 5] = [
        MintPhase::CreatingMint,
        MintPhase::FetchingAccount,
        MintPhase::Minting,
        MintPhase::RevokingMintAuthority,
        MintPhase::RevokingFreezeAuthority,
    ];

    /// True while an attempt is in flight.
    pub fn is_active(self) -> bool {
        !matches!(self, MintPhase::Idle | MintPhase::Done | MintPhase::Failed)
    }

    /// True for phases that end an attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, MintPhase::Done | MintPhase::Failed)
    }

    /// Whether `next` is a legal transition from `self`.
    pub fn can_advance_to(self, next: MintPhase) -> bool {
        use MintPhase::*;
        match (self, next) {
            (Idle | Done | Failed, Validating) => true,
            (Validating, CreatingMint)
            | (CreatingMint, FetchingAccount)
            | (FetchingAccount, Minting)
            | (Minting, RevokingMintAuthority)
            | (RevokingMintAuthority, RevokingFreezeAuthority)
            | (RevokingFreezeAuthority, Done) => true,
            (from, Failed) => from.is_active(),
            // Status updates within the same phase
            (from, to) => from == to && from.is_active(),
        }
    }

    /// Status line shown when entering the phase.
    pub fn status_text(self) -> &'static str {
        match self {
            MintPhase::Idle => "",
            MintPhase::Validating => "Starting minting process...",
            MintPhase::CreatingMint => "Creating mint...",
            MintPhase::FetchingAccount => "Getting token account...",
            MintPhase::Minting => "Minting tokens to your account...",
            MintPhase::RevokingMintAuthority => "Revoking minting authority...",
            MintPhase::RevokingFreezeAuthority => "Revoking freezing authority...",
            MintPhase::Done => "Token minted successfully!",
            MintPhase::Failed => "",
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            MintPhase::Idle => "idle",
            MintPhase::Validating => "validating",
            MintPhase::CreatingMint => "creating_mint",
            MintPhase::FetchingAccount => "fetching_account",
            MintPhase::Minting => "minting",
            MintPhase::RevokingMintAuthority => "revoking_mint_authority",
            MintPhase::RevokingFreezeAuthority => "revoking_freeze_authority",
            MintPhase::Done => "done",
            MintPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MintPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    pub attempt: Uuid,
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    #[serde(with = "pubkey_string")]
    pub token_account: Pubkey,
    pub decimals: u8,
    /// Base units minted to the token account.
    pub amount: u64,
    pub metadata_uri: String,
}

impl MintOutcome {
    /// Multi-line summary shown in the status region.
    pub fn summary(&self) -> String {
        format!(
            "Token minted successfully!\nMint: {}\nToken Account: {}\nMetadata URI: {}\n",
            self.mint, self.token_account, self.metadata_uri
        )
    }
}

/// Progress event published while an attempt runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MintEvent {
    /// Entered a phase or finished part of one.
    Progress {
        attempt: Uuid,
        phase: MintPhase,
        message: String,
    },
    /// Attempt finished; authorities are revoked.
    Completed {
        attempt: Uuid,
        outcome: MintOutcome,
    },
    /// Attempt stopped at `phase`.
    Failed {
        attempt: Uuid,
        phase: MintPhase,
        error: String,
    },
}

impl MintEvent {
    /// Attempt the event belongs to.
    pub fn attempt(&self) -> Uuid {
        match self {
            MintEvent::Progress { attempt, .. }
            | MintEvent::Completed { attempt, .. }
            | MintEvent::Failed { attempt, .. } => *attempt,
        }
    }

    /// Event name for the SSE stream.
    pub fn kind(&self) -> &'static str {
        match self {
            MintEvent::Progress { .. } => "progress",
            MintEvent::Completed { .. } => "completed",
            MintEvent::Failed { .. } => "failed",
        }
    }

    /// Phase the attempt is in after this event.
    pub fn phase(&self) -> MintPhase {
        match self {
            MintEvent::Progress { phase, .. } => *phase,
            MintEvent::Completed { .. } => MintPhase::Done,
            MintEvent::Failed { .. } => MintPhase::Failed,
        }
    }
}
