//! Startup orchestration.
//!
//! Builds the ledger, custody, wallet session and minter from a validated
//! config. Any error here is fatal.

use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{LedgerError, MemoryLedger, RpcLedger, TokenLedger};
use crate::config::MinterConfig;
use crate::custody::{CustodyError, FileCustody, KeyCustody, MemoryCustody};
use crate::minting::{CheckpointStore, Minter, StatusBoard};
use crate::wallet::{SessionError, WalletSession};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error(transparent)]
    Wallet(#[from] SessionError),
}

/// Everything the HTTP layer needs.
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<dyn TokenLedger>,
    pub minter: Arc<Minter>,
}

/// Build the services described by `config`.
///
/// `dry_run` swaps the RPC ledger for an in-memory one and skips the
/// funding preflight.
pub fn build_services(config: &MinterConfig, dry_run: bool) -> Result<Services, StartupError> {
    let ledger: Arc<dyn TokenLedger> = if dry_run {
        tracing::warn!("Dry run: minting against an in-memory ledger");
        Arc::new(MemoryLedger::new())
    } else {
        Arc::new(RpcLedger::new(config.rpc.clone())?)
    };

    let (custody, checkpoints): (Arc<dyn KeyCustody>, CheckpointStore) = match &config.custody.dir {
        Some(dir) => (Arc::new(FileCustody::open(dir)?), CheckpointStore::in_dir(dir)),
        None => {
            tracing::warn!("No custody directory configured; pending keys are lost on restart");
            (Arc::new(MemoryCustody::new()), CheckpointStore::in_memory())
        }
    };

    let remembered = config
        .wallet
        .remembered_key
        .as_deref()
        .map(WalletSession::parse_public_key)
        .transpose()?;
    let session = WalletSession::new(remembered);
    if config.wallet.auto_connect {
        session.restore();
    }

    let min_lamports = if dry_run { 0 } else { config.mint.min_authority_lamports };
    let minter = Minter::new(
        ledger.clone(),
        custody,
        checkpoints,
        session,
        Arc::new(StatusBoard::default()),
    )
    .with_min_authority_lamports(min_lamports);

    match minter.pending() {
        Ok(Some(checkpoint)) => tracing::warn!(
            mint = %checkpoint.mint,
            wallet = %checkpoint.owner,
            completed = %checkpoint.completed,
            "Unfinished mint found; submit again to resume or abandon it"
        ),
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Failed to read checkpoint"),
    }

    Ok(Services {
        ledger,
        minter: Arc::new(minter),
    })
}
