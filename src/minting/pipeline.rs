//! The mint pipeline.
//!
//! # Steps
//! ```text
//! Validating               wallet + form, funding preflight, keys, checkpoint
//! CreatingMint             reuse the mint account if it exists, else create it
//! FetchingAccount          associated token account for (wallet, mint)
//! Minting                  one whole token, skipped if already minted
//! RevokingMintAuthority    skipped if already revoked
//! RevokingFreezeAuthority  skipped if already revoked
//! Done                     authorities verified, keys retired, checkpoint cleared
//! ```
//!
//! A failed attempt keeps its keys and checkpoint. Submitting again with the
//! same wallet and decimals resumes it without repeating confirmed steps.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::blockchain::{AuthorityKind, MintState, TokenLedger};
use crate::custody::{KeyCustody, KeyRole};
use crate::minting::checkpoint::{Checkpoint, CheckpointStore};
use crate::minting::form::MintForm;
use crate::minting::phase::{MintEvent, MintOutcome, MintPhase};
use crate::minting::status::StatusBoard;
use crate::minting::{MintError, MintResult};
use crate::observability::metrics;
use crate::wallet::WalletSession;

/// Runs mint attempts against a ledger.
pub struct Minter {
    ledger: Arc<dyn TokenLedger>,
    custody: Arc<dyn KeyCustody>,
    checkpoints: CheckpointStore,
    session: WalletSession,
    board: Arc<StatusBoard>,
    /// Lamports the authority must hold before any transaction is sent. 0 disables the check.
    min_authority_lamports: u64,
}

impl Minter {
    pub fn new(
        ledger: Arc<dyn TokenLedger>,
        custody: Arc<dyn KeyCustody>,
        checkpoints: CheckpointStore,
        session: WalletSession,
        board: Arc<StatusBoard>,
    ) -> Self {
        Self {
            ledger,
            custody,
            checkpoints,
            session,
            board,
            min_authority_lamports: 0,
        }
    }

    /// Refuse to start while the authority holds fewer than `lamports`.
    pub fn with_min_authority_lamports(mut self, lamports: u64) -> Self {
        self.min_authority_lamports = lamports;
        self
    }

    pub fn board(&self) -> &Arc<StatusBoard> {
        &self.board
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Address that must be funded before minting.
    ///
    /// Generates and stores the authority keypair on first use. Later calls
    /// return the same address until a successful mint retires it.
    pub fn authority(&self) -> MintResult<Pubkey> {
        Ok(self.custody.load_or_generate(KeyRole::Authority)?.pubkey())
    }

    /// Checkpoint of an unfinished attempt, if any.
    pub fn pending(&self) -> MintResult<Option<Checkpoint>> {
        Ok(self.checkpoints.load()?)
    }

    /// Run one attempt to completion.
    pub async fn mint(&self, form: MintForm) -> MintResult<MintOutcome> {
        let (attempt, owner, form) = self.begin(form)?;
        self.run(attempt, owner, form).await
    }

    /// Start an attempt in the background and return its id.
    ///
    /// Guard and precondition failures are returned here; later failures
    /// are reported through the status board.
    pub fn start(self: &Arc<Self>, form: MintForm) -> MintResult<Uuid> {
        let (attempt, owner, form) = self.begin(form)?;
        let minter = Arc::clone(self);
        tokio::spawn(async move {
            let _ = minter.run(attempt, owner, form).await;
        });
        Ok(attempt)
    }

    /// Drop an unfinished attempt: retire its mint key and clear the checkpoint.
    ///
    /// The authority keypair stays pending so lamports sent to it keep paying
    /// for the next attempt. Returns the mint address that was abandoned, if
    /// one was pending.
    pub fn abandon(&self) -> MintResult<Option<Pubkey>> {
        let _claim = self.board.claim()?;
        let pending = self.checkpoints.load()?;
        self.custody.retire_mint()?;
        self.checkpoints.clear()?;
        if let Some(checkpoint) = &pending {
            tracing::warn!(
                mint = %checkpoint.mint,
                authority = %checkpoint.authority,
                "Abandoned unfinished mint"
            );
        }
        Ok(pending.map(|checkpoint| checkpoint.mint))
    }

    /// Claim the board and check everything that needs no ledger call.
    fn begin(&self, form: MintForm) -> MintResult<(Uuid, Pubkey, MintForm)> {
        let attempt = Uuid::new_v4();
        self.board.begin(attempt)?;

        let form = form.normalized();
        let checked = match self.session.public_key() {
            None => Err(MintError::NotConnected),
            Some(owner) => form.validate().map(|_| owner).map_err(MintError::from),
        };
        match checked {
            Ok(owner) => {
                tracing::info!(
                    %attempt,
                    wallet = %owner,
                    name = %form.name,
                    symbol = %form.symbol,
                    decimals = form.decimals,
                    "Mint attempt started"
                );
                Ok((attempt, owner, form))
            }
            Err(e) => {
                self.fail(attempt, &e);
                Err(e)
            }
        }
    }

    async fn run(&self, attempt: Uuid, owner: Pubkey, form: MintForm) -> MintResult<MintOutcome> {
        match self.run_steps(attempt, owner, &form).await {
            Ok(outcome) => {
                tracing::info!(
                    %attempt,
                    mint = %outcome.mint,
                    token_account = %outcome.token_account,
                    "Mint attempt completed"
                );
                metrics::record_attempt("completed");
                self.board.publish(MintEvent::Completed {
                    attempt,
                    outcome: outcome.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                self.fail(attempt, &e);
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        attempt: Uuid,
        owner: Pubkey,
        form: &MintForm,
    ) -> MintResult<MintOutcome> {
        let previous = match self.checkpoints.load()? {
            Some(checkpoint) if checkpoint.resumable_by(&owner, form) => {
                tracing::info!(
                    %attempt,
                    previous = %checkpoint.attempt,
                    mint = %checkpoint.mint,
                    completed = %checkpoint.completed,
                    "Resuming unfinished mint"
                );
                Some(checkpoint)
            }
            Some(checkpoint) => match self.ledger.mint_state(&checkpoint.mint).await? {
                // Nothing on-chain yet: the same keys serve the new submission
                None => {
                    tracing::info!(
                        %attempt,
                        previous = %checkpoint.attempt,
                        mint = %checkpoint.mint,
                        "Replacing checkpoint of uncreated mint"
                    );
                    None
                }
                Some(_) => {
                    return Err(MintError::PendingCheckpoint {
                        mint: checkpoint.mint,
                    })
                }
            },
            None => None,
        };

        let authority = self.custody.load_or_generate(KeyRole::Authority)?;
        let mint_key = self.custody.load_or_generate(KeyRole::Mint)?;
        let mint = mint_key.pubkey();
        if let Some(previous) = &previous {
            if previous.authority != authority.pubkey() || previous.mint != mint {
                return Err(MintError::Conflict(format!(
                    "Pending keys do not match the checkpoint for mint {}",
                    previous.mint
                )));
            }
        }

        if self.min_authority_lamports > 0 {
            let lamports = self.ledger.balance(&authority.pubkey()).await?;
            if lamports < self.min_authority_lamports {
                return Err(MintError::Unfunded {
                    address: authority.pubkey(),
                    lamports,
                    required: self.min_authority_lamports,
                });
            }
        }

        let mut checkpoint = Checkpoint {
            attempt,
            owner,
            form: form.clone(),
            authority: authority.pubkey(),
            mint,
            token_account: previous.and_then(|p| p.token_account),
            completed: MintPhase::Validating,
        };
        self.checkpoints.save(&checkpoint)?;

        // Create the mint, or pick up the one a previous run created
        let started = self.enter(attempt, MintPhase::CreatingMint);
        let state = match self.ledger.mint_state(&mint).await? {
            Some(state) => {
                if state.decimals != form.decimals {
                    return Err(MintError::Conflict(format!(
                        "Mint {} exists with {} decimals, requested {}",
                        mint, state.decimals, form.decimals
                    )));
                }
                tracing::debug!(%attempt, %mint, "Mint account already exists");
                state
            }
            None => {
                let signature = self
                    .ledger
                    .create_mint(
                        &authority,
                        &mint_key,
                        form.decimals,
                        &authority.pubkey(),
                        &authority.pubkey(),
                    )
                    .await?;
                tracing::info!(%attempt, %mint, %signature, "Mint created");
                MintState {
                    address: mint,
                    decimals: form.decimals,
                    supply: 0,
                    mint_authority: Some(authority.pubkey()),
                    freeze_authority: Some(authority.pubkey()),
                }
            }
        };
        self.progress(attempt, MintPhase::CreatingMint, format!("Mint created: {}", mint));
        self.complete(&mut checkpoint, MintPhase::CreatingMint, started)?;

        let started = self.enter(attempt, MintPhase::FetchingAccount);
        let token_account = self
            .ledger
            .ensure_token_account(&authority, &owner, &mint)
            .await?;
        tracing::info!(%attempt, %token_account, "Token account ready");
        checkpoint.token_account = Some(token_account);
        self.complete(&mut checkpoint, MintPhase::FetchingAccount, started)?;

        let started = self.enter(attempt, MintPhase::Minting);
        let amount = form.initial_supply();
        match state.supply {
            0 => {
                let signature = self
                    .ledger
                    .mint_to(&authority, &mint, &token_account, amount)
                    .await?;
                tracing::info!(%attempt, amount, %signature, "Tokens minted");
            }
            supply if supply == amount => {
                tracing::debug!(%attempt, supply, "Initial supply already minted");
            }
            supply => {
                return Err(MintError::Conflict(format!(
                    "Mint {} already has supply {}, expected {}",
                    mint, supply, amount
                )));
            }
        }
        self.complete(&mut checkpoint, MintPhase::Minting, started)?;

        let started = self.enter(attempt, MintPhase::RevokingMintAuthority);
        self.revoke(attempt, &authority, &state, AuthorityKind::Mint).await?;
        self.complete(&mut checkpoint, MintPhase::RevokingMintAuthority, started)?;

        let started = self.enter(attempt, MintPhase::RevokingFreezeAuthority);
        self.revoke(attempt, &authority, &state, AuthorityKind::Freeze).await?;
        self.complete(&mut checkpoint, MintPhase::RevokingFreezeAuthority, started)?;

        let fixed = self
            .ledger
            .mint_state(&mint)
            .await?
            .map(|state| state.is_fixed())
            .unwrap_or(false);
        if !fixed {
            return Err(MintError::Conflict(format!(
                "Mint {} still has an authority after revocation",
                mint
            )));
        }

        self.custody.retire()?;
        self.checkpoints.clear()?;

        Ok(MintOutcome {
            attempt,
            mint,
            token_account,
            decimals: form.decimals,
            amount,
            metadata_uri: form.uri.clone(),
        })
    }

    /// Revoke `kind` unless it is already gone.
    async fn revoke(
        &self,
        attempt: Uuid,
        authority: &Keypair,
        state: &MintState,
        kind: AuthorityKind,
    ) -> MintResult<()> {
        match state.authority(kind) {
            Some(held) if held == authority.pubkey() => {
                let signature = self
                    .ledger
                    .revoke_authority(authority, &state.address, kind)
                    .await?;
                tracing::info!(%attempt, ?kind, %signature, "Authority revoked");
                Ok(())
            }
            Some(held) => Err(MintError::Conflict(format!(
                "{:?} authority of {} is held by {}",
                kind, state.address, held
            ))),
            None => {
                tracing::debug!(%attempt, ?kind, "Authority already revoked");
                Ok(())
            }
        }
    }

    fn enter(&self, attempt: Uuid, phase: MintPhase) -> Instant {
        self.progress(attempt, phase, phase.status_text().to_string());
        Instant::now()
    }

    fn progress(&self, attempt: Uuid, phase: MintPhase, message: String) {
        self.board.publish(MintEvent::Progress {
            attempt,
            phase,
            message,
        });
    }

    fn complete(
        &self,
        checkpoint: &mut Checkpoint,
        phase: MintPhase,
        started: Instant,
    ) -> MintResult<()> {
        metrics::record_step(phase, started);
        checkpoint.completed = phase;
        self.checkpoints.save(checkpoint)?;
        Ok(())
    }

    fn fail(&self, attempt: Uuid, error: &MintError) {
        let phase = self.board.phase();
        tracing::error!(%attempt, %phase, error = %error, "Mint attempt failed");
        metrics::record_attempt(error.label());
        self.board.publish(MintEvent::Failed {
            attempt,
            phase,
            error: error.user_message(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{LedgerOp, MemoryLedger};
    use crate::custody::MemoryCustody;
    use std::time::Duration;

    struct Harness {
        ledger: Arc<MemoryLedger>,
        custody: Arc<MemoryCustody>,
        session: WalletSession,
        minter: Arc<Minter>,
    }

    fn harness_with(ledger: MemoryLedger, min_lamports: u64) -> Harness {
        let ledger = Arc::new(ledger);
        let custody = Arc::new(MemoryCustody::new());
        let session = WalletSession::default();
        let minter = Minter::new(
            ledger.clone(),
            custody.clone(),
            CheckpointStore::in_memory(),
            session.clone(),
            Arc::new(StatusBoard::default()),
        )
        .with_min_authority_lamports(min_lamports);
        Harness {
            ledger,
            custody,
            session,
            minter: Arc::new(minter),
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryLedger::new(), 0)
    }

    fn form() -> MintForm {
        MintForm::new("Example Token", "EXMPL", 2, "https://arweave.net/meta.json")
    }

    #[tokio::test]
    async fn test_happy_path() {
        let h = harness();
        let owner = Pubkey::new_unique();
        h.session.connect(owner);

        let outcome = h.minter.mint(form()).await.unwrap();

        assert_eq!(
            h.ledger.calls(),
            vec![
                LedgerOp::MintState,
                LedgerOp::CreateMint,
                LedgerOp::EnsureTokenAccount,
                LedgerOp::MintTo,
                LedgerOp::RevokeMintAuthority,
                LedgerOp::RevokeFreezeAuthority,
                LedgerOp::MintState,
            ]
        );
        let mint = h.ledger.mint(&outcome.mint).unwrap();
        assert_eq!(mint.supply, 100);
        assert_eq!(mint.decimals, 2);
        assert!(mint.is_fixed());
        assert_eq!(h.ledger.token_balance(&outcome.token_account), Some(100));
        assert_eq!(
            outcome.token_account,
            spl_associated_token_account::get_associated_token_address(&owner, &outcome.mint)
        );
        assert_eq!(outcome.metadata_uri, "https://arweave.net/meta.json");

        assert_eq!(h.custody.retired().len(), 1);
        assert!(h.minter.pending().unwrap().is_none());

        let snapshot = h.minter.board().snapshot();
        assert_eq!(snapshot.phase, MintPhase::Done);
        assert_eq!(snapshot.status, Some(outcome.summary()));
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn test_not_connected_makes_no_ledger_calls() {
        let h = harness();
        let err = h.minter.mint(form()).await.unwrap_err();

        assert!(matches!(err, MintError::NotConnected));
        assert!(h.ledger.calls().is_empty());
        let snapshot = h.minter.board().snapshot();
        assert_eq!(snapshot.phase, MintPhase::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("Wallet not connected"));
        assert_eq!(snapshot.status, None);
    }

    #[tokio::test]
    async fn test_invalid_form_makes_no_ledger_calls() {
        let h = harness();
        h.session.connect(Pubkey::new_unique());

        let err = h
            .minter
            .mint(MintForm::new("Example Token", "EXMPL", 12, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, MintError::InvalidForm(_)));
        assert!(h.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_long_symbol_is_truncated() {
        let h = harness();
        h.session.connect(Pubkey::new_unique());
        let mut form = form();
        form.symbol = "TOOLONG".to_string();

        h.ledger.fail_on(LedgerOp::MintTo, "halt");

        h.minter.mint(form).await.unwrap_err();
        let pending = h.minter.pending().unwrap().unwrap();
        assert_eq!(pending.form.symbol, "TOOLO");
    }

    #[tokio::test]
    async fn test_failed_step_resumes_without_repeating() {
        let h = harness();
        h.session.connect(Pubkey::new_unique());
        h.ledger.fail_on(LedgerOp::RevokeMintAuthority, "blockhash not found");

        let err = h.minter.mint(form()).await.unwrap_err();
        assert_eq!(err.user_message(), "blockhash not found");

        let snapshot = h.minter.board().snapshot();
        assert_eq!(snapshot.phase, MintPhase::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("blockhash not found"));
        let pending = h.minter.pending().unwrap().unwrap();
        assert_eq!(pending.completed, MintPhase::Minting);
        assert!(h.custody.retired().is_empty());

        h.ledger.clear_failures();
        let outcome = h.minter.mint(form()).await.unwrap();

        assert_eq!(outcome.mint, pending.mint);
        assert_eq!(h.ledger.count(LedgerOp::CreateMint), 1);
        assert_eq!(h.ledger.count(LedgerOp::MintTo), 1);
        assert_eq!(h.ledger.count(LedgerOp::RevokeMintAuthority), 2);
        assert_eq!(h.ledger.mint(&outcome.mint).unwrap().supply, 100);
        assert!(h.minter.pending().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_checkpoint_blocks_other_wallet() {
        let h = harness();
        h.session.connect(Pubkey::new_unique());
        h.ledger.fail_on(LedgerOp::MintTo, "node unhealthy");
        h.minter.mint(form()).await.unwrap_err();
        h.ledger.clear_failures();

        h.session.connect(Pubkey::new_unique());
        let err = h.minter.mint(form()).await.unwrap_err();
        assert!(matches!(err, MintError::PendingCheckpoint { .. }));

        let authority = h.minter.authority().unwrap();
        let abandoned = h.minter.abandon().unwrap();
        assert!(abandoned.is_some());
        assert_eq!(h.minter.board().phase(), MintPhase::Idle);
        assert!(h.custody.retired().is_empty());
        assert_eq!(h.minter.authority().unwrap(), authority);

        let outcome = h.minter.mint(form()).await.unwrap();
        assert_ne!(Some(outcome.mint), abandoned);
        assert_eq!(h.custody.retired(), vec![authority]);
    }

    #[tokio::test]
    async fn test_uncreated_mint_is_replaced_by_new_submission() {
        let h = harness();
        let first_owner = Pubkey::new_unique();
        h.session.connect(first_owner);
        h.ledger.fail_on(LedgerOp::CreateMint, "insufficient funds for rent");

        h.minter.mint(form()).await.unwrap_err();
        let pending = h.minter.pending().unwrap().unwrap();
        assert_eq!(pending.completed, MintPhase::Validating);

        h.ledger.clear_failures();
        h.ledger.fund(&pending.authority, 1_000_000);
        let owner = Pubkey::new_unique();
        h.session.connect(owner);
        let mut changed = form();
        changed.decimals = 3;
        let outcome = h.minter.mint(changed).await.unwrap();

        assert_eq!(outcome.mint, pending.mint);
        assert_eq!(outcome.decimals, 3);
        assert_eq!(h.ledger.mint(&outcome.mint).unwrap().supply, 1_000);
        assert_eq!(
            outcome.token_account,
            spl_associated_token_account::get_associated_token_address(&owner, &outcome.mint)
        );
        assert_eq!(h.custody.retired(), vec![pending.authority]);
        assert!(h.custody.recover(&pending.authority).is_some());
    }

    #[tokio::test]
    async fn test_abandon_without_checkpoint_keeps_funded_authority() {
        let h = harness();
        let authority = h.minter.authority().unwrap();
        h.ledger.fund(&authority, 1_000_000);

        assert_eq!(h.minter.abandon().unwrap(), None);
        assert_eq!(h.minter.authority().unwrap(), authority);

        h.session.connect(Pubkey::new_unique());
        h.minter.mint(form()).await.unwrap();
        assert_eq!(h.custody.retired(), vec![authority]);
    }

    #[tokio::test]
    async fn test_unfunded_authority_sends_nothing() {
        let h = harness_with(MemoryLedger::new().with_fee(5_000), 50_000);
        h.session.connect(Pubkey::new_unique());

        let err = h.minter.mint(form()).await.unwrap_err();
        match err {
            MintError::Unfunded { lamports, required, .. } => {
                assert_eq!(lamports, 0);
                assert_eq!(required, 50_000);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.ledger.calls().iter().all(|op| !op.is_write()));

        let authority = h.minter.authority().unwrap();
        h.ledger.fund(&authority, 50_000);
        let outcome = h.minter.mint(form()).await.unwrap();
        assert!(h.ledger.mint(&outcome.mint).unwrap().is_fixed());
        assert_eq!(h.ledger.balance(&authority).await.unwrap(), 50_000 - 5 * 5_000);
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected_while_running() {
        let h = harness_with(MemoryLedger::new().with_latency(Duration::from_millis(20)), 0);
        h.session.connect(Pubkey::new_unique());
        let mut events = h.minter.board().subscribe();

        let attempt = h.minter.start(form()).unwrap();
        assert!(matches!(h.minter.start(form()), Err(MintError::AlreadyRunning)));
        assert!(matches!(h.minter.abandon(), Err(MintError::AlreadyRunning)));

        let mut phases = Vec::new();
        loop {
            let event = events.recv().await.unwrap();
            assert_eq!(event.attempt(), attempt);
            phases.push(event.phase());
            if event.phase().is_terminal() {
                break;
            }
        }
        assert_eq!(phases.last(), Some(&MintPhase::Done));
        assert_eq!(h.ledger.count(LedgerOp::CreateMint), 1);
    }
}
