//! In-memory token ledger.
//!
//! Mirrors the token program rules the pipeline depends on: authorities must
//! sign, revoked authorities stay revoked, and fees are charged to the payer
//! when configured. Used for `--dry-run` and by the test suites, which inspect
//! the recorded calls and inject failures per operation.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::blockchain::ledger::TokenLedger;
use crate::blockchain::types::{AuthorityKind, LedgerError, LedgerResult, MintState};

/// Message a node returns when the fee payer holds no lamports.
pub const UNFUNDED_PAYER_MESSAGE: &str =
    "Attempt to debit an account but found no record of a prior credit.";

/// Ledger operations, recorded in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Balance,
    MintState,
    CreateMint,
    EnsureTokenAccount,
    MintTo,
    RevokeMintAuthority,
    RevokeFreezeAuthority,
    Health,
}

impl LedgerOp {
    /// True for operations that submit a transaction.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            LedgerOp::CreateMint
                | LedgerOp::EnsureTokenAccount
                | LedgerOp::MintTo
                | LedgerOp::RevokeMintAuthority
                | LedgerOp::RevokeFreezeAuthority
        )
    }
}

#[derive(Debug, Clone)]
struct TokenAccount {
    mint: Pubkey,
    amount: u64,
}

#[derive(Default)]
struct LedgerState {
    mints: HashMap<Pubkey, MintState>,
    accounts: HashMap<Pubkey, TokenAccount>,
    lamports: HashMap<Pubkey, u64>,
    calls: Vec<LedgerOp>,
    failures: HashMap<LedgerOp, String>,
    signatures: u64,
}

impl LedgerState {
    fn charge(&mut self, payer: &Pubkey, fee: u64) -> LedgerResult<()> {
        if fee == 0 {
            return Ok(());
        }
        let balance = self.lamports.entry(*payer).or_insert(0);
        if *balance < fee {
            return Err(LedgerError::Rpc(UNFUNDED_PAYER_MESSAGE.to_string()));
        }
        *balance -= fee;
        Ok(())
    }

    fn next_signature(&mut self) -> Signature {
        self.signatures += 1;
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&self.signatures.to_le_bytes());
        Signature::from(bytes)
    }
}

/// Token ledger held entirely in process memory.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    fee_lamports: u64,
    latency: Option<Duration>,
}

impl MemoryLedger {
    /// Create a fee-free ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge `fee` lamports to the payer of every transaction.
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee_lamports = fee;
        self
    }

    /// Delay every call, keeping attempts in flight for a while.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Credit native balance to an address.
    pub fn fund(&self, address: &Pubkey, lamports: u64) {
        let mut state = self.lock();
        *state.lamports.entry(*address).or_insert(0) += lamports;
    }

    /// Make every future call of `op` fail with `message`.
    pub fn fail_on(&self, op: LedgerOp, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Operations seen so far, in order.
    pub fn calls(&self) -> Vec<LedgerOp> {
        self.lock().calls.clone()
    }

    /// Number of times `op` was called.
    pub fn count(&self, op: LedgerOp) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Mint as currently stored.
    pub fn mint(&self, mint: &Pubkey) -> Option<MintState> {
        self.lock().mints.get(mint).cloned()
    }

    /// Balance of a token account, if it exists.
    pub fn token_balance(&self, account: &Pubkey) -> Option<u64> {
        self.lock().accounts.get(account).map(|a| a.amount)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().expect("memory ledger mutex poisoned")
    }

    /// Record the call and apply any injected failure.
    async fn enter(&self, op: LedgerOp) -> LedgerResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.lock();
        state.calls.push(op);
        match state.failures.get(&op) {
            Some(message) => Err(LedgerError::Rpc(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TokenLedger for MemoryLedger {
    async fn balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        self.enter(LedgerOp::Balance).await?;
        Ok(self.lock().lamports.get(address).copied().unwrap_or(0))
    }

    async fn mint_state(&self, mint: &Pubkey) -> LedgerResult<Option<MintState>> {
        self.enter(LedgerOp::MintState).await?;
        Ok(self.lock().mints.get(mint).cloned())
    }

    async fn create_mint(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        decimals: u8,
        mint_authority: &Pubkey,
        freeze_authority: &Pubkey,
    ) -> LedgerResult<Signature> {
        self.enter(LedgerOp::CreateMint).await?;
        let mut state = self.lock();
        let address = mint.pubkey();
        if state.mints.contains_key(&address) {
            return Err(LedgerError::Rpc(format!(
                "Allocate: account Address {{ address: {}, base: None }} already in use",
                address
            )));
        }
        state.charge(&payer.pubkey(), self.fee_lamports)?;
        state.mints.insert(
            address,
            MintState {
                address,
                decimals,
                supply: 0,
                mint_authority: Some(*mint_authority),
                freeze_authority: Some(*freeze_authority),
            },
        );
        Ok(state.next_signature())
    }

    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> LedgerResult<Pubkey> {
        self.enter(LedgerOp::EnsureTokenAccount).await?;
        let mut state = self.lock();
        let address = spl_associated_token_account::get_associated_token_address(owner, mint);
        if state.accounts.contains_key(&address) {
            return Ok(address);
        }
        if !state.mints.contains_key(mint) {
            return Err(LedgerError::Rpc("invalid account data for instruction".to_string()));
        }
        state.charge(&payer.pubkey(), self.fee_lamports)?;
        state.accounts.insert(address, TokenAccount { mint: *mint, amount: 0 });
        state.next_signature();
        Ok(address)
    }

    async fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        account: &Pubkey,
        amount: u64,
    ) -> LedgerResult<Signature> {
        self.enter(LedgerOp::MintTo).await?;
        let mut state = self.lock();
        let signer = authority.pubkey();

        let current = state
            .mints
            .get(mint)
            .ok_or_else(|| LedgerError::Rpc("invalid account data for instruction".to_string()))?;
        if current.mint_authority != Some(signer) {
            return Err(LedgerError::Rpc("owner does not match".to_string()));
        }
        match state.accounts.get(account) {
            Some(a) if a.mint == *mint => {}
            _ => return Err(LedgerError::Rpc("account not associated with this mint".to_string())),
        }

        state.charge(&signer, self.fee_lamports)?;
        let overflow = || LedgerError::Rpc("operation overflowed".to_string());
        let mint_state = state.mints.get_mut(mint).ok_or_else(overflow)?;
        mint_state.supply = mint_state.supply.checked_add(amount).ok_or_else(overflow)?;
        let token_account = state.accounts.get_mut(account).ok_or_else(overflow)?;
        token_account.amount = token_account.amount.checked_add(amount).ok_or_else(overflow)?;
        Ok(state.next_signature())
    }

    async fn revoke_authority(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        kind: AuthorityKind,
    ) -> LedgerResult<Signature> {
        let op = match kind {
            AuthorityKind::Mint => LedgerOp::RevokeMintAuthority,
            AuthorityKind::Freeze => LedgerOp::RevokeFreezeAuthority,
        };
        self.enter(op).await?;
        let mut state = self.lock();
        let signer = authority.pubkey();

        let current = state
            .mints
            .get(mint)
            .ok_or_else(|| LedgerError::Rpc("invalid account data for instruction".to_string()))?;
        match current.authority(kind) {
            Some(held) if held == signer => {}
            Some(_) => return Err(LedgerError::Rpc("owner does not match".to_string())),
            None => {
                return Err(LedgerError::Rpc(
                    "this token mint cannot mint new tokens".to_string(),
                ))
            }
        }

        state.charge(&signer, self.fee_lamports)?;
        if let Some(mint_state) = state.mints.get_mut(mint) {
            match kind {
                AuthorityKind::Mint => mint_state.mint_authority = None,
                AuthorityKind::Freeze => mint_state.freeze_authority = None,
            }
        }
        Ok(state.next_signature())
    }

    async fn health(&self) -> LedgerResult<()> {
        self.enter(LedgerOp::Health).await
    }
}
