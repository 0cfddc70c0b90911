//! The ledger seam between the mint pipeline and the chain.
//!
//! Every operation is a single confirmed round trip. Implementations must not
//! retry on their own; the pipeline decides what to do with a failure.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};

use crate::blockchain::types::{AuthorityKind, LedgerResult, MintState};

/// Token operations the mint pipeline needs from a chain.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Native balance of an address in lamports.
    async fn balance(&self, address: &Pubkey) -> LedgerResult<u64>;

    /// Decoded mint account, or `None` if the account does not exist.
    async fn mint_state(&self, mint: &Pubkey) -> LedgerResult<Option<MintState>>;

    /// Create and initialize a mint account owned by `mint`'s keypair address.
    async fn create_mint(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        decimals: u8,
        mint_authority: &Pubkey,
        freeze_authority: &Pubkey,
    ) -> LedgerResult<Signature>;

    /// Return the associated token account for (owner, mint), creating it if absent.
    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> LedgerResult<Pubkey>;

    /// Mint `amount` base units into `account`, signed by the mint authority.
    async fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        account: &Pubkey,
        amount: u64,
    ) -> LedgerResult<Signature>;

    /// Set one of the mint's authorities to none.
    async fn revoke_authority(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        kind: AuthorityKind,
    ) -> LedgerResult<Signature>;

    /// Check that the ledger is reachable.
    async fn health(&self) -> LedgerResult<()>;
}
