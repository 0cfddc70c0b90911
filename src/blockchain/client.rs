//! Solana JSON-RPC ledger with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the configured JSON-RPC endpoint
//! - Build, sign and confirm token program transactions
//! - Decode mint accounts for on-chain state checks
//! - Handle timeouts and network errors gracefully

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::ledger::TokenLedger;
use crate::blockchain::types::{
    parse_commitment, AuthorityKind, LedgerError, LedgerResult, MintState, RpcConfig,
};
use crate::resilience::with_deadline;

/// Token ledger backed by a Solana RPC node.
#[derive(Clone)]
pub struct RpcLedger {
    rpc: Arc<RpcClient>,
    config: RpcConfig,
    commitment: CommitmentConfig,
    timeout_duration: Duration,
}

impl RpcLedger {
    /// Create a new ledger client.
    ///
    /// No request is made; an unreachable endpoint surfaces on first use.
    pub fn new(config: RpcConfig) -> LedgerResult<Self> {
        let url: url::Url = config.url.parse().map_err(|e| {
            LedgerError::NotAvailable(format!("Invalid RPC URL '{}': {}", config.url, e))
        })?;
        let commitment = parse_commitment(&config.commitment).ok_or_else(|| {
            LedgerError::NotAvailable(format!("Unknown commitment '{}'", config.commitment))
        })?;
        let timeout_duration = Duration::from_secs(config.timeout_secs);

        let rpc = RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            timeout_duration,
            commitment,
        );

        tracing::info!(
            rpc_url = %config.url,
            commitment = %config.commitment,
            "RPC ledger initialized"
        );

        Ok(Self {
            rpc: Arc::new(rpc),
            config,
            commitment,
            timeout_duration,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Sign with `signers` (payer first) and wait for confirmation.
    async fn send(
        &self,
        op: &'static str,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> LedgerResult<Signature> {
        let payer = signers
            .first()
            .ok_or_else(|| LedgerError::Instruction("transaction needs a payer".to_string()))?;

        let blockhash =
            with_deadline(self.timeout_duration, op, self.rpc.get_latest_blockhash()).await?;
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            signers,
            blockhash,
        );

        let signature = with_deadline(
            self.timeout_duration,
            op,
            self.rpc.send_and_confirm_transaction(&transaction),
        )
        .await?;

        tracing::debug!(op, signature = %signature, "Transaction confirmed");
        Ok(signature)
    }

    async fn account_data(&self, address: &Pubkey) -> LedgerResult<Option<(Pubkey, Vec<u8>)>> {
        let response = with_deadline(
            self.timeout_duration,
            "get_account",
            self.rpc.get_account_with_commitment(address, self.commitment),
        )
        .await?;
        Ok(response.value.map(|account| (account.owner, account.data)))
    }
}

fn to_option(value: COption<Pubkey>) -> Option<Pubkey> {
    match value {
        COption::Some(key) => Some(key),
        COption::None => None,
    }
}

/// Decode raw mint account data owned by the token program.
pub fn decode_mint(address: Pubkey, owner: &Pubkey, data: &[u8]) -> LedgerResult<MintState> {
    if owner != &spl_token::id() {
        return Err(LedgerError::InvalidAccount {
            address,
            reason: format!("owned by {} instead of the token program", owner),
        });
    }
    let mint = Mint::unpack(data).map_err(|e| LedgerError::InvalidAccount {
        address,
        reason: e.to_string(),
    })?;

    Ok(MintState {
        address,
        decimals: mint.decimals,
        supply: mint.supply,
        mint_authority: to_option(mint.mint_authority),
        freeze_authority: to_option(mint.freeze_authority),
    })
}

#[async_trait]
impl TokenLedger for RpcLedger {
    async fn balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        with_deadline(self.timeout_duration, "get_balance", self.rpc.get_balance(address)).await
    }

    async fn mint_state(&self, mint: &Pubkey) -> LedgerResult<Option<MintState>> {
        match self.account_data(mint).await? {
            Some((owner, data)) => decode_mint(*mint, &owner, &data).map(Some),
            None => Ok(None),
        }
    }

    async fn create_mint(
        &self,
        payer: &Keypair,
        mint: &Keypair,
        decimals: u8,
        mint_authority: &Pubkey,
        freeze_authority: &Pubkey,
    ) -> LedgerResult<Signature> {
        let rent = with_deadline(
            self.timeout_duration,
            "get_rent",
            self.rpc.get_minimum_balance_for_rent_exemption(Mint::LEN),
        )
        .await?;

        let instructions = vec![
            system_instruction::create_account(
                &payer.pubkey(),
                &mint.pubkey(),
                rent,
                Mint::LEN as u64,
                &spl_token::id(),
            ),
            spl_token::instruction::initialize_mint2(
                &spl_token::id(),
                &mint.pubkey(),
                mint_authority,
                Some(freeze_authority),
                decimals,
            )
            .map_err(|e| LedgerError::Instruction(e.to_string()))?,
        ];

        self.send("create_mint", &instructions, &[payer, mint]).await
    }

    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> LedgerResult<Pubkey> {
        let address = spl_associated_token_account::get_associated_token_address(owner, mint);
        if self.account_data(&address).await?.is_some() {
            tracing::debug!(token_account = %address, "Reusing associated token account");
            return Ok(address);
        }

        let instruction =
            spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                &payer.pubkey(),
                owner,
                mint,
                &spl_token::id(),
            );
        self.send("create_token_account", &[instruction], &[payer]).await?;
        Ok(address)
    }

    async fn mint_to(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        account: &Pubkey,
        amount: u64,
    ) -> LedgerResult<Signature> {
        let instruction = spl_token::instruction::mint_to(
            &spl_token::id(),
            mint,
            account,
            &authority.pubkey(),
            &[],
            amount,
        )
        .map_err(|e| LedgerError::Instruction(e.to_string()))?;

        self.send("mint_to", &[instruction], &[authority]).await
    }

    async fn revoke_authority(
        &self,
        authority: &Keypair,
        mint: &Pubkey,
        kind: AuthorityKind,
    ) -> LedgerResult<Signature> {
        let instruction = spl_token::instruction::set_authority(
            &spl_token::id(),
            mint,
            None,
            kind.into(),
            &authority.pubkey(),
            &[],
        )
        .map_err(|e| LedgerError::Instruction(e.to_string()))?;

        self.send("set_authority", &[instruction], &[authority]).await
    }

    async fn health(&self) -> LedgerResult<()> {
        with_deadline(self.timeout_duration, "get_health", self.rpc.get_health()).await
    }
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("rpc_url", &self.config.url)
            .field("commitment", &self.config.commitment)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RpcConfig {
        RpcConfig {
            url: "http://127.0.0.1:1".to_string(),
            commitment: "confirmed".to_string(),
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_ledger_creation() {
        // Creation never touches the network
        assert!(RpcLedger::new(test_config()).is_ok());
    }

    #[test]
    fn test_rejects_bad_url_and_commitment() {
        let mut config = test_config();
        config.url = "not a url".to_string();
        assert!(matches!(RpcLedger::new(config), Err(LedgerError::NotAvailable(_))));

        let mut config = test_config();
        config.commitment = "soon".to_string();
        assert!(matches!(RpcLedger::new(config), Err(LedgerError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let ledger = RpcLedger::new(test_config()).unwrap();
        assert!(ledger.health().await.is_err());
    }

    #[test]
    fn test_decode_mint() {
        let address = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mint = Mint {
            mint_authority: COption::Some(authority),
            supply: 100,
            decimals: 2,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(mint, &mut data).unwrap();

        let state = decode_mint(address, &spl_token::id(), &data).unwrap();
        assert_eq!(state.decimals, 2);
        assert_eq!(state.supply, 100);
        assert_eq!(state.mint_authority, Some(authority));
        assert_eq!(state.freeze_authority, None);
    }

    #[test]
    fn test_decode_rejects_foreign_owner() {
        let address = Pubkey::new_unique();
        let result = decode_mint(address, &Pubkey::new_unique(), &[0u8; Mint::LEN]);
        assert!(matches!(result, Err(LedgerError::InvalidAccount { .. })));
    }
}
