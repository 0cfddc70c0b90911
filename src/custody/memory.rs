//! In-memory key custody. Keys are lost when the process exits.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::custody::{CustodyResult, KeyCustody, KeyRole};

/// Custody holding keypairs in process memory.
///
/// Retired keypairs are kept for the life of the process so lamports left on
/// an authority can still be recovered.
#[derive(Debug, Default)]
pub struct MemoryCustody {
    pending: Mutex<HashMap<KeyRole, Keypair>>,
    retired: Mutex<Vec<(KeyRole, Keypair)>>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorities retired so far.
    pub fn retired(&self) -> Vec<Pubkey> {
        self.retired
            .lock()
            .expect("custody mutex poisoned")
            .iter()
            .filter(|(role, _)| *role == KeyRole::Authority)
            .map(|(_, keypair)| keypair.pubkey())
            .collect()
    }

    /// Any keypair this custody has held, pending or retired.
    pub fn recover(&self, address: &Pubkey) -> Option<Keypair> {
        let pending = self.pending.lock().expect("custody mutex poisoned");
        let retired = self.retired.lock().expect("custody mutex poisoned");
        pending
            .values()
            .chain(retired.iter().map(|(_, keypair)| keypair))
            .find(|keypair| keypair.pubkey() == *address)
            .map(Keypair::insecure_clone)
    }
}

impl KeyCustody for MemoryCustody {
    fn pending(&self, role: KeyRole) -> CustodyResult<Option<Keypair>> {
        let pending = self.pending.lock().expect("custody mutex poisoned");
        Ok(pending.get(&role).map(Keypair::insecure_clone))
    }

    fn load_or_generate(&self, role: KeyRole) -> CustodyResult<Keypair> {
        let mut pending = self.pending.lock().expect("custody mutex poisoned");
        let keypair = pending.entry(role).or_insert_with(|| {
            let keypair = Keypair::new();
            tracing::info!(%role, address = %keypair.pubkey(), "Generated keypair");
            keypair
        });
        Ok(keypair.insecure_clone())
    }

    fn retire(&self) -> CustodyResult<()> {
        let mut pending = self.pending.lock().expect("custody mutex poisoned");
        let mut retired = self.retired.lock().expect("custody mutex poisoned");
        for role in KeyRole::ALL {
            if let Some(keypair) = pending.remove(&role) {
                retired.push((role, keypair));
            }
        }
        Ok(())
    }

    fn retire_mint(&self) -> CustodyResult<Option<Pubkey>> {
        let mut pending = self.pending.lock().expect("custody mutex poisoned");
        let Some(keypair) = pending.remove(&KeyRole::Mint) else {
            return Ok(None);
        };
        let mint = keypair.pubkey();
        self.retired
            .lock()
            .expect("custody mutex poisoned")
            .push((KeyRole::Mint, keypair));
        tracing::info!(mint = %mint, "Mint keypair retired");
        Ok(Some(mint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_generate_is_stable() {
        let custody = MemoryCustody::new();
        let a = custody.load_or_generate(KeyRole::Authority).unwrap();
        let b = custody.load_or_generate(KeyRole::Authority).unwrap();
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn test_retire_starts_fresh() {
        let custody = MemoryCustody::new();
        let first = custody.load_or_generate(KeyRole::Authority).unwrap();
        custody.retire().unwrap();

        assert!(custody.pending(KeyRole::Authority).unwrap().is_none());
        assert_eq!(custody.retired(), vec![first.pubkey()]);

        let second = custody.load_or_generate(KeyRole::Authority).unwrap();
        assert_ne!(first.pubkey(), second.pubkey());
    }

    #[test]
    fn test_retired_secret_is_recoverable() {
        let custody = MemoryCustody::new();
        let authority = custody.load_or_generate(KeyRole::Authority).unwrap();
        custody.retire().unwrap();

        let recovered = custody.recover(&authority.pubkey()).unwrap();
        assert_eq!(recovered.to_bytes(), authority.to_bytes());
        assert!(custody.recover(&Pubkey::new_unique()).is_none());
    }

    #[test]
    fn test_retire_mint_keeps_authority() {
        let custody = MemoryCustody::new();
        let authority = custody.load_or_generate(KeyRole::Authority).unwrap();
        let mint = custody.load_or_generate(KeyRole::Mint).unwrap();

        assert_eq!(custody.retire_mint().unwrap(), Some(mint.pubkey()));
        assert_eq!(custody.retire_mint().unwrap(), None);

        let kept = custody.pending(KeyRole::Authority).unwrap().unwrap();
        assert_eq!(kept.pubkey(), authority.pubkey());
        assert!(custody.retired().is_empty());
        assert!(custody.recover(&mint.pubkey()).is_some());
    }
}
