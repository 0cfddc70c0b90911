//! Connected wallet session.
//!
//! The browser extension owns discovery and signing. The server only learns
//! the public key the page reports after the user approves the connection,
//! and uses it as the owner of the associated token account.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors raised by the wallet session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Reported key is not a base58 public key.
    #[error("Invalid wallet public key '{0}'")]
    InvalidPublicKey(String),
}

#[derive(Debug, Default)]
struct SessionState {
    public_key: Option<Pubkey>,
    /// Last authorized wallet, restored on auto-connect.
    remembered: Option<Pubkey>,
}

/// Public view of the session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub connected: bool,
    #[serde(with = "crate::blockchain::types::pubkey_string::option")]
    pub public_key: Option<Pubkey>,
}

/// Shared wallet session handle.
#[derive(Debug, Clone, Default)]
pub struct WalletSession {
    inner: Arc<RwLock<SessionState>>,
}

impl WalletSession {
    /// Create a disconnected session that remembers `remembered` for auto-connect.
    pub fn new(remembered: Option<Pubkey>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                public_key: None,
                remembered,
            })),
        }
    }

    /// Parse a base58 public key reported by the page.
    pub fn parse_public_key(value: &str) -> Result<Pubkey, SessionError> {
        Pubkey::from_str(value.trim()).map_err(|_| SessionError::InvalidPublicKey(value.to_string()))
    }

    /// Connect the wallet and remember it for the next auto-connect.
    pub fn connect(&self, public_key: Pubkey) {
        let mut state = self.inner.write().expect("wallet session lock poisoned");
        state.public_key = Some(public_key);
        state.remembered = Some(public_key);
        tracing::info!(wallet = %public_key, "Wallet connected");
    }

    /// Disconnect and forget the wallet.
    pub fn disconnect(&self) {
        let mut state = self.inner.write().expect("wallet session lock poisoned");
        if let Some(key) = state.public_key.take() {
            tracing::info!(wallet = %key, "Wallet disconnected");
        }
        state.remembered = None;
    }

    /// Reconnect the remembered wallet, if any.
    pub fn restore(&self) -> Option<Pubkey> {
        let mut state = self.inner.write().expect("wallet session lock poisoned");
        if state.public_key.is_none() {
            state.public_key = state.remembered;
            if let Some(key) = state.public_key {
                tracing::info!(wallet = %key, "Wallet auto-connected");
            }
        }
        state.public_key
    }

    /// Whether a wallet is connected.
    pub fn connected(&self) -> bool {
        self.public_key().is_some()
    }

    /// Connected wallet's public key.
    pub fn public_key(&self) -> Option<Pubkey> {
        self.inner.read().expect("wallet session lock poisoned").public_key
    }

    /// Snapshot for the API.
    pub fn info(&self) -> SessionInfo {
        let public_key = self.public_key();
        SessionInfo {
            connected: public_key.is_some(),
            public_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_disconnect() {
        let session = WalletSession::default();
        assert!(!session.connected());

        let key = Pubkey::new_unique();
        session.connect(key);
        assert!(session.connected());
        assert_eq!(session.public_key(), Some(key));

        session.disconnect();
        assert!(!session.connected());
        // Disconnect also forgets the wallet
        assert_eq!(session.restore(), None);
    }

    #[test]
    fn test_restore_remembered_wallet() {
        let key = Pubkey::new_unique();
        let session = WalletSession::new(Some(key));
        assert!(!session.connected());

        assert_eq!(session.restore(), Some(key));
        assert!(session.connected());
    }

    #[test]
    fn test_clones_share_state() {
        let session = WalletSession::default();
        let other = session.clone();
        session.connect(Pubkey::new_unique());
        assert!(other.connected());
    }

    #[test]
    fn test_parse_public_key() {
        let key = Pubkey::new_unique();
        assert_eq!(WalletSession::parse_public_key(&key.to_string()), Ok(key));
        assert!(matches!(
            WalletSession::parse_public_key("0xdeadbeef"),
            Err(SessionError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_info_serializes_base58() {
        let key = Pubkey::new_unique();
        let session = WalletSession::default();
        session.connect(key);

        let json = serde_json::to_value(session.info()).unwrap();
        assert_eq!(json["connected"], true);
        assert_eq!(json["public_key"], key.to_string());
    }
}
