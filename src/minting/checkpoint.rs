//! Checkpoints for resumable mint attempts.
//!
//! A checkpoint is written once the attempt's keys exist and updated after
//! each confirmed step. It is removed when the keys are retired.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::types::pubkey_string;
use crate::minting::form::MintForm;
use crate::minting::phase::MintPhase;

/// Errors reading or writing checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Progress of an unfinished attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub attempt: Uuid,
    #[serde(with = "pubkey_string")]
    pub owner: Pubkey,
    pub form: MintForm,
    #[serde(with = "pubkey_string")]
    pub authority: Pubkey,
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    #[serde(default, with = "pubkey_string::option")]
    pub token_account: Option<Pubkey>,
    /// Last phase whose on-chain effect is confirmed.
    pub completed: MintPhase,
}

impl Checkpoint {
    /// Whether a new submission may pick this checkpoint up.
    pub fn resumable_by(&self, owner: &Pubkey, form: &MintForm) -> bool {
        self.owner == *owner && self.form.decimals == form.decimals
    }
}

/// Checkpoint storage: a JSON file, or memory when no directory is configured.
#[derive(Debug, Default)]
pub struct CheckpointStore {
    path: Option<PathBuf>,
    memory: Mutex<Option<Checkpoint>>,
}

impl CheckpointStore {
    /// Store checkpoints in process memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store the checkpoint at `<dir>/checkpoint.json`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(dir.into().join("checkpoint.json")),
            memory: Mutex::new(None),
        }
    }

    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        match &self.path {
            Some(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                let content = fs::read_to_string(path)?;
                Ok(Some(serde_json::from_str(&content)?))
            }
            None => Ok(self.memory.lock().expect("checkpoint mutex poisoned").clone()),
        }
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        match &self.path {
            Some(path) => {
                // Write then rename so a crash never leaves a half-written file
                let tmp = path.with_extension("json.tmp");
                fs::write(&tmp, serde_json::to_vec_pretty(checkpoint)?)?;
                fs::rename(&tmp, path)?;
            }
            None => {
                *self.memory.lock().expect("checkpoint mutex poisoned") = Some(checkpoint.clone());
            }
        }
        tracing::debug!(
            attempt = %checkpoint.attempt,
            completed = %checkpoint.completed,
            "Checkpoint saved"
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CheckpointError> {
        match &self.path {
            Some(path) => {
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
            None => {
                self.memory.lock().expect("checkpoint mutex poisoned").take();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint() -> Checkpoint {
        Checkpoint {
            attempt: Uuid::new_v4(),
            owner: Pubkey::new_unique(),
            form: MintForm::new("Example Token", "EXMPL", 2, ""),
            authority: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            token_account: None,
            completed: MintPhase::CreatingMint,
        }
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);

        let cp = checkpoint();
        store.save(&cp).unwrap();

        let reopened = CheckpointStore::in_dir(dir.path());
        assert_eq!(reopened.load().unwrap(), Some(cp));

        reopened.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = CheckpointStore::in_memory();
        let mut cp = checkpoint();
        store.save(&cp).unwrap();

        cp.token_account = Some(Pubkey::new_unique());
        cp.completed = MintPhase::FetchingAccount;
        store.save(&cp).unwrap();
        assert_eq!(store.load().unwrap(), Some(cp));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("checkpoint.json"), "{ not json").unwrap();
        let store = CheckpointStore::in_dir(dir.path());
        assert!(matches!(store.load(), Err(CheckpointError::Corrupt(_))));
    }

    #[test]
    fn test_resumable_by() {
        let cp = checkpoint();
        let same = MintForm::new("Renamed", "NEW", 2, "");
        assert!(cp.resumable_by(&cp.owner, &same));
        assert!(!cp.resumable_by(&Pubkey::new_unique(), &same));
        assert!(!cp.resumable_by(&cp.owner, &MintForm::new("Example Token", "EXMPL", 3, "")));
    }
}
