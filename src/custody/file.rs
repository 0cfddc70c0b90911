//! File-backed key custody.
//!
//! Keypairs use the Solana CLI JSON format, so a stuck authority can be
//! inspected or drained with standard tooling.
//!
//! ```text
//! <dir>/pending/authority.json
//! <dir>/pending/mint.json
//! <dir>/retired/<authority pubkey>/{authority,mint}.json
//! <dir>/retired/<mint pubkey>/mint.json       (abandoned attempts)
//! ```

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, write_keypair_file, Keypair, Signer};
use std::fs;
use std::path::{Path, PathBuf};

use crate::custody::{CustodyError, CustodyResult, KeyCustody, KeyRole};

/// Custody storing keypairs under a directory.
#[derive(Debug, Clone)]
pub struct FileCustody {
    dir: PathBuf,
}

impl FileCustody {
    /// Open (and create if needed) a custody directory.
    pub fn open(dir: impl Into<PathBuf>) -> CustodyResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join("pending"))?;
        fs::create_dir_all(dir.join("retired"))?;
        tracing::info!(path = ?dir, "File custody opened");
        Ok(Self { dir })
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn pending_path(&self, role: KeyRole) -> PathBuf {
        self.dir.join("pending").join(role.file_name())
    }
}

impl KeyCustody for FileCustody {
    fn pending(&self, role: KeyRole) -> CustodyResult<Option<Keypair>> {
        let path = self.pending_path(role);
        if !path.exists() {
            return Ok(None);
        }
        read_keypair_file(&path)
            .map(Some)
            .map_err(|e| CustodyError::Keypair {
                path,
                reason: e.to_string(),
            })
    }

    fn load_or_generate(&self, role: KeyRole) -> CustodyResult<Keypair> {
        if let Some(keypair) = self.pending(role)? {
            tracing::info!(%role, address = %keypair.pubkey(), "Reusing pending keypair");
            return Ok(keypair);
        }

        let keypair = Keypair::new();
        let path = self.pending_path(role);
        write_keypair_file(&keypair, &path).map_err(|e| CustodyError::Keypair {
            path,
            reason: e.to_string(),
        })?;
        tracing::info!(%role, address = %keypair.pubkey(), "Generated keypair");
        Ok(keypair)
    }

    fn retire(&self) -> CustodyResult<()> {
        let authority = match self.pending(KeyRole::Authority)? {
            Some(keypair) => keypair.pubkey(),
            None => return Ok(()),
        };

        let dest = self.dir.join("retired").join(authority.to_string());
        fs::create_dir_all(&dest)?;
        for role in KeyRole::ALL {
            let from = self.pending_path(role);
            if from.exists() {
                fs::rename(&from, dest.join(role.file_name()))?;
            }
        }
        tracing::info!(authority = %authority, path = ?dest, "Keypairs retired");
        Ok(())
    }

    fn retire_mint(&self) -> CustodyResult<Option<Pubkey>> {
        let mint = match self.pending(KeyRole::Mint)? {
            Some(keypair) => keypair.pubkey(),
            None => return Ok(None),
        };

        let dest = self.dir.join("retired").join(mint.to_string());
        fs::create_dir_all(&dest)?;
        fs::rename(self.pending_path(KeyRole::Mint), dest.join(KeyRole::Mint.file_name()))?;
        tracing::info!(mint = %mint, path = ?dest, "Mint keypair retired");
        Ok(Some(mint))
    }
}
