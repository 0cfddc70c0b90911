//! Mint form input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::types::{base_units, MAX_DECIMALS};

/// Longest symbol the form keeps.
pub const MAX_SYMBOL_LEN: usize = 5;

/// Form validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Token name is required")]
    MissingName,

    #[error("Token symbol is required")]
    MissingSymbol,

    #[error("Decimals must be between 0 and 9, got {0}")]
    DecimalsOutOfRange(u8),

    #[error("Metadata URI '{0}' is not a valid URL")]
    InvalidUri(String),
}

/// Values submitted with the mint form.
///
/// The metadata URI is accepted and echoed back but never written on-chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintForm {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub uri: String,
}

impl MintForm {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        uri: impl Into<String>,
    ) -> Self {
        let mut form = Self {
            name: name.into(),
            symbol: String::new(),
            decimals,
            uri: uri.into(),
        };
        form.set_symbol(symbol.into());
        form
    }

    /// Set the symbol, dropping everything past the fifth character.
    pub fn set_symbol(&mut self, symbol: impl AsRef<str>) {
        self.symbol = truncate_symbol(symbol.as_ref());
    }

    /// Copy with input-level limits applied, as the page would have.
    pub fn normalized(mut self) -> Self {
        self.symbol = truncate_symbol(&self.symbol);
        self
    }

    /// Whether the submit action is enabled.
    pub fn can_submit(&self, connected: bool) -> bool {
        !self.name.is_empty() && !self.symbol.is_empty() && connected
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.is_empty() {
            return Err(FormError::MissingName);
        }
        if self.symbol.is_empty() {
            return Err(FormError::MissingSymbol);
        }
        if self.decimals > MAX_DECIMALS {
            return Err(FormError::DecimalsOutOfRange(self.decimals));
        }
        if !self.uri.is_empty() && url::Url::parse(&self.uri).is_err() {
            return Err(FormError::InvalidUri(self.uri.clone()));
        }
        Ok(())
    }

    /// Initial supply in base units: one whole token.
    pub fn initial_supply(&self) -> u64 {
        base_units(self.decimals)
    }
}

/// Keep at most `MAX_SYMBOL_LEN` characters.
pub fn truncate_symbol(symbol: &str) -> String {
    symbol.chars().take(MAX_SYMBOL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_requires_all_three() {
        let form = MintForm::new("Example Token", "EXMPL", 0, "");
        assert!(form.can_submit(true));
        assert!(!form.can_submit(false));

        let no_name = MintForm::new("", "EXMPL", 0, "");
        assert!(!no_name.can_submit(true));

        let no_symbol = MintForm::new("Example Token", "", 0, "");
        assert!(!no_symbol.can_submit(true));

        assert!(!MintForm::default().can_submit(false));
    }

    #[test]
    fn test_symbol_truncated_at_fifth_char() {
        assert_eq!(MintForm::new("n", "ABCDEFG", 0, "").symbol, "ABCDE");
        assert_eq!(MintForm::new("n", "ABCDE", 0, "").symbol, "ABCDE");
        assert_eq!(MintForm::new("n", "ÅÄÖÜßX", 0, "").symbol, "ÅÄÖÜß");

        let mut form = MintForm::default();
        form.set_symbol("TOOLONG");
        assert_eq!(form.symbol, "TOOLO");
    }

    #[test]
    fn test_normalized_truncates_deserialized_input() {
        let form: MintForm =
            serde_json::from_str(r#"{"name":"n","symbol":"SIXSIX"}"#).unwrap();
        assert_eq!(form.decimals, 0);
        assert_eq!(form.normalized().symbol, "SIXSI");
    }

    #[test]
    fn test_validate() {
        assert!(MintForm::new("n", "S", 9, "https://arweave.net/x.json").validate().is_ok());
        assert_eq!(MintForm::new("", "S", 0, "").validate(), Err(FormError::MissingName));
        assert_eq!(MintForm::new("n", "", 0, "").validate(), Err(FormError::MissingSymbol));
        assert_eq!(
            MintForm::new("n", "S", 10, "").validate(),
            Err(FormError::DecimalsOutOfRange(10))
        );
        assert!(matches!(
            MintForm::new("n", "S", 0, "not a url").validate(),
            Err(FormError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_initial_supply_is_one_token() {
        for d in 0..=MAX_DECIMALS {
            assert_eq!(MintForm::new("n", "S", d, "").initial_supply(), 10u64.pow(d as u32));
        }
    }
}
