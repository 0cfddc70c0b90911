//! One-shot fixed-supply token minter.
//!
//! Serves a form page and JSON API. Each submission creates a new mint,
//! sends one whole token to the connected wallet's associated token account
//! and revokes both the mint and the freeze authority.

pub mod blockchain;
pub mod config;
pub mod custody;
pub mod http;
pub mod lifecycle;
pub mod minting;
pub mod observability;
pub mod resilience;
pub mod wallet;

pub use config::schema::MinterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use minting::{MintError, MintForm, MintOutcome, Minter};
