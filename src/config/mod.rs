//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MinterConfig (validated, immutable)
//!     → handed to lifecycle::startup to build subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::MinterConfig;
pub use schema::{
    CustodyConfig, ListenerConfig, MintConfig, ObservabilityConfig, RpcConfig, TimeoutConfig,
    WalletConfig,
};
