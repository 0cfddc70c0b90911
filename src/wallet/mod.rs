//! Wallet session provider.
//!
//! # Data Flow
//! ```text
//! Browser extension (connect / onlyIfTrusted auto-connect)
//!     → page script posts public key
//!     → session.rs (connected, public_key)
//!     → mint pipeline reads the owner key
//! ```

pub mod session;

pub use session::{SessionError, SessionInfo, WalletSession};
