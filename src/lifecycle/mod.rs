//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build ledger, custody, session → Minter → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Close event streams → Stop accepting → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! An attempt interrupted by shutdown keeps its checkpoint and resumes on
//! the next submission.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_services, Services, StartupError};
