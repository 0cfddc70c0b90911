//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Ledger call:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On expiry: LedgerError::Timeout, attempt fails
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a failed attempt is resumed from its checkpoint instead

pub mod timeouts;

pub use timeouts::with_deadline;
