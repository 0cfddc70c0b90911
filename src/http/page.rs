//! The mint form page.
//!
//! A single static document. The wallet extension is driven from the page's
//! script, which reports the connected public key to `/api/wallet/connect`.

/// Rendered form page.
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");
