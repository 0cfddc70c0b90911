//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID header, per-route metrics)
//!     → handlers.rs (page, wallet, mint, status, checkpoint)
//!     → events.rs (SSE progress stream)
//!     → response.rs (errors to status codes and JSON bodies)
//! ```

pub mod events;
pub mod handlers;
pub mod page;
pub mod request;
pub mod response;
pub mod server;

pub use events::{SseDecoder, SseFrame};
pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
