//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, trace layer)
//!     → handlers.rs (public endpoints) / admin (bearer-protected)
//!     → each handler reads one settings snapshot for the whole request
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
