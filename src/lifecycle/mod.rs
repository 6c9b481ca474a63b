//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Ensure app.ini → Load INI → Derive + validate → Locales → Assets → Reload registry
//!     → Background tasks → HTTP listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, reload loop and sweeper exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//!     SIGHUP → settings reload
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap, App, StartupError};
