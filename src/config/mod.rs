//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! conf/global/app.ini + conf/app.ini
//!     → loader.rs (parse layered INI into RawConfig)
//!     → derive.rs (typed settings with defaults and fallbacks)
//!     → validation.rs (semantic checks)
//!     → store.rs (publish immutable Settings generation via ArcSwap)
//!
//! On file change:
//!     watcher.rs emits ReloadTrigger
//!     → reload.rs routes it to a handler by FileMatcher
//!     → debounce.rs drops repeats with an unchanged mtime
//!     → handler re-runs loader → derive → validation → store
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once published; readers hold one snapshot per request
//! - Startup errors are fatal, the same errors during reload only log
//! - One reload runs at a time; the watcher loop waits for it to finish

pub mod debounce;
pub mod derive;
pub mod loader;
pub mod reload;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigPaths, IniSource, RawConfig};
pub use reload::{ReloadCoordinator, ReloadOutcome};
pub use schema::{RunMode, Settings};
pub use store::ConfigStore;
pub use watcher::{ReloadTrigger, WatchSetupError};
