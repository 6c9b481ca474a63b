//! Forum server: configuration bootstrap and live reload.

pub mod admin;
pub mod assets;
pub mod cache;
pub mod config;
pub mod http;
pub mod i18n;
pub mod lifecycle;
pub mod observability;

pub use config::{ConfigStore, Settings};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
