//! Internationalization.
//!
//! Each supported language has a shipped catalog `conf/global/locale_<lang>.ini`
//! and an optional site overlay `conf/locale_<lang>.ini`. Catalogs are loaded at
//! startup (a missing shipped catalog is fatal) and reloaded together with `app.ini`.

pub mod catalog;

pub use catalog::{Catalog, LocaleError, LocaleStore};
