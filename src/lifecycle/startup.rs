//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration, then locale catalogs
//! - Load asset settings (non-fatal) and build the reload registry
//! - Start background tasks (reload loop, cache sweeper)
//!
//! # Design Decisions
//! - Fail fast: configuration and locale errors abort with exit code 2
//! - Watch setup failure is not fatal; the process serves its startup configuration

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::assets::{AssetCompressor, AssetStore};
use crate::cache::{MemoryCache, DEFAULT_SWEEP_INTERVAL};
use crate::config::derive::derive_settings;
use crate::config::reload::{
    standard_coordinator, AssetReloadHandler, ReloadHandler, SettingsReloadHandler,
};
use crate::config::validation::validate_settings;
use crate::config::{ConfigError, ConfigPaths, ConfigStore, ReloadCoordinator};
use crate::i18n::{LocaleError, LocaleStore};
use crate::lifecycle::signals;
use crate::lifecycle::Shutdown;

/// Exit code for every fatal startup error.
pub const STARTUP_EXIT_CODE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("fail to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("fail to set message file: {0}")]
    Locale(#[from] LocaleError),
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        STARTUP_EXIT_CODE
    }
}

/// Everything initialized before the process starts serving.
#[derive(Clone)]
pub struct App {
    pub paths: ConfigPaths,
    pub store: ConfigStore,
    pub locales: LocaleStore,
    pub assets: AssetStore,
    pub cache: MemoryCache,
    pub coordinator: Arc<ReloadCoordinator>,
}

/// Ordered initial load.
pub fn bootstrap(
    paths: ConfigPaths,
    compressor: Arc<dyn AssetCompressor>,
) -> Result<App, StartupError> {
    let source = paths.ini_source();
    source.ensure_site_file()?;
    let raw = source.load()?;

    let settings = derive_settings(&raw, None)?;
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    tracing::info!(
        app_name = %settings.app.name,
        run_mode = settings.run_mode.as_str(),
        time_zone = %settings.time_zone,
        "Configuration loaded"
    );

    let locales = LocaleStore::load(paths.clone(), &settings.langs)?;
    let store = ConfigStore::new(settings);

    let assets = AssetStore::new();
    let asset_handler = Arc::new(AssetReloadHandler::new(
        paths.compress_json(),
        store.clone(),
        assets.clone(),
        compressor,
    ));
    if paths.compress_json().is_file() {
        if let Err(e) = asset_handler.reload() {
            tracing::error!(error = %e, "Asset compression setup failed");
        }
    } else {
        tracing::debug!(path = %paths.compress_json().display(), "No compression config");
    }

    let settings_handler = Arc::new(SettingsReloadHandler::new(
        source,
        store.clone(),
        locales.clone(),
    ));
    let coordinator = Arc::new(standard_coordinator(settings_handler, asset_handler));

    Ok(App {
        paths,
        store,
        locales,
        assets,
        cache: MemoryCache::new(),
        coordinator,
    })
}

impl App {
    /// Spawn the cache sweeper, the SIGHUP listener and, when `watch` is set, the
    /// config reload loop.
    pub fn start_background(&self, shutdown: &Shutdown, watch: bool) -> Vec<JoinHandle<()>> {
        let mut tasks = vec![self
            .cache
            .spawn_sweeper(DEFAULT_SWEEP_INTERVAL, shutdown.subscribe())];

        if let Some(task) =
            signals::spawn_hangup_reload(self.coordinator.clone(), shutdown.subscribe())
        {
            tasks.push(task);
        }

        if watch {
            match self
                .coordinator
                .clone()
                .spawn(self.paths.conf_dir(), shutdown.subscribe())
            {
                Ok(task) => tasks.push(task),
                Err(e) => tracing::error!(
                    error = %e,
                    "Config watcher unavailable, configuration edits need a restart"
                ),
            }
        }
        tasks
    }
}
