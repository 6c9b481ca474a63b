//! Reload coordination.
//!
//! # State per domain
//! ```text
//! Loaded → (accepted trigger) → Reloading → Loaded
//! ```
//! There is no error state: a failed reload is logged and the domain stays on whatever
//! generation was last published.
//!
//! Handlers are registered against a [`FileMatcher`]. A trigger is routed to the first
//! matching handler, passed through the [`Debouncer`], and then reloaded while holding
//! the coordinator's reload lock so that watcher-driven and admin-forced reloads never
//! interleave.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::assets::{AssetCompressor, AssetError, AssetSettings, AssetStore, CompressOptions};
use crate::config::debounce::Debouncer;
use crate::config::derive::derive_settings;
use crate::config::loader::{ConfigError, IniSource};
use crate::config::store::ConfigStore;
use crate::config::validation::validate_settings;
use crate::config::watcher::{ConfigWatcher, ReloadTrigger, WatchSetupError};
use crate::i18n::LocaleStore;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Re-applies one configuration domain.
pub trait ReloadHandler: Send + Sync {
    /// Short name used in logs, metrics and the admin API.
    fn domain(&self) -> &'static str;

    fn reload(&self) -> Result<(), ReloadError>;
}

/// Decides which triggers a handler receives.
#[derive(Debug, Clone)]
pub enum FileMatcher {
    /// Any file with this (lowercase) extension.
    Extension(String),
    /// Exactly this file.
    Path(PathBuf),
}

impl FileMatcher {
    pub fn extension(ext: &str) -> Self {
        FileMatcher::Extension(ext.trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        FileMatcher::Path(normalize(path.as_ref()))
    }

    pub fn matches(&self, trigger: &ReloadTrigger) -> bool {
        match self {
            FileMatcher::Extension(ext) => trigger.extension.as_deref() == Some(ext.as_str()),
            FileMatcher::Path(path) => normalize(&trigger.path) == *path,
        }
    }
}

/// Canonical form of the file, or of its directory when the file does not exist yet,
/// otherwise absolute.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(dir) = parent.canonicalize() {
            return dir.join(name);
        }
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Result of dispatching one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// No handler matches the file.
    Ignored,
    /// Same modification time as the last accepted event.
    Debounced(&'static str),
    Reloaded(&'static str),
    Failed(&'static str),
}

impl ReloadOutcome {
    fn label(&self) -> &'static str {
        match self {
            ReloadOutcome::Ignored => "ignored",
            ReloadOutcome::Debounced(_) => "debounced",
            ReloadOutcome::Reloaded(_) => "reloaded",
            ReloadOutcome::Failed(_) => "failed",
        }
    }
}

pub struct ReloadCoordinator {
    routes: Vec<(FileMatcher, Arc<dyn ReloadHandler>)>,
    debouncer: Debouncer,
    reload_lock: Mutex<()>,
}

impl Default for ReloadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadCoordinator {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            debouncer: Debouncer::new(),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn register(mut self, matcher: FileMatcher, handler: Arc<dyn ReloadHandler>) -> Self {
        tracing::debug!(domain = handler.domain(), ?matcher, "Reload handler registered");
        self.routes.push((matcher, handler));
        self
    }

    pub fn domains(&self) -> Vec<&'static str> {
        self.routes.iter().map(|(_, h)| h.domain()).collect()
    }

    /// Route, debounce and apply one trigger. Blocks until the reload finishes.
    pub fn dispatch(&self, trigger: &ReloadTrigger) -> ReloadOutcome {
        let Some((_, handler)) = self.routes.iter().find(|(m, _)| m.matches(trigger)) else {
            return ReloadOutcome::Ignored;
        };
        let domain = handler.domain();

        if self.debouncer.should_skip(&trigger.path) {
            tracing::trace!(path = %trigger.path.display(), domain, "Duplicate event skipped");
            let outcome = ReloadOutcome::Debounced(domain);
            metrics::record_reload(domain, outcome.label());
            return outcome;
        }

        tracing::info!(path = %trigger.path.display(), domain, "Config change detected, reloading");
        self.apply(handler.as_ref())
    }

    /// Reload a domain by name without a file event and without debouncing.
    pub fn force(&self, domain: &str) -> Option<ReloadOutcome> {
        let (_, handler) = self.routes.iter().find(|(_, h)| h.domain() == domain)?;
        tracing::info!(domain, "Forced reload requested");
        Some(self.apply(handler.as_ref()))
    }

    fn apply(&self, handler: &dyn ReloadHandler) -> ReloadOutcome {
        let domain = handler.domain();
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let outcome = match handler.reload() {
            Ok(()) => {
                tracing::info!(domain, "Config reloaded");
                ReloadOutcome::Reloaded(domain)
            }
            Err(e) => {
                tracing::error!(domain, error = %e, "Config reload failed, keeping current values");
                ReloadOutcome::Failed(domain)
            }
        };
        metrics::record_reload(domain, outcome.label());
        outcome
    }

    /// Attach a watcher to `conf_dir` and process its triggers on a background task
    /// until `shutdown` fires.
    pub fn spawn(
        self: Arc<Self>,
        conf_dir: &Path,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, WatchSetupError> {
        let (watcher, triggers) = ConfigWatcher::new(conf_dir);
        let handle = watcher.run()?;

        Ok(tokio::spawn(async move {
            // Dropping the notify handle ends the event stream.
            let _watcher = handle;
            self.run(triggers, shutdown).await;
        }))
    }

    /// Event loop: one reload at a time, in delivery order.
    pub async fn run(
        self: Arc<Self>,
        mut triggers: mpsc::UnboundedReceiver<ReloadTrigger>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                maybe = triggers.recv() => {
                    let Some(trigger) = maybe else {
                        tracing::warn!("Config watcher closed, hot reload disabled");
                        break;
                    };
                    let coordinator = self.clone();
                    let processed =
                        tokio::task::spawn_blocking(move || coordinator.dispatch(&trigger)).await;
                    match processed {
                        Ok(outcome) => tracing::trace!(?outcome, "Trigger processed"),
                        Err(e) => tracing::error!(error = %e, "Reload task aborted"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config reload loop stopping");
                    break;
                }
            }
        }
    }
}

/// Handles `.ini` changes: primary config, locale catalogs, derived settings.
pub struct SettingsReloadHandler {
    source: IniSource,
    store: ConfigStore,
    locales: LocaleStore,
}

impl SettingsReloadHandler {
    pub fn new(source: IniSource, store: ConfigStore, locales: LocaleStore) -> Self {
        Self {
            source,
            store,
            locales,
        }
    }
}

impl ReloadHandler for SettingsReloadHandler {
    fn domain(&self) -> &'static str {
        "settings"
    }

    fn reload(&self) -> Result<(), ReloadError> {
        let raw = self.source.load()?;
        let current = self.store.snapshot();

        let derived = derive_settings(&raw, Some(current.as_ref())).and_then(|settings| {
            validate_settings(&settings)
                .map(|()| settings)
                .map_err(ConfigError::Validation)
        });

        let langs = match &derived {
            Ok(settings) => settings.langs.clone(),
            Err(_) => current.langs.clone(),
        };
        let locales_loaded = match self.locales.reload(&langs) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Locale reload failed, keeping previous catalogs");
                false
            }
        };

        let mut settings = derived?;
        if !locales_loaded {
            // Published langs must name catalogs that are actually loaded.
            settings.langs = self.locales.langs();
        }
        let generation = self.store.publish(settings);
        tracing::debug!(generation, "Settings reloaded");
        Ok(())
    }
}

/// Handles changes to the compression config file.
pub struct AssetReloadHandler {
    path: PathBuf,
    store: ConfigStore,
    assets: AssetStore,
    compressor: Arc<dyn AssetCompressor>,
}

impl AssetReloadHandler {
    pub fn new(
        path: PathBuf,
        store: ConfigStore,
        assets: AssetStore,
        compressor: Arc<dyn AssetCompressor>,
    ) -> Self {
        Self {
            path,
            store,
            assets,
            compressor,
        }
    }
}

impl ReloadHandler for AssetReloadHandler {
    fn domain(&self) -> &'static str {
        "assets"
    }

    fn reload(&self) -> Result<(), ReloadError> {
        let settings = self.store.snapshot();
        let assets =
            AssetSettings::load_json(&self.path, settings.is_pro_mode(), &settings.app.url)?;

        if settings.is_pro_mode() {
            let report = self.compressor.compress(
                &assets,
                CompressOptions {
                    force: true,
                    verbose: true,
                },
            )?;
            tracing::info!(written = report.written, "Assets compressed");
        }

        self.assets.publish(assets);
        Ok(())
    }
}

/// The standard registry: every `.ini` file reloads settings, the compression config
/// file reloads assets, everything else is ignored.
pub fn standard_coordinator(
    settings: Arc<SettingsReloadHandler>,
    assets: Arc<AssetReloadHandler>,
) -> ReloadCoordinator {
    let compress_path = assets.path.clone();
    ReloadCoordinator::new()
        .register(FileMatcher::extension("ini"), settings)
        .register(FileMatcher::path(compress_path), assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        domain: &'static str,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(domain: &'static str) -> Arc<Self> {
            Arc::new(Self {
                domain,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReloadHandler for Counting {
        fn domain(&self) -> &'static str {
            self.domain
        }

        fn reload(&self) -> Result<(), ReloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ConfigError::TimeZone {
                    zone: "x".into(),
                    reason: "test".into(),
                }
                .into())
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        dir: PathBuf,
        ini: Arc<Counting>,
        assets: Arc<Counting>,
        coordinator: ReloadCoordinator,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        for name in ["app.ini", "compress.json", "other.json", "notes.txt"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
        let ini = Counting::new("settings");
        let assets = Counting::new("assets");
        let coordinator = ReloadCoordinator::new()
            .register(FileMatcher::extension("ini"), ini.clone())
            .register(FileMatcher::path(dir.join("compress.json")), assets.clone());
        Fixture {
            _dir: tmp,
            dir,
            ini,
            assets,
            coordinator,
        }
    }

    #[test]
    fn duplicate_event_reloads_once() {
        let f = fixture();
        let trigger = ReloadTrigger::new(f.dir.join("app.ini"));

        assert_eq!(f.coordinator.dispatch(&trigger), ReloadOutcome::Reloaded("settings"));
        assert_eq!(f.coordinator.dispatch(&trigger), ReloadOutcome::Debounced("settings"));
        assert_eq!(f.ini.calls(), 1);
    }

    #[test]
    fn unrelated_extensions_are_ignored() {
        let f = fixture();
        let outcome = f.coordinator.dispatch(&ReloadTrigger::new(f.dir.join("notes.txt")));

        assert_eq!(outcome, ReloadOutcome::Ignored);
        assert_eq!(f.ini.calls(), 0);
        assert_eq!(f.assets.calls(), 0);
    }

    #[test]
    fn only_the_compression_file_reloads_assets() {
        let f = fixture();

        let other = f.coordinator.dispatch(&ReloadTrigger::new(f.dir.join("other.json")));
        assert_eq!(other, ReloadOutcome::Ignored);
        assert_eq!(f.assets.calls(), 0);

        let compress = f.coordinator.dispatch(&ReloadTrigger::new(f.dir.join("compress.json")));
        assert_eq!(compress, ReloadOutcome::Reloaded("assets"));
        assert_eq!(f.assets.calls(), 1);
        assert_eq!(f.ini.calls(), 0);
    }

    #[test]
    fn relative_and_absolute_paths_match_the_same_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("compress.json");
        std::fs::write(&file, "{}").unwrap();

        let matcher = FileMatcher::path(&file);
        let dotted = tmp.path().join(".").join("compress.json");
        assert!(matcher.matches(&ReloadTrigger::new(dotted)));
        assert!(!matcher.matches(&ReloadTrigger::new(tmp.path().join("app.json"))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_matches_file_created_after_registration() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let matcher = FileMatcher::path(link.join("compress.json"));
        std::fs::write(link.join("compress.json"), "{}").unwrap();

        assert!(matcher.matches(&ReloadTrigger::new(link.join("compress.json"))));
        assert!(matcher.matches(&ReloadTrigger::new(real.join("compress.json"))));
    }

    #[test]
    fn failures_are_reported_and_forced_reloads_bypass_debounce() {
        let failing = Arc::new(Counting {
            domain: "settings",
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let coordinator =
            ReloadCoordinator::new().register(FileMatcher::extension("ini"), failing.clone());

        assert_eq!(coordinator.force("settings"), Some(ReloadOutcome::Failed("settings")));
        assert_eq!(coordinator.force("settings"), Some(ReloadOutcome::Failed("settings")));
        assert_eq!(coordinator.force("unknown"), None);
        assert_eq!(failing.calls(), 2);
        assert_eq!(coordinator.domains(), vec!["settings"]);
    }

    #[tokio::test]
    async fn run_loop_processes_triggers_until_shutdown() {
        let f = fixture();
        let ini = f.ini.clone();
        let coordinator = Arc::new(f.coordinator);
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(coordinator.run(rx, shutdown_rx));
        tx.send(ReloadTrigger::new(f.dir.join("app.ini"))).unwrap();
        tx.send(ReloadTrigger::new(f.dir.join("app.ini"))).unwrap();

        for _ in 0..50 {
            if ini.calls() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        shutdown_tx.send(()).unwrap();
        task.await.unwrap();

        assert_eq!(ini.calls(), 1);
    }
}
