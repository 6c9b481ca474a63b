//! Configuration directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A change notification for one file in the configuration directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadTrigger {
    pub path: PathBuf,
    /// Lowercased extension without the dot.
    pub extension: Option<String>,
    pub timestamp: SystemTime,
}

impl ReloadTrigger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        Self {
            path,
            extension,
            timestamp: SystemTime::now(),
        }
    }
}

/// The watcher could not attach to the configuration directory.
#[derive(Debug, thiserror::Error)]
pub enum WatchSetupError {
    #[error("configuration directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to watch {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Watches a flat configuration directory and emits a [`ReloadTrigger`] per modified file.
pub struct ConfigWatcher {
    dir: PathBuf,
    trigger_tx: mpsc::UnboundedSender<ReloadTrigger>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for reload triggers.
    pub fn new(dir: &Path) -> (Self, mpsc::UnboundedReceiver<ReloadTrigger>) {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();

        (
            Self {
                dir: dir.to_path_buf(),
                trigger_tx,
            },
            trigger_rx,
        )
    }

    /// Attach to the directory. The returned handle must be kept alive; dropping it
    /// stops notifications and closes the trigger channel.
    pub fn run(self) -> Result<RecommendedWatcher, WatchSetupError> {
        if !self.dir.is_dir() {
            return Err(WatchSetupError::NotADirectory(self.dir));
        }

        let tx = self.trigger_tx;
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        tracing::trace!(?event, "Ignoring config directory event");
                        return;
                    }
                    for path in event.paths {
                        tracing::trace!(
                            path = %path.display(),
                            kind = ?event.kind,
                            "Config file event"
                        );
                        let _ = tx.send(ReloadTrigger::new(path));
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|source| WatchSetupError::Notify {
            path: self.dir.clone(),
            source,
        })?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchSetupError::Notify {
                path: self.dir.clone(),
                source,
            })?;

        tracing::info!(path = %self.dir.display(), "Config watcher started");
        Ok(watcher)
    }
}
