//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Match verbosity to the run mode once it is known, and again whenever a reload
//!   changes it
//!
//! # Design Decisions
//! - `RUST_LOG` always wins over the run mode
//! - The filter sits behind a reload layer because the run mode is only known after
//!   the configuration has been parsed, which itself logs

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::{ConfigStore, RunMode};

const DEV_FILTER: &str = "forum_server=debug,tower_http=debug";
const PRO_FILTER: &str = "forum_server=info,tower_http=info";

/// Handle for adjusting the global filter after initialization.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init() -> LogHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEV_FILTER), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogHandle {
        filter: handle,
        from_env,
    }
}

fn filter_for(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Development => DEV_FILTER,
        RunMode::Production => PRO_FILTER,
    }
}

impl LogHandle {
    pub fn apply_run_mode(&self, mode: RunMode) {
        if self.from_env {
            return;
        }
        match self.filter.reload(EnvFilter::new(filter_for(mode))) {
            Ok(()) => tracing::info!(run_mode = mode.as_str(), "Log level set for run mode"),
            Err(e) => tracing::warn!(error = %e, "Failed to change log level"),
        }
    }

    /// Re-apply the filter whenever a reload changes `run_mode`, until shutdown.
    pub fn follow_run_mode(
        self,
        store: ConfigStore,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let mut published = store.subscribe();
        let mut mode = store.snapshot().run_mode;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = published.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = store.snapshot().run_mode;
                        if next != mode {
                            mode = next;
                            self.apply_run_mode(mode);
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_filter_is_quieter() {
        assert_eq!(filter_for(RunMode::Development), DEV_FILTER);
        assert_eq!(filter_for(RunMode::Production), PRO_FILTER);
        assert!(filter_for(RunMode::Production).contains("forum_server=info"));
    }
}
