//! Modification-time debouncing for filesystem notifications.
//!
//! A single save usually produces several notify events. Each accepted event records
//! the file's modification time; later events that observe the same time are skipped.
//!
//! Two edits landing within the filesystem's timestamp granularity look identical and
//! the second is skipped. Timestamps are compared at full `SystemTime` precision rather
//! than whole seconds, which narrows that window on filesystems with sub-second mtimes.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dashmap::DashMap;

/// Per-path table of the last accepted modification time.
///
/// Entries are never removed; the key space is the fixed set of files in the
/// configuration directory.
#[derive(Debug, Default)]
pub struct Debouncer {
    seen: DashMap<PathBuf, SystemTime>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stat `path` and decide whether this event repeats the last accepted one.
    ///
    /// Fails open: when the file cannot be stat-ed the current time is recorded and the
    /// event proceeds.
    pub fn should_skip(&self, path: &Path) -> bool {
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read modification time");
                SystemTime::now()
            }
        };
        self.should_skip_at(path, modified)
    }

    /// Debounce against an already known modification time.
    pub fn should_skip_at(&self, path: &Path, modified: SystemTime) -> bool {
        if self.seen.get(path).is_some_and(|last| *last == modified) {
            return true;
        }
        self.seen.insert(path.to_path_buf(), modified);
        false
    }

    pub fn last_seen(&self, path: &Path) -> Option<SystemTime> {
        self.seen.get(path).map(|r| *r.value())
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn identical_times_are_accepted_once() {
        let debouncer = Debouncer::new();
        let path = Path::new("conf/app.ini");
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        assert!(!debouncer.should_skip_at(path, t));
        assert!(debouncer.should_skip_at(path, t));
        assert!(debouncer.should_skip_at(path, t));
        assert_eq!(debouncer.last_seen(path), Some(t));
    }

    #[test]
    fn increasing_times_are_all_accepted() {
        let debouncer = Debouncer::new();
        let path = Path::new("conf/app.ini");
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        assert!(!debouncer.should_skip_at(path, t));
        assert!(!debouncer.should_skip_at(path, t + Duration::from_secs(1)));
        assert_eq!(debouncer.last_seen(path), Some(t + Duration::from_secs(1)));
    }

    #[test]
    fn paths_are_tracked_independently() {
        let debouncer = Debouncer::new();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(42);

        assert!(!debouncer.should_skip_at(Path::new("a.ini"), t));
        assert!(!debouncer.should_skip_at(Path::new("b.ini"), t));
        assert_eq!(debouncer.tracked(), 2);
    }

    #[test]
    fn real_file_is_skipped_until_touched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ini");
        std::fs::write(&path, "[app]\n").unwrap();

        let debouncer = Debouncer::new();
        assert!(!debouncer.should_skip(&path));
        assert!(debouncer.should_skip(&path));
    }

    #[test]
    fn missing_file_fails_open() {
        let debouncer = Debouncer::new();
        let path = Path::new("/definitely/not/here.ini");

        assert!(!debouncer.should_skip(path));
        assert!(debouncer.last_seen(path).is_some());
    }
}
