//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use forum_server::assets::{
    AssetCompressor, AssetError, AssetSettings, CompressOptions, CompressReport,
};
use forum_server::config::ConfigPaths;
use forum_server::lifecycle::{bootstrap, App, StartupError};
use tempfile::TempDir;

pub const ADMIN_KEY: &str = "test-admin-key";

pub const BASE_INI: &str = "\
[app]
app_name = Test Forum
app_url = http://forum.test/
time_zone = Europe/Paris
secret_key = fixed-secret

[i18n]
langs = en-US|zh-CN

[admin]
api_key = test-admin-key
";

/// A temporary configuration directory laid out like a real `conf/`.
pub struct ConfDir {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl ConfDir {
    /// `app.ini` plus shipped catalogs for both default languages.
    pub fn new(app_ini: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("global")).unwrap();
        fs::write(root.join("app.ini"), app_ini).unwrap();
        write_locale(&root, "en-US", "hello = Hello");
        write_locale(&root, "zh-CN", "hello = 你好");
        Self { _tmp: tmp, root }
    }

    pub fn paths(&self) -> ConfigPaths {
        ConfigPaths::new(&self.root)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write(&self, name: &str, contents: &str) {
        fs::write(self.root.join(name), contents).unwrap();
    }

    pub fn bootstrap(&self) -> Result<App, StartupError> {
        bootstrap(self.paths(), Arc::new(NoopCompressor))
    }
}

pub fn write_locale(root: &Path, lang: &str, body: &str) {
    let path = root.join("global").join(format!("locale_{lang}.ini"));
    fs::write(path, format!("[common]\n{body}\n")).unwrap();
}

pub const COMPRESS_JSON: &str = r#"{
  "js": {
    "src_path": "static",
    "dist_path": "static",
    "src_url": "/static",
    "dist_url": "/static",
    "groups": {
      "app": { "dist_file": "js/app.min.js", "src_files": ["js/a.js", "js/b.js"] }
    }
  }
}"#;

/// Compressor that never touches the filesystem.
pub struct NoopCompressor;

impl AssetCompressor for NoopCompressor {
    fn compress(
        &self,
        _settings: &AssetSettings,
        _options: CompressOptions,
    ) -> Result<CompressReport, AssetError> {
        Ok(CompressReport::default())
    }
}

/// Rewrite a file and push its mtime forward so the debouncer sees a new event.
pub fn touch_with(path: &Path, contents: &str, offset_secs: u64) {
    fs::write(path, contents).unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    let mtime = std::time::SystemTime::now() + std::time::Duration::from_secs(offset_secs);
    file.set_modified(mtime).unwrap();
}
