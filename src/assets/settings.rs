//! `compress.json` schema and the hot-swappable asset settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid compression config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Root of `compress.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressConfig {
    pub js: AssetKind,
    pub css: AssetKind,
}

/// Source and output locations for one asset type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetKind {
    /// Filesystem directory holding the sources.
    pub src_path: String,
    /// Filesystem directory receiving bundles.
    pub dist_path: String,
    /// URL prefix for individual sources.
    pub src_url: String,
    /// URL prefix for bundles.
    pub dist_url: String,
    pub groups: BTreeMap<String, AssetGroup>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetGroup {
    pub dist_file: String,
    pub src_files: Vec<String>,
}

/// Loaded compression config plus the context it was loaded under.
#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub config: CompressConfig,
    pub pro_mode: bool,
    pub app_url: String,
}

impl AssetSettings {
    pub fn load_json(path: &Path, pro_mode: bool, app_url: &str) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| AssetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            config,
            pro_mode,
            app_url: app_url.to_string(),
        })
    }

    /// `<script>` tags for a JS group: the bundle in production, each source otherwise.
    pub fn js_tags(&self, group: &str) -> String {
        self.urls(&self.config.js, group)
            .into_iter()
            .map(|url| format!(r#"<script type="text/javascript" src="{url}"></script>"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `<link>` tags for a CSS group.
    pub fn css_tags(&self, group: &str) -> String {
        self.urls(&self.config.css, group)
            .into_iter()
            .map(|url| format!(r#"<link rel="stylesheet" href="{url}">"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn urls(&self, kind: &AssetKind, group: &str) -> Vec<String> {
        let Some(g) = kind.groups.get(group) else {
            tracing::warn!(group, "Unknown asset group");
            return Vec::new();
        };
        if self.pro_mode {
            vec![self.url(&kind.dist_url, &g.dist_file)]
        } else {
            g.src_files
                .iter()
                .map(|f| self.url(&kind.src_url, f))
                .collect()
        }
    }

    fn url(&self, prefix: &str, file: &str) -> String {
        let base = self.app_url.trim_end_matches('/');
        let prefix = prefix.trim_matches('/');
        let file = file.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{base}/{file}")
        } else {
            format!("{base}/{prefix}/{file}")
        }
    }
}

/// Current asset settings; empty until the first successful load.
#[derive(Clone, Default)]
pub struct AssetStore {
    current: Arc<ArcSwapOption<AssetSettings>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, settings: AssetSettings) {
        self.current.store(Some(Arc::new(settings)));
    }

    pub fn current(&self) -> Option<Arc<AssetSettings>> {
        self.current.load_full()
    }

    pub fn js_tags(&self, group: &str) -> String {
        self.current().map(|s| s.js_tags(group)).unwrap_or_default()
    }

    pub fn css_tags(&self, group: &str) -> String {
        self.current().map(|s| s.css_tags(group)).unwrap_or_default()
    }
}
