//! Asset bundling.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::assets::settings::{AssetError, AssetKind, AssetSettings};

#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    /// Rebuild bundles even when they are newer than every source.
    pub force: bool,
    /// Log each bundle written.
    pub verbose: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompressReport {
    pub written: usize,
    pub unchanged: usize,
}

/// Produces bundles for the groups declared in `compress.json`.
pub trait AssetCompressor: Send + Sync {
    fn compress(
        &self,
        settings: &AssetSettings,
        options: CompressOptions,
    ) -> Result<CompressReport, AssetError>;
}

/// Concatenates each group's sources into its dist file, relative to a root directory.
#[derive(Debug, Clone)]
pub struct BundleCompressor {
    root: PathBuf,
}

impl BundleCompressor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bundle_kind(
        &self,
        kind: &AssetKind,
        options: CompressOptions,
        report: &mut CompressReport,
    ) -> Result<(), AssetError> {
        let src_dir = self.root.join(&kind.src_path);
        let dist_dir = self.root.join(&kind.dist_path);

        for (name, group) in &kind.groups {
            let sources: Vec<PathBuf> = group.src_files.iter().map(|f| src_dir.join(f)).collect();
            let dist = dist_dir.join(&group.dist_file);

            if !options.force && is_fresh(&dist, &sources) {
                report.unchanged += 1;
                continue;
            }

            let mut bundle = String::new();
            for src in &sources {
                let text = fs::read_to_string(src).map_err(|source| io_err(src, source))?;
                bundle.push_str(text.trim_end());
                bundle.push('\n');
            }
            if let Some(parent) = dist.parent() {
                fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
            }
            fs::write(&dist, bundle).map_err(|source| io_err(&dist, source))?;
            report.written += 1;

            if options.verbose {
                tracing::info!(
                    group = %name,
                    dist = %dist.display(),
                    files = sources.len(),
                    "Asset bundle written"
                );
            }
        }
        Ok(())
    }
}

impl AssetCompressor for BundleCompressor {
    fn compress(
        &self,
        settings: &AssetSettings,
        options: CompressOptions,
    ) -> Result<CompressReport, AssetError> {
        let mut report = CompressReport::default();
        self.bundle_kind(&settings.config.js, options, &mut report)?;
        self.bundle_kind(&settings.config.css, options, &mut report)?;
        Ok(report)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> AssetError {
    AssetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A bundle is fresh when it exists and no source is newer.
fn is_fresh(dist: &Path, sources: &[PathBuf]) -> bool {
    let Some(built) = modified(dist) else {
        return false;
    };
    sources
        .iter()
        .all(|s| modified(s).is_some_and(|m| m <= built))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::settings::{AssetGroup, CompressConfig};

    fn settings() -> AssetSettings {
        let mut js = AssetKind {
            src_path: "static".into(),
            dist_path: "dist".into(),
            ..Default::default()
        };
        js.groups.insert(
            "lib".into(),
            AssetGroup {
                dist_file: "lib.js".into(),
                src_files: vec!["a.js".into(), "b.js".into()],
            },
        );
        AssetSettings {
            config: CompressConfig {
                js,
                ..Default::default()
            },
            pro_mode: true,
            app_url: String::new(),
        }
    }

    #[test]
    fn bundles_sources_in_order_and_skips_fresh_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/a.js"), "var a = 1;\n\n").unwrap();
        std::fs::write(dir.path().join("static/b.js"), "var b = 2;").unwrap();

        let compressor = BundleCompressor::new(dir.path());
        let forced = CompressOptions {
            force: true,
            verbose: false,
        };
        let report = compressor.compress(&settings(), forced).unwrap();
        assert_eq!(
            report,
            CompressReport {
                written: 1,
                unchanged: 0,
            }
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("dist/lib.js")).unwrap(),
            "var a = 1;\nvar b = 2;\n"
        );

        let lazy = CompressOptions {
            force: false,
            verbose: false,
        };
        let report = compressor.compress(&settings(), lazy).unwrap();
        assert_eq!(
            report,
            CompressReport {
                written: 0,
                unchanged: 1,
            }
        );
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let compressor = BundleCompressor::new(dir.path());
        let options = CompressOptions {
            force: true,
            verbose: false,
        };
        assert!(matches!(
            compressor.compress(&settings(), options),
            Err(AssetError::Io { .. })
        ));
    }
}
