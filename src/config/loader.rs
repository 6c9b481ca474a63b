//! Configuration loading from disk.
//!
//! The primary source is layered: `conf/global/app.ini` (optional, shipped defaults)
//! overlaid by `conf/app.ini` (site overrides). Both are parsed with the `config`
//! crate and exposed through [`RawConfig`], whose accessors never fail: a missing or
//! unparsable value yields the caller's default.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};

use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load configuration: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("wrong time_zone `{zone}`: {reason}")]
    TimeZone { zone: String, reason: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Well-known files inside the configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    conf_dir: PathBuf,
}

impl ConfigPaths {
    pub fn new(conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            conf_dir: conf_dir.into(),
        }
    }

    /// Directory watched for hot reload.
    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }

    pub fn global_dir(&self) -> PathBuf {
        self.conf_dir.join("global")
    }

    pub fn global_app_ini(&self) -> PathBuf {
        self.global_dir().join("app.ini")
    }

    pub fn site_app_ini(&self) -> PathBuf {
        self.conf_dir.join("app.ini")
    }

    pub fn compress_json(&self) -> PathBuf {
        self.conf_dir.join("compress.json")
    }

    /// `(global, site)` catalog files for a language tag.
    pub fn locale_files(&self, lang: &str) -> (PathBuf, PathBuf) {
        let name = format!("locale_{lang}.ini");
        (self.global_dir().join(&name), self.conf_dir.join(name))
    }

    pub fn ini_source(&self) -> IniSource {
        IniSource::new(self.global_app_ini(), self.site_app_ini())
    }
}

/// The layered primary configuration source.
#[derive(Debug, Clone)]
pub struct IniSource {
    global: PathBuf,
    site: PathBuf,
}

impl IniSource {
    pub fn new(global: PathBuf, site: PathBuf) -> Self {
        Self { global, site }
    }

    /// Create an empty site file if none exists so operators have a place to override.
    pub fn ensure_site_file(&self) -> Result<(), ConfigError> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(&self.site).map(drop).map_err(|source| ConfigError::Io {
            path: self.site.clone(),
            source,
        })
    }

    /// Parse both layers. The global layer is optional, the site layer is not.
    pub fn load(&self) -> Result<RawConfig, ConfigError> {
        let inner = Config::builder()
            .add_source(
                File::from(self.global.as_path())
                    .format(FileFormat::Ini)
                    .required(false),
            )
            .add_source(
                File::from(self.site.as_path())
                    .format(FileFormat::Ini)
                    .required(true),
            )
            .build()?;

        tracing::debug!(
            global = %self.global.display(),
            site = %self.site.display(),
            "Primary configuration parsed"
        );
        Ok(RawConfig { inner })
    }
}

/// Raw sectioned key/value pairs with defaulting accessors.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    inner: Config,
}

impl RawConfig {
    /// Parse INI text directly, mostly useful in tests.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let inner = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()?;
        Ok(Self { inner })
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.inner.get_string(&path(section, key)).is_ok()
    }

    pub fn value(&self, section: &str, key: &str, default: &str) -> String {
        self.inner
            .get_string(&path(section, key))
            .unwrap_or_else(|_| default.to_string())
    }

    pub fn int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.inner.get_int(&path(section, key)).unwrap_or(default)
    }

    pub fn boolean(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(&path(section, key)).unwrap_or(default)
    }
}

fn path(section: &str, key: &str) -> String {
    format!("{section}.{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_fall_back_to_defaults() {
        let raw = RawConfig::from_ini_str(
            "[app]\napp_name = Rustaceans\nhttp_port = nope\nenforce_redirect = true\n",
        )
        .unwrap();

        assert_eq!(raw.value("app", "app_name", "x"), "Rustaceans");
        assert_eq!(raw.value("app", "missing", "fallback"), "fallback");
        assert_eq!(raw.int("app", "http_port", 8092), 8092);
        assert!(raw.boolean("app", "enforce_redirect", false));
        assert!(!raw.boolean("image", "image_xsend", false));
        assert!(raw.contains("app", "app_name"));
        assert!(!raw.contains("mailer", "mail_host"));
    }

    #[test]
    fn site_layer_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());
        std::fs::create_dir_all(paths.global_dir()).unwrap();
        std::fs::write(
            paths.global_app_ini(),
            "[app]\napp_name = Global\nlogin_max_retries = 9\n",
        )
        .unwrap();
        std::fs::write(paths.site_app_ini(), "[app]\napp_name = Site\n").unwrap();

        let raw = paths.ini_source().load().unwrap();
        assert_eq!(raw.value("app", "app_name", ""), "Site");
        assert_eq!(raw.int("app", "login_max_retries", 5), 9);
    }

    #[test]
    fn ensure_site_file_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());
        let source = paths.ini_source();

        assert!(source.load().is_err());
        source.ensure_site_file().unwrap();
        assert!(paths.site_app_ini().exists());
        assert!(source.load().is_ok());
    }
}
