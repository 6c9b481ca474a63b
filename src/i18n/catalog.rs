//! Locale message catalogs.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use config::{Config, File, FileFormat, Source, Value};

use crate::config::loader::ConfigPaths;

#[derive(Debug, thiserror::Error)]
pub enum LocaleError {
    #[error("no message file for {lang} at {}", path.display())]
    Missing { lang: String, path: PathBuf },

    #[error("failed to load messages for {lang}: {source}")]
    Parse {
        lang: String,
        #[source]
        source: config::ConfigError,
    },
}

/// Flattened `section.key → message` pairs for one language.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    /// Load the shipped catalog and overlay the optional site catalog.
    pub fn load(paths: &ConfigPaths, lang: &str) -> Result<Self, LocaleError> {
        let (global, site) = paths.locale_files(lang);
        if !global.is_file() {
            return Err(LocaleError::Missing {
                lang: lang.to_string(),
                path: global,
            });
        }

        let parse_err = |source| LocaleError::Parse {
            lang: lang.to_string(),
            source,
        };
        let merged = Config::builder()
            .add_source(File::from(global.as_path()).format(FileFormat::Ini))
            .add_source(
                File::from(site.as_path())
                    .format(FileFormat::Ini)
                    .required(false),
            )
            .build()
            .and_then(|c| c.collect())
            .map_err(parse_err)?;

        let mut messages = HashMap::new();
        for (key, value) in merged {
            flatten(&key, value, &mut messages);
        }
        Ok(Self { messages })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn flatten(prefix: &str, value: Value, out: &mut HashMap<String, String>) {
    match value.clone().into_table() {
        Ok(table) => {
            for (key, nested) in table {
                flatten(&format!("{prefix}.{key}"), nested, out);
            }
        }
        Err(_) => {
            if let Ok(text) = value.into_string() {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

/// Every loaded catalog, keyed by language tag, plus the preference order.
#[derive(Debug, Default)]
pub struct Catalogs {
    langs: Vec<String>,
    by_lang: BTreeMap<String, Catalog>,
}

/// Hot-swappable set of catalogs.
#[derive(Clone)]
pub struct LocaleStore {
    paths: ConfigPaths,
    current: Arc<ArcSwap<Catalogs>>,
}

impl LocaleStore {
    /// Load a catalog for each language; any missing or unparsable file fails the load.
    pub fn load(paths: ConfigPaths, langs: &[String]) -> Result<Self, LocaleError> {
        let catalogs = load_all(&paths, langs)?;
        Ok(Self {
            paths,
            current: Arc::new(ArcSwap::from_pointee(catalogs)),
        })
    }

    /// Re-read every catalog. On failure the previous set stays active.
    pub fn reload(&self, langs: &[String]) -> Result<(), LocaleError> {
        let catalogs = load_all(&self.paths, langs)?;
        self.current.store(Arc::new(catalogs));
        tracing::info!(langs = ?langs, "Locale catalogs reloaded");
        Ok(())
    }

    pub fn langs(&self) -> Vec<String> {
        self.current.load().langs.clone()
    }

    /// Translate `key` for `lang`, falling back to the first language, then the key.
    pub fn tr(&self, lang: &str, key: &str) -> String {
        let catalogs = self.current.load();
        catalogs
            .by_lang
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| {
                catalogs
                    .langs
                    .first()
                    .and_then(|first| catalogs.by_lang.get(first))
                    .and_then(|c| c.get(key))
            })
            .unwrap_or(key)
            .to_string()
    }

    /// Message counts per language.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.current
            .load()
            .by_lang
            .iter()
            .map(|(lang, c)| (lang.clone(), c.len()))
            .collect()
    }
}

fn load_all(paths: &ConfigPaths, langs: &[String]) -> Result<Catalogs, LocaleError> {
    let mut by_lang = BTreeMap::new();
    for lang in langs {
        let catalog = Catalog::load(paths, lang)?;
        tracing::debug!(lang = %lang, messages = catalog.len(), "Locale catalog loaded");
        by_lang.insert(lang.clone(), catalog);
    }
    Ok(Catalogs {
        langs: langs.to_vec(),
        by_lang,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs() -> Vec<String> {
        vec!["en-US".into(), "zh-CN".into()]
    }

    fn fixture() -> (tempfile::TempDir, ConfigPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(dir.path());
        std::fs::create_dir_all(paths.global_dir()).unwrap();
        let (en, _) = paths.locale_files("en-US");
        let (zh, _) = paths.locale_files("zh-CN");
        std::fs::write(en, "home = Home\n[post]\nnew = New post\nreply = Reply\n").unwrap();
        std::fs::write(zh, "home = 首页\n[post]\nnew = 发帖\n").unwrap();
        (dir, paths)
    }

    #[test]
    fn translates_with_fallbacks() {
        let (_dir, paths) = fixture();
        let store = LocaleStore::load(paths, &langs()).unwrap();

        assert_eq!(store.tr("zh-CN", "home"), "首页");
        assert_eq!(store.tr("zh-CN", "post.new"), "发帖");
        assert_eq!(store.tr("zh-CN", "post.reply"), "Reply");
        assert_eq!(store.tr("fr-FR", "post.new"), "New post");
        assert_eq!(store.tr("en-US", "post.unknown"), "post.unknown");
    }

    #[test]
    fn site_file_overrides_messages() {
        let (_dir, paths) = fixture();
        let (_, site) = paths.locale_files("en-US");
        std::fs::write(site, "home = Front page\n").unwrap();

        let store = LocaleStore::load(paths, &langs()).unwrap();
        assert_eq!(store.tr("en-US", "home"), "Front page");
        assert_eq!(store.tr("en-US", "post.new"), "New post");
    }

    #[test]
    fn missing_catalog_is_an_error_and_reload_keeps_previous() {
        let (_dir, paths) = fixture();
        let store = LocaleStore::load(paths.clone(), &langs()).unwrap();

        let err = store
            .reload(&["en-US".to_string(), "de-DE".to_string()])
            .unwrap_err();
        assert!(matches!(err, LocaleError::Missing { ref lang, .. } if lang == "de-DE"));
        assert_eq!(store.langs(), langs());

        let (en, _) = paths.locale_files("en-US");
        std::fs::write(en, "home = Start\n").unwrap();
        store.reload(&langs()).unwrap();
        assert_eq!(store.tr("en-US", "home"), "Start");
    }
}
