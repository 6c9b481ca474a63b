//! Derived settings definitions.
//!
//! A [`Settings`] value is one immutable generation of the process configuration.
//! It is produced by [`crate::config::derive`] from a [`crate::config::loader::RawConfig`]
//! and published whole through [`crate::config::store::ConfigStore`].

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Deployment mode taken from `[app] run_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    /// Anything other than `pro` runs in development mode.
    pub fn parse(value: &str) -> Self {
        if value.trim() == "pro" {
            RunMode::Production
        } else {
            RunMode::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "dev",
            RunMode::Production => "pro",
        }
    }
}

/// One complete generation of derived settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Publication counter assigned by the store (0 until published).
    pub generation: u64,

    pub run_mode: RunMode,
    pub http_port: u16,

    /// Short application version (`major.minor.patch`).
    pub app_version: String,

    /// Resolved `[app] time_zone`.
    pub time_zone: Tz,

    pub app: AppSettings,
    pub security: SecuritySettings,
    pub image: ImageSettings,
    pub mailer: MailerSettings,
    pub session: SessionSettings,
    pub database: DatabaseSettings,
    pub admin: AdminSettings,
    pub metrics: MetricsSettings,

    /// Languages with message catalogs, in preference order.
    pub langs: Vec<String>,
}

/// Site identity and presentation.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub host: String,
    pub url: String,
    pub logo: String,
    pub avatar_url: String,
    pub enforce_redirect: bool,
    pub date_format: String,
    pub datetime_format: String,
    pub datetime_short_format: String,
    pub realtime_render_markdown: bool,
}

/// Secrets and account policy.
#[derive(Debug, Clone)]
pub struct SecuritySettings {
    pub secret_key: String,
    /// True when `secret_key` was generated because the file had none.
    pub secret_key_generated: bool,
    pub active_code_lives: Duration,
    pub reset_pwd_code_lives: Duration,
    pub login_remember_days: u32,
    pub login_max_retries: u32,
    pub login_failed_blocks: u32,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub size_small: u32,
    pub size_middle: u32,
    pub link_alphabets: Vec<u8>,
    pub xsend: bool,
    pub xsend_header: String,
}

#[derive(Debug, Clone)]
pub struct MailerSettings {
    pub name: String,
    pub from: String,
    pub host: String,
    pub auth_user: String,
    pub auth_pass: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub provider: String,
    pub save_path: String,
    pub name: String,
    pub cookie_lifetime: Duration,
    pub gc_max_lifetime: Duration,
}

/// Connection parameters handed to the ORM layer.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub driver_name: String,
    pub data_source: String,
    pub max_idle_conn: u32,
    pub max_open_conn: u32,
    pub debug_log: bool,
}

/// Admin API. An empty key disables every admin route.
#[derive(Debug, Clone, Default)]
pub struct AdminSettings {
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub address: String,
}

impl Settings {
    pub fn is_pro_mode(&self) -> bool {
        self.run_mode == RunMode::Production
    }

    /// True when `uri` is an absolute URI whose authority equals the configured app host.
    pub fn is_match_host(&self, uri: &str) -> bool {
        if uri.is_empty() {
            return false;
        }
        let Ok(parsed) = url::Url::parse(uri) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        authority == self.app.host
    }

    /// Current wall-clock time in the configured zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.time_zone)
    }

    pub fn format_date(&self, at: &DateTime<Utc>) -> String {
        self.localize(at).format(&self.app.date_format).to_string()
    }

    pub fn format_datetime(&self, at: &DateTime<Utc>) -> String {
        self.localize(at).format(&self.app.datetime_format).to_string()
    }

    pub fn format_datetime_short(&self, at: &DateTime<Utc>) -> String {
        self.localize(at)
            .format(&self.app.datetime_short_format)
            .to_string()
    }

    fn localize(&self, at: &DateTime<Utc>) -> DateTime<Tz> {
        self.time_zone.from_utc_datetime(&at.naive_utc())
    }
}

impl Default for Settings {
    /// Settings derived from an empty configuration.
    fn default() -> Self {
        crate::config::derive::derive_settings(&Default::default(), None)
            .unwrap_or_else(|_| unreachable!("default time zone always resolves"))
    }
}
