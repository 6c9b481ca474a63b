//! Settings derivation.
//!
//! Turns raw key/value pairs into a typed [`Settings`] generation. Runs at startup and
//! again on every accepted `.ini` reload, so it only reads its inputs and returns a
//! fresh value; publishing is left to the caller.
//!
//! # Time zone asymmetry
//! An unresolvable `time_zone` is an error when there is no previous generation
//! (startup aborts with exit code 2). When a previous generation exists the error is
//! logged and the previous zone is carried forward.

use std::time::Duration;

use chrono_tz::Tz;
use rand::{distributions::Alphanumeric, Rng};

use crate::config::loader::{ConfigError, RawConfig};
use crate::config::schema::{
    AdminSettings, AppSettings, DatabaseSettings, ImageSettings, MailerSettings,
    MetricsSettings, RunMode, SecuritySettings, SessionSettings, Settings,
};

pub const DEFAULT_IMAGE_SIZE_SMALL: u32 = 300;
pub const IMAGE_SIZE_MIDDLE_INCREMENT: u32 = 400;
pub const DEFAULT_LINK_ALPHABETS: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const GENERATED_SECRET_LEN: usize = 70;
pub const DEFAULT_LANGS: &str = "en-US|zh-CN";

const DAY: u64 = 86_400;

/// Derive a settings generation from `raw`.
///
/// `previous` is the generation currently published, if any.
pub fn derive_settings(
    raw: &RawConfig,
    previous: Option<&Settings>,
) -> Result<Settings, ConfigError> {
    let time_zone = resolve_time_zone(raw, previous)?;

    let http_port = raw.int("app", "http_port", 8092);
    let http_port = u16::try_from(http_port).unwrap_or(0);

    Ok(Settings {
        generation: 0,
        run_mode: RunMode::parse(&raw.value("app", "run_mode", "dev")),
        http_port,
        app_version: short_version(env!("CARGO_PKG_VERSION")),
        time_zone,
        app: AppSettings {
            name: raw.value("app", "app_name", "Forum Community"),
            host: raw.value("app", "app_host", "127.0.0.1:8092"),
            url: raw.value("app", "app_url", "http://127.0.0.1:8092/"),
            logo: raw.value("app", "app_logo", "/static/img/logo.gif"),
            avatar_url: raw.value("app", "avatar_url", ""),
            enforce_redirect: raw.boolean("app", "enforce_redirect", false),
            date_format: raw.value("app", "date_format", "%Y-%m-%d"),
            datetime_format: raw.value("app", "datetime_format", "%Y-%m-%d %H:%M:%S"),
            datetime_short_format: raw.value("app", "datetime_short_format", "%Y-%m-%d %H:%M"),
            realtime_render_markdown: raw.boolean("app", "realtime_render_markdown", false),
        },
        security: derive_security(raw, previous),
        image: derive_image(raw),
        mailer: MailerSettings {
            name: raw.value("mailer", "mail_name", "Forum Community"),
            from: raw.value("mailer", "mail_from", "example@example.com"),
            host: raw.value("mailer", "mail_host", "127.0.0.1:25"),
            auth_user: raw.value("mailer", "mail_user", "example@example.com"),
            auth_pass: raw.value("mailer", "mail_pass", "******"),
        },
        session: SessionSettings {
            provider: raw.value("session", "session_provider", "file"),
            save_path: raw.value("session", "session_path", "sessions"),
            name: raw.value("session", "session_name", "forum_sess"),
            cookie_lifetime: secs(raw.int("session", "session_life_time", (DAY * 30) as i64)),
            gc_max_lifetime: Duration::from_secs(DAY * 365),
        },
        database: DatabaseSettings {
            driver_name: raw.value("orm", "driver_name", "mysql"),
            data_source: raw.value(
                "orm",
                "data_source",
                "root:root@/forum?charset=utf8&loc=UTC",
            ),
            max_idle_conn: count(raw.int("orm", "max_idle_conn", 30)),
            max_open_conn: count(raw.int("orm", "max_open_conn", 50)),
            debug_log: raw.boolean("orm", "debug_log", false),
        },
        admin: AdminSettings {
            api_key: raw.value("admin", "api_key", ""),
        },
        metrics: MetricsSettings {
            enabled: raw.boolean("metrics", "enabled", false),
            address: raw.value("metrics", "address", "127.0.0.1:9090"),
        },
        langs: parse_langs(&raw.value("i18n", "langs", DEFAULT_LANGS)),
    })
}

fn resolve_time_zone(raw: &RawConfig, previous: Option<&Settings>) -> Result<Tz, ConfigError> {
    let zone = raw.value("app", "time_zone", "UTC");
    match zone.trim().parse::<Tz>() {
        Ok(tz) => Ok(tz),
        Err(e) => match previous {
            Some(prev) => {
                tracing::error!(
                    time_zone = %zone,
                    error = %e,
                    kept = %prev.time_zone,
                    "Wrong time_zone in reloaded configuration, keeping previous zone"
                );
                Ok(prev.time_zone)
            }
            None => Err(ConfigError::TimeZone {
                zone,
                reason: e.to_string(),
            }),
        },
    }
}

fn derive_security(raw: &RawConfig, previous: Option<&Settings>) -> SecuritySettings {
    let configured = raw.value("app", "secret_key", "");
    let (secret_key, secret_key_generated) = if !configured.is_empty() {
        (configured, false)
    } else if let Some(prev) = previous.filter(|p| p.security.secret_key_generated) {
        (prev.security.secret_key.clone(), true)
    } else {
        let generated = generate_secret(GENERATED_SECRET_LEN);
        tracing::warn!(
            secret_key = %generated,
            "No secret_key set in app.ini, generated one for this process; persist it under [app]"
        );
        (generated, true)
    };

    SecuritySettings {
        secret_key,
        secret_key_generated,
        active_code_lives: minutes(raw.int("app", "active_code_live_minutes", 180)),
        reset_pwd_code_lives: minutes(raw.int("app", "resetpwd_code_live_minutes", 180)),
        login_remember_days: count(raw.int("app", "login_remember_days", 7)),
        login_max_retries: count(raw.int("app", "login_max_retries", 5)),
        login_failed_blocks: count(raw.int("app", "login_failed_blocks", 10)),
    }
}

fn derive_image(raw: &RawConfig) -> ImageSettings {
    let (size_small, size_middle) = image_sizes(
        raw.int("image", "image_size_small", 0),
        raw.int("image", "image_size_middle", 0),
    );

    let mut alphabets = raw.value("image", "image_link_alphabets", "");
    if alphabets.is_empty() {
        alphabets = DEFAULT_LINK_ALPHABETS.to_string();
    }

    ImageSettings {
        size_small,
        size_middle,
        link_alphabets: alphabets.into_bytes(),
        xsend: raw.boolean("image", "image_xsend", false),
        xsend_header: raw.value("image", "image_xsend_header", "X-Accel-Redirect"),
    }
}

/// Apply the thumbnail size fallbacks: small defaults to 300, middle must exceed small.
pub fn image_sizes(small: i64, middle: i64) -> (u32, u32) {
    let small = if small <= 0 {
        DEFAULT_IMAGE_SIZE_SMALL
    } else {
        count(small)
    };
    let middle = if middle <= i64::from(small) {
        small + IMAGE_SIZE_MIDDLE_INCREMENT
    } else {
        count(middle)
    };
    (small, middle)
}

/// Keep the first three dot-separated components of a version string.
pub fn short_version(version: &str) -> String {
    version.split('.').take(3).collect::<Vec<_>>().join(".")
}

pub fn generate_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn parse_langs(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn secs(value: i64) -> Duration {
    Duration::from_secs(value.max(0) as u64)
}

fn minutes(value: i64) -> Duration {
    secs(value.saturating_mul(60))
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
