//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of derived settings (the INI parser is untyped)
//! - Validate value ranges and URL shapes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: `&Settings → Result<(), Vec<ValidationError>>`
//! - Runs before a generation is published, at startup and on reload
//! - Values with a documented fallback (image sizes, secret key) are corrected during
//!   derivation and never reach this stage as errors

use std::collections::HashSet;

use crate::config::schema::Settings;

/// A single semantic problem in a settings generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{section}] {key}: {message}")]
pub struct ValidationError {
    pub section: &'static str,
    pub key: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(section: &'static str, key: &'static str, message: impl Into<String>) -> Self {
        Self {
            section,
            key,
            message: message.into(),
        }
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&settings.app.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "app",
            "app_url",
            format!("unsupported scheme `{}`", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("app", "app_url", e.to_string())),
    }

    if settings.http_port == 0 {
        errors.push(ValidationError::new(
            "app",
            "http_port",
            "must be between 1 and 65535",
        ));
    }

    let alphabets = &settings.image.link_alphabets;
    let distinct: HashSet<&u8> = alphabets.iter().collect();
    if !alphabets.is_ascii() || distinct.len() < 2 {
        errors.push(ValidationError::new(
            "image",
            "image_link_alphabets",
            "needs at least two distinct ASCII characters",
        ));
    }

    if settings.session.name.trim().is_empty() {
        errors.push(ValidationError::new(
            "session",
            "session_name",
            "must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
