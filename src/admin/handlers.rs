use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::config::ReloadOutcome;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub app_version: String,
    pub generation: u64,
    pub run_mode: &'static str,
    pub uptime_secs: u64,
    pub reload_domains: Vec<&'static str>,
    pub cache_entries: usize,
}

/// Non-secret view of the active settings generation.
#[derive(Serialize)]
pub struct SettingsView {
    pub generation: u64,
    pub app_name: String,
    pub app_url: String,
    pub app_host: String,
    pub run_mode: &'static str,
    pub http_port: u16,
    pub time_zone: String,
    pub langs: Vec<String>,
    pub image_size_small: u32,
    pub image_size_middle: u32,
    pub session_name: String,
    pub session_life_time_secs: u64,
    pub login_max_retries: u32,
    pub login_failed_blocks: u32,
    pub secret_key_generated: bool,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub domain: String,
    pub outcome: &'static str,
    pub generation: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let settings = state.store.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        app_version: settings.app_version.clone(),
        generation: settings.generation,
        run_mode: settings.run_mode.as_str(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        reload_domains: state.coordinator.domains(),
        cache_entries: state.cache.len(),
    })
}

pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsView> {
    let s = state.store.snapshot();
    Json(SettingsView {
        generation: s.generation,
        app_name: s.app.name.clone(),
        app_url: s.app.url.clone(),
        app_host: s.app.host.clone(),
        run_mode: s.run_mode.as_str(),
        http_port: s.http_port,
        time_zone: s.time_zone.name().to_string(),
        langs: s.langs.clone(),
        image_size_small: s.image.size_small,
        image_size_middle: s.image.size_middle,
        session_name: s.session.name.clone(),
        session_life_time_secs: s.session.cookie_lifetime.as_secs(),
        login_max_retries: s.security.login_max_retries,
        login_failed_blocks: s.security.login_failed_blocks,
        secret_key_generated: s.security.secret_key_generated,
    })
}

pub async fn get_locales(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    Json(state.locales.summary())
}

pub async fn post_reload(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<ReloadResponse>, StatusCode> {
    let coordinator = state.coordinator.clone();
    let requested = domain.clone();
    let outcome = tokio::task::spawn_blocking(move || coordinator.force(&requested))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let status = match outcome {
        ReloadOutcome::Failed(_) => "failed",
        _ => "reloaded",
    };
    Ok(Json(ReloadResponse {
        domain,
        outcome: status,
        generation: state.store.generation(),
    }))
}
