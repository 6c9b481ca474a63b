use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub generation: u64,
}

pub async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        generation: state.store.generation(),
    })
}
