use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};

use crate::api::{HealthResponse, success};
use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        AppState { db }
    }
}

pub async fn healthcheck(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => success(HealthResponse { status: "ok" }),
        Err(e) => {
            tracing::warn!(error = %e, "healthcheck failed");
            let mut response = success(HealthResponse { status: "degraded" });
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
            response
        }
    }
}
