use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthBody {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthBody)))]
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        timestamp: Utc::now(),
    })
}
