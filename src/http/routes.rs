//! HTTP route definitions

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::store::{Profile, StoreError};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.client_origin.as_deref());

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/profile", get(profile_handler))
        .route("/profile/reset", post(profile_reset_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS configuration - support multiple origins (comma-separated), any
/// origin when unset
fn cors_layer(client_origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match client_origin {
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
                .collect();
            cors.allow_origin(allowed_origins)
        }
        None => cors.allow_origin(Any),
    }
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    rooms: usize,
    players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        rooms: state.rooms.active_rooms(),
        players: state.rooms.total_players(),
    })
}

// ============================================================================
// Profile endpoints
// ============================================================================

#[derive(Deserialize)]
struct ProfileQuery {
    id: Option<String>,
}

#[derive(Serialize)]
struct ProfileResponse {
    profile: Option<Profile>,
}

async fn profile_handler(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => state.profiles.get(id)?,
        None => None,
    };
    Ok(Json(ProfileResponse { profile }))
}

#[derive(Deserialize)]
struct ResetRequest {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Serialize)]
struct ResetResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<Profile>,
}

async fn profile_reset_handler(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<(StatusCode, Json<ResetResponse>), AppError> {
    let reset = match req.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => state.profiles.reset(id)?,
        None => None,
    };

    match reset {
        Some(profile) => {
            info!(profile_id = %profile.id, "Profile reset over HTTP");
            Ok((
                StatusCode::OK,
                Json(ResetResponse {
                    ok: true,
                    profile: Some(profile),
                }),
            ))
        }
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ResetResponse {
                ok: false,
                profile: None,
            }),
        )),
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = %self, "Request failed");

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::game::MapCatalog;
    use crate::store::{MemoryProfileStore, ProfileStore};

    fn app() -> (Router, Arc<MemoryProfileStore>) {
        let profiles = Arc::new(MemoryProfileStore::new());
        let state = AppState::new(Config::default(), MapCatalog::builtin(), profiles.clone());
        (build_router(state), profiles)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = app();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rooms"], 0);
        assert_eq!(body["players"], 0);
        assert!(body["uptimeSecs"].is_u64());
    }

    #[tokio::test]
    async fn profile_lookup_returns_null_for_unknown_ids() {
        let (router, profiles) = app();
        profiles.upsert(Some("p1"), Some("Neo"), None).unwrap();

        let response = router
            .clone()
            .oneshot(Request::get("/profile?id=p1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["profile"]["nickname"], "Neo");

        let response = router
            .oneshot(Request::get("/profile?id=nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(json_body(response).await["profile"].is_null());
    }

    #[tokio::test]
    async fn reset_zeroes_counters_or_404s() {
        let (router, profiles) = app();
        profiles.upsert(Some("p1"), Some("Neo"), None).unwrap();
        profiles.increment_kills("p1").unwrap();

        let reset = |id: &str| {
            Request::post("/profile/reset")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(r#"{{"id":"{id}"}}"#)))
                .unwrap()
        };

        let response = router.clone().oneshot(reset("p1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["profile"]["totalKills"], 0);

        let response = router.oneshot(reset("ghost")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["ok"], false);
    }
}
