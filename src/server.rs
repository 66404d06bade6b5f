//! Read-only query API and authenticated admin refresh
//!
//! Thin layer over the cache and the updater: region lookups never block
//! on network work, and a failed refresh never clears what is already
//! cached. A region with no successful extraction yet is a 404; a region
//! whose latest attempt failed keeps serving its last record.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::cache::VersionRecord;
use crate::config::Settings;
use crate::error::{DecodeError, UpdateError};
use crate::region::Region;
use crate::updater::Updater;

pub struct AppState {
    pub updater: Arc<Updater>,
    pub settings: Settings,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(all_regions))
        .route("/admin/refresh", post(admin_refresh))
        .route("/{region}", get(one_region))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn not_found(detail: String) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Every enabled region, populated or not.
async fn all_regions(State(state): State<Arc<AppState>>) -> Json<HashMap<String, Option<VersionRecord>>> {
    let snapshot = state.updater.cache().snapshot().await;
    let body = state
        .settings
        .enabled_regions
        .iter()
        .map(|region| (region.as_str().to_string(), snapshot.get(region).cloned()))
        .collect();
    Json(body)
}

async fn one_region(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> Response {
    let Ok(region) = Region::from_str(&region) else {
        return not_found(format!("Unknown region: {region}"));
    };
    if !state.settings.enabled_regions.contains(&region) {
        return not_found(format!("Region {region} is not enabled"));
    }
    match state.updater.cache().get(region).await {
        Some(record) => Json(record).into_response(),
        None => not_found(format!("No data for {region} yet")),
    }
}

#[derive(Deserialize)]
struct RefreshQuery {
    region: Option<String>,
}

/// Forced refresh of one region or the whole enabled set, guarded by the
/// configured API key.
async fn admin_refresh(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RefreshQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = check_admin_key(&state.settings, &headers) {
        return denied;
    }

    match query.region {
        Some(raw) => {
            let Ok(region) = Region::from_str(&raw) else {
                return not_found(format!("Unknown region: {raw}"));
            };
            if !state.settings.enabled_regions.contains(&region) {
                return not_found(format!("Region {region} is not enabled"));
            }
            match state.updater.update_region(region, true).await {
                Ok(_) => Json(json!({ "region": region, "status": "ok" })).into_response(),
                Err(UpdateError::Decode(DecodeError::RecordNotFound)) => {
                    Json(json!({ "region": region, "status": "failed" })).into_response()
                }
                Err(e) => {
                    error!("[{}] forced refresh failed: {}", region, e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "detail": e.to_string() })),
                    )
                        .into_response()
                }
            }
        }
        None => {
            let results = state.updater.update_all(true).await;
            let status: HashMap<String, _> = results
                .into_iter()
                .map(|(region, outcome)| (region.as_str().to_string(), outcome))
                .collect();
            Json(json!({ "status": status })).into_response()
        }
    }
}

fn check_admin_key(settings: &Settings, headers: &HeaderMap) -> Result<(), Response> {
    if settings.admin_api_key.is_empty() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Admin API key not configured" })),
        )
            .into_response());
    }
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if provided != Some(settings.admin_api_key.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid API key" })),
        )
            .into_response());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::VersionCache;
    use crate::fetch::PackageFetcher;
    use crate::region::RegionSpec;
    use crate::resolver::StorefrontResolver;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(enabled: Vec<Region>, admin_key: &str) -> Arc<AppState> {
        let client = reqwest::Client::new();
        let settings = Settings {
            enabled_regions: enabled.clone(),
            admin_api_key: admin_key.to_string(),
            ..Default::default()
        };
        let updater = Updater::with_parts(
            Arc::new(VersionCache::new()),
            StorefrontResolver::new(client.clone()),
            PackageFetcher::new(client),
            enabled.into_iter().map(RegionSpec::of).collect(),
            settings.fallback_engine_version.clone(),
        );
        Arc::new(AppState { updater: Arc::new(updater), settings })
    }

    fn record() -> VersionRecord {
        VersionRecord {
            app_version: "4.2.1".to_string(),
            app_hash: "deadbeef".to_string(),
            data_version: "1.0.0".to_string(),
            multi_play_version: "4.2.0".to_string(),
            asset_hash: "cafef00d".to_string(),
            updated_at: Utc::now(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(test_state(vec![Region::JP], ""));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn root_lists_enabled_regions_with_nulls() {
        let state = test_state(vec![Region::JP, Region::EN], "");
        state.updater.cache().insert(Region::JP, record()).await;

        let app = router(state);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["JP"]["appVersion"], "4.2.1");
        assert!(body["EN"].is_null());
    }

    #[tokio::test]
    async fn region_endpoint_serves_cached_record() {
        let state = test_state(vec![Region::JP], "");
        state.updater.cache().insert(Region::JP, record()).await;

        let app = router(state);
        let response = app
            .oneshot(Request::get("/jp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["appHash"], "deadbeef");
        assert_eq!(body["multiPlayVersion"], "4.2.0");
    }

    #[tokio::test]
    async fn unknown_disabled_and_empty_regions_are_404() {
        let state = test_state(vec![Region::JP], "");
        let app = router(state);

        for path in ["/XX", "/EN", "/JP"] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }

    #[tokio::test]
    async fn admin_refresh_requires_configured_key() {
        let app = router(test_state(vec![Region::JP], ""));
        let response = app
            .oneshot(Request::post("/admin/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn admin_refresh_rejects_wrong_key() {
        let app = router(test_state(vec![Region::JP], "secret"));
        let response = app
            .oneshot(
                Request::post("/admin/refresh")
                    .header("x-api-key", "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_refresh_rejects_disabled_region() {
        let app = router(test_state(vec![Region::JP], "secret"));
        let response = app
            .oneshot(
                Request::post("/admin/refresh?region=EN")
                    .header("x-api-key", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
