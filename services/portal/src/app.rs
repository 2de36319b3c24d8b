//! Portal HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and
//! testable; integration tests drive the router directly.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::api::types::FeatureFlags;
use crate::auth::SessionKeys;
use crate::store::PortalStore;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub features: FeatureFlags,
    pub store: Arc<dyn PortalStore + Send + Sync>,
    pub session: Arc<SessionKeys>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route("/v1/auth/signup", axum::routing::post(api::auth::sign_up))
        .route("/v1/auth/signin", axum::routing::post(api::auth::sign_in))
        .route(
            "/v1/profile",
            axum::routing::get(api::profile::get_own_profile)
                .patch(api::profile::update_own_profile),
        )
        .route(
            "/v1/channels",
            axum::routing::get(api::channels::list_channels)
                .post(api::channels::create_channel),
        )
        .route("/v1/feed", axum::routing::get(api::feed::get_feed))
        .route("/v1/posts", axum::routing::post(api::posts::create_post))
        .route(
            "/v1/posts/snapshot",
            axum::routing::get(api::posts::post_snapshot),
        )
        .route(
            "/v1/posts/changes",
            axum::routing::get(api::posts::post_changes),
        )
        .route(
            "/v1/posts/:post_id/votes",
            axum::routing::post(api::posts::cast_vote),
        )
        .route(
            "/v1/posts/:post_id/comments",
            axum::routing::post(api::posts::create_comment),
        )
        .route(
            "/v1/posts/:post_id/pin",
            axum::routing::patch(api::posts::set_pin),
        )
        .route(
            "/v1/admin/roster",
            axum::routing::get(api::admin::list_roster).post(api::admin::create_roster_entry),
        )
        .route(
            "/v1/admin/roster/:user_id",
            axum::routing::patch(api::admin::update_roster_entry),
        )
        .route(
            "/v1/admin/roster/:user_id/approval",
            axum::routing::patch(api::admin::set_approval),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
