//! Feed retrieval handler.
use crate::api::error::{api_store_error, ApiError};
use crate::api::types::FeedResponse;
use crate::app::AppState;
use crate::auth::AuthContext;
use crate::feed::build_feed;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct FeedQuery {
    channel_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/v1/feed",
    tag = "community",
    params(("channel_id" = Option<Uuid>, Query, description = "Restrict to one channel")),
    responses(
        (status = 200, description = "Enriched feed for the caller", body = FeedResponse),
        (status = 403, description = "Approval pending", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_feed(
    Query(query): Query<FeedQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FeedResponse>, ApiError> {
    let context =
        AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;
    let items = build_feed(state.store.as_ref(), context.user_id, query.channel_id)
        .await
        .map_err(|err| api_store_error("failed to build feed", err))?;
    Ok(Json(FeedResponse { items }))
}
