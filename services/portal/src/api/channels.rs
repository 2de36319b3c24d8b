//! Channel catalog handlers.
//!
//! # Purpose
//! Lists channels for approved members and lets stewards create new ones.
//! Channel names are unique; a collision surfaces as 409 with the store's
//! message verbatim.
use crate::api::error::{api_store_error, api_validation_error, ApiError};
use crate::api::types::{ChannelCreateRequest, ChannelListResponse};
use crate::app::AppState;
use crate::auth::AuthContext;
use crate::model::Channel;
use crate::store::CommunityStore;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/v1/channels",
    tag = "community",
    responses(
        (status = 200, description = "Channels ordered by name", body = ChannelListResponse),
        (status = 403, description = "Approval pending", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_channels(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ChannelListResponse>, ApiError> {
    AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;
    let items = state
        .store
        .list_channels()
        .await
        .map_err(|err| api_store_error("failed to list channels", err))?;
    Ok(Json(ChannelListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/channels",
    tag = "community",
    request_body = ChannelCreateRequest,
    responses(
        (status = 201, description = "Channel created", body = Channel),
        (status = 403, description = "Steward role required", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChannelCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context =
        AuthContext::require_steward(state.store.as_ref(), &state.session, &headers).await?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(api_validation_error("channel name must not be empty"));
    }
    let description = body
        .description
        .map(|description| description.trim().to_string())
        .filter(|description| !description.is_empty());

    let mut channel = Channel::new(name, description, context.user_id);
    channel.icon_url = body.icon_url;
    let created = state
        .store
        .create_channel(channel)
        .await
        .map_err(|err| api_store_error("failed to create channel", err))?;
    tracing::info!(channel = %created.name, created_by = %context.user_id, "channel created");
    Ok((StatusCode::CREATED, Json(created)))
}
