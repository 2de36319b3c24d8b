//! Self-service profile handlers.
//!
//! Signed-in users may read and update their own profile's self-service
//! fields. Approval and role are steward territory and not reachable here.
use crate::api::error::{api_not_found, api_store_error, ApiError};
use crate::app::AppState;
use crate::auth::AuthContext;
use crate::model::{Profile, ProfileUpdate};
use crate::store::CommunityStore;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

#[utoipa::path(
    get,
    path = "/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "The caller's profile", body = Profile),
        (status = 404, description = "No profile for this identity", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_own_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>, ApiError> {
    let context =
        AuthContext::resolve(state.store.as_ref(), &state.session, &headers).await?;
    let profile = state
        .store
        .get_profile(context.user_id)
        .await
        .map_err(|err| api_store_error("failed to load profile", err))?
        .ok_or_else(|| api_not_found("no profile for this identity"))?;
    Ok(Json(profile))
}

#[utoipa::path(
    patch,
    path = "/v1/profile",
    tag = "profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 404, description = "No profile for this identity", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_own_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    let context =
        AuthContext::resolve(state.store.as_ref(), &state.session, &headers).await?;
    let profile = state
        .store
        .update_profile(context.user_id, body)
        .await
        .map_err(|err| api_store_error("failed to update profile", err))?;
    Ok(Json(profile))
}
