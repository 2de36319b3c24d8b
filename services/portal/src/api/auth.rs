//! Sign-in and sign-up handlers.
//!
//! # Purpose
//! Verifies credentials against the identity store and issues session
//! tokens. Sign-up provisions the identity plus an unapproved profile; the
//! account stays read-only until a steward flips the approval gate.
use crate::api::error::{
    api_conflict, api_internal, api_internal_message, api_store_error, api_unauthorized,
    api_validation_error, ApiError,
};
use crate::api::types::{SessionResponse, SignInRequest, SignUpRequest};
use crate::app::AppState;
use crate::auth::{password, AuthError};
use crate::model::{Profile, Role};
use crate::store::{CommunityStore, IdentityRecord, IdentityStore, StoreError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, approval pending", body = SessionResponse),
        (status = 409, description = "Email already registered", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = body.email.trim().to_string();
    let full_name = body.full_name.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(api_validation_error("a valid email is required"));
    }
    if full_name.is_empty() {
        return Err(api_validation_error("full_name must not be empty"));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(api_validation_error("password must be at least 8 characters"));
    }

    let credential = password::derive(&body.password);
    let user_id = Uuid::new_v4();
    state
        .store
        .create_identity(IdentityRecord {
            user_id,
            email: email.clone(),
            salt: credential.salt,
            digest: credential.digest,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(message) => api_conflict("already_exists", &message),
            other => api_store_error("failed to create identity", other),
        })?;

    // Profile provisioning mirrors the identity-store trigger: approval
    // starts false and no role row is written (absent resolves to member).
    let profile = state
        .store
        .create_profile(Profile::new(user_id, email, full_name))
        .await
        .map_err(|err| api_internal("identity created but profile write failed", &err))?;

    let token = state
        .session
        .mint(user_id)
        .map_err(|_| api_internal_message("failed to mint session token"))?;
    tracing::info!(%user_id, "account created, approval pending");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            role: Role::default(),
            profile: Some(profile),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/auth/signin",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Bad credentials", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let identity = state
        .store
        .find_identity(body.email.trim())
        .await
        .map_err(|err| api_store_error("failed to look up identity", err))?
        .ok_or_else(|| api_unauthorized(&AuthError::InvalidCredentials.to_string()))?;

    if !password::verify(&identity.salt, &identity.digest, &body.password) {
        return Err(api_unauthorized(&AuthError::InvalidCredentials.to_string()));
    }

    let profile = state
        .store
        .get_profile(identity.user_id)
        .await
        .map_err(|err| api_internal("failed to load profile", &err))?;
    let role = state
        .store
        .get_role(identity.user_id)
        .await
        .map_err(|err| api_internal("failed to resolve role", &err))?;
    let token = state
        .session
        .mint(identity.user_id)
        .map_err(|_| api_internal_message("failed to mint session token"))?;

    Ok(Json(SessionResponse {
        token,
        profile,
        role,
    }))
}
