//! Admin roster handlers, steward-only.
//!
//! # Purpose
//! Account management for the hostel roster: listing profiles with roles,
//! creating pre-approved accounts, editing profile fields and roles, and
//! toggling the community approval gate.
//!
//! # Consistency
//! Account creation is two-phase: the identity insert and the profile/role
//! writes are separate store calls with no transaction spanning them. A
//! phase-two failure leaves an identity without a profile; it is surfaced
//! with the `profile_incomplete` code (naming the created identity) and is
//! reconciled manually rather than compensated automatically. Profile and
//! role updates likewise fail independently under distinct error codes.
use crate::api::error::{
    api_conflict, api_internal_message, api_not_found, api_store_error, api_validation_error,
    ApiError,
};
use crate::api::types::{
    ApprovalRequest, ErrorResponse, RosterCreateRequest, RosterResponse, RosterUpdateRequest,
};
use crate::app::AppState;
use crate::auth::password;
use crate::auth::AuthContext;
use crate::model::{Profile, ProfileUpdate, Role, RosterEntry};
use crate::store::{CommunityStore, IdentityRecord, IdentityStore, StoreError};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/v1/admin/roster",
    tag = "admin",
    responses(
        (status = 200, description = "Profiles with roles, ordered by name", body = RosterResponse),
        (status = 403, description = "Steward role required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_roster(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RosterResponse>, ApiError> {
    AuthContext::require_steward(state.store.as_ref(), &state.session, &headers).await?;
    let items = state
        .store
        .list_roster()
        .await
        .map_err(|err| api_store_error("failed to list roster", err))?;
    Ok(Json(RosterResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/admin/roster",
    tag = "admin",
    request_body = RosterCreateRequest,
    responses(
        (status = 201, description = "Account created and pre-approved", body = RosterEntry),
        (status = 409, description = "Email already registered", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Identity created but profile incomplete", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_roster_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RosterCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    AuthContext::require_steward(state.store.as_ref(), &state.session, &headers).await?;

    let email = body.email.trim().to_string();
    let full_name = body.full_name.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(api_validation_error("a valid email is required"));
    }
    if full_name.is_empty() {
        return Err(api_validation_error("full_name must not be empty"));
    }
    if body.password.is_empty() {
        return Err(api_validation_error("password must not be empty"));
    }

    // Phase one: the identity insert owns the duplicate-email check. A
    // conflict here means nothing else was written.
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

    // Phase two: profile and role. Failures from here on leave the orphaned
    // identity in place for manual reconciliation.
    let mut profile = Profile::new(user_id, email, full_name);
    profile.room_number = body.room_number;
    profile.phone = body.phone;
    profile.batch = body.batch;
    profile.branch = body.branch;
    profile.emergency_contact = body.emergency_contact;
    profile.emergency_phone = body.emergency_phone;
    // Admin-created accounts skip the approval queue.
    profile.is_approved = true;

    let profile = state.store.create_profile(profile).await.map_err(|err| {
        tracing::error!(%user_id, error = ?err, "identity created but profile write failed");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                code: "profile_incomplete".to_string(),
                message: format!("identity {user_id} created but profile write failed"),
            },
        }
    })?;

    match body.role {
        Role::Steward => {
            state.store.set_role(user_id, Role::Steward).await.map_err(|err| {
                tracing::error!(%user_id, error = ?err, "profile created but role write failed");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorResponse {
                        code: "role_update_failed".to_string(),
                        message: format!("account {user_id} created but role write failed"),
                    },
                }
            })?;
        }
        Role::Member => {}
    }

    tracing::info!(%user_id, role = body.role.as_str(), "roster account created");
    Ok((
        StatusCode::CREATED,
        Json(RosterEntry {
            profile,
            role: body.role,
        }),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/admin/roster/{user_id}",
    tag = "admin",
    params(("user_id" = Uuid, Path, description = "Identity to update")),
    request_body = RosterUpdateRequest,
    responses(
        (status = 200, description = "Roster entry updated", body = RosterEntry),
        (status = 404, description = "Profile missing", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Profile updated but role update failed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_roster_entry(
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RosterUpdateRequest>,
) -> Result<Json<RosterEntry>, ApiError> {
    AuthContext::require_steward(state.store.as_ref(), &state.session, &headers).await?;

    let profile = state
        .store
        .update_profile(
            user_id,
            ProfileUpdate {
                full_name: body.full_name,
                room_number: body.room_number,
                phone: body.phone,
                batch: body.batch,
                branch: body.branch,
                avatar_url: body.avatar_url,
                emergency_contact: body.emergency_contact,
                emergency_phone: body.emergency_phone,
            },
        )
        .await
        .map_err(|err| match err {
            StoreError::NotFound(message) => api_not_found(&message),
            other => {
                tracing::error!(%user_id, error = ?other, "profile update failed");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorResponse {
                        code: "profile_update_failed".to_string(),
                        message: "profile update failed".to_string(),
                    },
                }
            }
        })?;

    // Role updates independently of the profile write; a failure here is
    // reported under its own code because the profile change already stuck.
    let role = match body.role {
        Some(role) => {
            state.store.set_role(user_id, role).await.map_err(|err| {
                tracing::error!(%user_id, error = ?err, "role update failed after profile update");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorResponse {
                        code: "role_update_failed".to_string(),
                        message: "profile updated but role update failed".to_string(),
                    },
                }
            })?;
            role
        }
        None => state
            .store
            .get_role(user_id)
            .await
            .map_err(|_| api_internal_message("failed to resolve role"))?,
    };

    Ok(Json(RosterEntry { profile, role }))
}

#[utoipa::path(
    patch,
    path = "/v1/admin/roster/{user_id}/approval",
    tag = "admin",
    params(("user_id" = Uuid, Path, description = "Identity to gate")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Approval flag updated", body = Profile),
        (status = 404, description = "Profile missing", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn set_approval(
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ApprovalRequest>,
) -> Result<Json<Profile>, ApiError> {
    let context =
        AuthContext::require_steward(state.store.as_ref(), &state.session, &headers).await?;
    let profile = state
        .store
        .set_approval(user_id, body.approved)
        .await
        .map_err(|err| api_store_error("failed to update approval", err))?;
    // Takes effect on the target's next context derivation; sessions are
    // not invalidated here.
    tracing::info!(
        target = %user_id,
        approved = body.approved,
        by = %context.user_id,
        "approval gate updated"
    );
    Ok(Json(profile))
}
