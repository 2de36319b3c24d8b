//! Per-request Authorization Context.
//!
//! # Purpose
//! Derives `{user_id, is_approved, role}` from the bearer token and the
//! store, and exposes the three gates every handler uses. No handler
//! re-implements these checks; this module is the single source of truth
//! for who may do what.
//!
//! # Notes
//! The context is re-derived on every request, so approval or role changes
//! take effect on the target's next request without session invalidation.
//! An identity without a profile row (a partially created account) resolves
//! as unapproved rather than failing the lookup, and a missing role row
//! resolves to member.
use crate::api::error::{api_forbidden, api_internal, api_unauthorized, ApiError};
use crate::auth::session::SessionKeys;
use crate::model::Role;
use crate::store::{CommunityStore, PortalStore};
use axum::http::HeaderMap;
use uuid::Uuid;

/// Resolved authorization facts for one signed-in request.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub is_approved: bool,
    pub role: Role,
}

impl AuthContext {
    /// Derive the context for the request, refusing unauthenticated callers.
    pub async fn resolve(
        store: &dyn PortalStore,
        keys: &SessionKeys,
        headers: &HeaderMap,
    ) -> Result<Self, ApiError> {
        let bearer =
            extract_bearer(headers).ok_or_else(|| api_unauthorized("missing bearer token"))?;
        let user_id = keys
            .verify(bearer)
            .map_err(|_| api_unauthorized("invalid session token"))?;

        let profile = store
            .get_profile(user_id)
            .await
            .map_err(|err| api_internal("failed to load profile", &err))?;
        let role = store
            .get_role(user_id)
            .await
            .map_err(|err| api_internal("failed to resolve role", &err))?;

        Ok(Self {
            user_id,
            is_approved: profile.map(|profile| profile.is_approved).unwrap_or(false),
            role,
        })
    }

    /// Signed-in and approved, or refused before any write happens.
    pub async fn require_approved(
        store: &dyn PortalStore,
        keys: &SessionKeys,
        headers: &HeaderMap,
    ) -> Result<Self, ApiError> {
        let context = Self::resolve(store, keys, headers).await?;
        if !context.is_approved {
            return Err(api_forbidden("account is pending approval"));
        }
        Ok(context)
    }

    /// Steward-only gate. Exhaustive over the role enumeration.
    pub async fn require_steward(
        store: &dyn PortalStore,
        keys: &SessionKeys,
        headers: &HeaderMap,
    ) -> Result<Self, ApiError> {
        let context = Self::resolve(store, keys, headers).await?;
        match context.role {
            Role::Steward => Ok(context),
            Role::Member => Err(api_forbidden("steward role required")),
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
