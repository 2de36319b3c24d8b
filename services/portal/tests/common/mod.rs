use portal::api::types::FeatureFlags;
use portal::app::{build_router, AppState};
use portal::auth::{password, SessionKeys};
use portal::model::{Profile, Role};
use portal::store::memory::InMemoryStore;
use portal::store::{CommunityStore, IdentityRecord, IdentityStore, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub struct TestPortal {
    pub app: axum::Router,
    pub store: Arc<InMemoryStore>,
    pub session: Arc<SessionKeys>,
}

pub fn portal() -> TestPortal {
    let store = Arc::new(InMemoryStore::new(StoreConfig {
        changes_limit: 64,
        change_retention_max_rows: Some(128),
    }));
    let session = Arc::new(SessionKeys::new("integration-secret", Duration::from_secs(300)));
    let state = AppState {
        api_version: "v1".to_string(),
        features: FeatureFlags {
            durable_storage: false,
        },
        store: store.clone(),
        session: session.clone(),
    };
    TestPortal {
        app: build_router(state),
        store,
        session,
    }
}

/// Seed an account directly in the store and return its id and a session
/// token. `password` is registered so the sign-in flow also works.
pub async fn seed_user(
    portal: &TestPortal,
    full_name: &str,
    email: &str,
    password_text: &str,
    approved: bool,
    role: Role,
) -> (Uuid, String) {
    let credential = password::derive(password_text);
    let user_id = Uuid::new_v4();
    portal
        .store
        .create_identity(IdentityRecord {
            user_id,
            email: email.to_string(),
            salt: credential.salt,
            digest: credential.digest,
        })
        .await
        .expect("identity");
    let mut profile = Profile::new(user_id, email.to_string(), full_name.to_string());
    profile.is_approved = approved;
    portal.store.create_profile(profile).await.expect("profile");
    match role {
        Role::Steward => portal
            .store
            .set_role(user_id, Role::Steward)
            .await
            .expect("role"),
        Role::Member => {}
    }
    let token = portal.session.mint(user_id).expect("token");
    (user_id, token)
}
