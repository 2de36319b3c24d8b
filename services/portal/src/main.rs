//! Portal HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, session keys, and the HTTP router, then
//! starts the API server and the metrics endpoint.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup
//! logic. When bootstrap steward credentials are configured, the account is
//! seeded idempotently before serving.
mod api;
mod app;
mod auth;
mod config;
mod feed;
mod model;
mod observability;
mod store;

use anyhow::Context;
use api::types::FeatureFlags;
use app::{build_router, AppState};
use auth::password;
use auth::SessionKeys;
use config::{BootstrapSteward, PortalConfig};
use model::{Profile, Role};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use store::{
    memory::InMemoryStore, postgres::PostgresStore, CommunityStore, IdentityRecord, IdentityStore,
    PortalStore, StoreConfig, StoreError,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PortalConfig::from_env_or_yaml().expect("portal config");
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: PortalConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability();
    if config.session_secret == config::DEV_SESSION_SECRET {
        tracing::warn!("PORTAL_SESSION_SECRET not set; using the development default");
    }
    let state = build_state(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "portal listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &PortalConfig) -> anyhow::Result<AppState> {
    let store_config = StoreConfig {
        changes_limit: config.changes_limit,
        change_retention_max_rows: config.change_retention_max_rows,
    };
    let store: Arc<dyn PortalStore + Send + Sync> = match config.storage {
        config::StorageBackend::Memory => Arc::new(InMemoryStore::new(store_config)),
        config::StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg, store_config).await?)
        }
    };

    if let Some(steward) = &config.bootstrap_steward {
        seed_steward(store.as_ref(), steward).await?;
    }

    Ok(AppState {
        api_version: "v1".to_string(),
        features: FeatureFlags {
            durable_storage: store.is_durable(),
        },
        store,
        session: Arc::new(SessionKeys::new(
            &config.session_secret,
            Duration::from_secs(config.session_ttl_secs),
        )),
    })
}

/// Create the configured steward account unless the email is already taken.
/// A fresh deployment needs one steward to approve everyone else.
async fn seed_steward(store: &dyn PortalStore, steward: &BootstrapSteward) -> anyhow::Result<()> {
    if store.find_identity(&steward.email).await?.is_some() {
        tracing::debug!(email = %steward.email, "bootstrap steward already present");
        return Ok(());
    }
    let credential = password::derive(&steward.password);
    let user_id = Uuid::new_v4();
    match store
        .create_identity(IdentityRecord {
            user_id,
            email: steward.email.clone(),
            salt: credential.salt,
            digest: credential.digest,
        })
        .await
    {
        Ok(_) => {}
        // Lost a race with another instance seeding the same account.
        Err(StoreError::Conflict(_)) => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    let mut profile = Profile::new(user_id, steward.email.clone(), steward.full_name.clone());
    profile.is_approved = true;
    store.create_profile(profile).await?;
    store.set_role(user_id, Role::Steward).await?;
    tracing::info!(%user_id, "bootstrap steward created");
    Ok(())
}
