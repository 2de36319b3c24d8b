//! Change-driven feed recomputation.
//!
//! # Purpose
//! A background task that subscribes to the store's post change stream and
//! re-runs the full feed aggregation for one (viewer, filter) pair on every
//! event, publishing results into a `watch` channel.
//!
//! # Staleness
//! Recomputations run as spawned tasks and may complete out of order. Each
//! is tagged with a monotonic refresh sequence; a result that would rewind
//! the published sequence is discarded, so subscribers never observe a
//! newer feed being replaced by an older one. Recomputation is full, not
//! incremental: a burst of N mutations may trigger up to N recomputes, each
//! of which is idempotent.
//!
//! # Cleanup
//! Dropping the watcher aborts the task, which drops the broadcast receiver
//! and unsubscribes from the change stream.
use crate::feed::build_feed;
use crate::model::FeedItem;
use crate::store::{CommunityStore, PortalStore};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

/// Published feed state. `refresh_seq` is 0 until the first recompute lands.
#[derive(Debug, Clone, Default)]
pub struct FeedUpdate {
    pub refresh_seq: u64,
    pub items: Vec<FeedItem>,
}

/// Admission control for recompute results: only a sequence newer than the
/// last published one may be installed.
#[derive(Debug, Default)]
struct RefreshGate {
    published: u64,
}

impl RefreshGate {
    fn admit(&mut self, seq: u64) -> bool {
        if seq > self.published {
            self.published = seq;
            true
        } else {
            false
        }
    }
}

pub struct FeedWatcher {
    updates: watch::Receiver<FeedUpdate>,
    task: tokio::task::JoinHandle<()>,
}

impl FeedWatcher {
    /// Start watching post changes for `viewer`, optionally filtered to one
    /// channel. An initial recompute runs immediately so subscribers get a
    /// populated feed without waiting for the first mutation.
    pub fn spawn(
        store: Arc<dyn PortalStore + Send + Sync>,
        viewer: Uuid,
        channel: Option<Uuid>,
    ) -> Self {
        let changes = store.subscribe_post_changes();
        let (updates_tx, updates_rx) = watch::channel(FeedUpdate::default());
        let task = tokio::spawn(run(store, viewer, channel, changes, updates_tx));
        Self {
            updates: updates_rx,
            task,
        }
    }

    /// Receiver over published feed updates.
    pub fn subscribe(&self) -> watch::Receiver<FeedUpdate> {
        self.updates.clone()
    }
}

impl Drop for FeedWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    store: Arc<dyn PortalStore + Send + Sync>,
    viewer: Uuid,
    channel: Option<Uuid>,
    mut changes: broadcast::Receiver<crate::model::PostChange>,
    updates: watch::Sender<FeedUpdate>,
) {
    let (done_tx, mut done_rx) = mpsc::channel::<(u64, Vec<FeedItem>)>(16);
    let mut gate = RefreshGate::default();
    let mut next_refresh: u64 = 0;

    // Initial aggregation so the watch channel starts populated.
    next_refresh += 1;
    spawn_recompute(store.clone(), viewer, channel, next_refresh, done_tx.clone());

    loop {
        tokio::select! {
            event = changes.recv() => match event {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Any post mutation (or a lag gap we may have missed
                    // events in) triggers a full recompute.
                    next_refresh += 1;
                    spawn_recompute(
                        store.clone(),
                        viewer,
                        channel,
                        next_refresh,
                        done_tx.clone(),
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some((seq, items)) = done_rx.recv() => {
                if gate.admit(seq) {
                    metrics::counter!("portal_feed_refreshes_total").increment(1);
                    let _ = updates.send(FeedUpdate { refresh_seq: seq, items });
                } else {
                    metrics::counter!("portal_feed_refreshes_discarded_total").increment(1);
                }
            },
        }
    }
}

fn spawn_recompute(
    store: Arc<dyn PortalStore + Send + Sync>,
    viewer: Uuid,
    channel: Option<Uuid>,
    seq: u64,
    done: mpsc::Sender<(u64, Vec<FeedItem>)>,
) {
    tokio::spawn(async move {
        match build_feed(store.as_ref(), viewer, channel).await {
            Ok(items) => {
                let _ = done.send((seq, items)).await;
            }
            Err(err) => {
                // A failed recompute keeps the previously published feed;
                // the next change event retries from scratch.
                tracing::warn!(error = %err, "feed recompute failed");
            }
        }
    });
}
