//! In-memory implementation of the portal stores.
//!
//! # Purpose
//! Implements [`CommunityStore`] and [`IdentityStore`] entirely in memory
//! using `HashMap`s guarded by `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: write locks serialize mutations; the
//!   vote toggle runs entirely under one write lock, so the at-most-one-row
//!   invariant per (post, voter) holds under concurrent casts.
//!
//! # Change stream
//! Post mutations append to a bounded in-memory change log with a monotonic
//! `seq` and fan out on a broadcast channel. Consumers that fall behind past
//! the retention window (or lag the broadcast) re-bootstrap via
//! `post_snapshot()`.
use super::{
    ChangeSet, CommunityStore, IdentityRecord, IdentityStore, Snapshot, StoreConfig, StoreError,
    StoreResult,
};
use crate::model::{
    Channel, Comment, NewComment, NewPost, PollOption, Post, PostChange, PostChangeOp, Profile,
    ProfileUpdate, Role, RosterEntry, VoteType,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const POST_EVENT_CAPACITY: usize = 256;

/// Bounded, append-only log of post changes keyed by a monotonically
/// increasing `seq` assigned by this process. When capacity is exceeded the
/// oldest entries are evicted and slow pollers must re-bootstrap.
#[derive(Debug)]
struct ChangeLog<T> {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> ChangeLog<T> {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn record(&mut self, item: impl FnOnce(u64) -> T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(item(seq));
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        seq
    }
}

/// In-memory portal store.
///
/// Maps are wrapped in `Arc<RwLock<...>>` so the store can be shared across
/// async handlers with concurrent reads and serialized writes. Votes are
/// keyed by (post_id, user_id) so the map itself is the uniqueness
/// constraint.
pub struct InMemoryStore {
    config: StoreConfig,
    identities: Arc<RwLock<HashMap<String, IdentityRecord>>>,
    profiles: Arc<RwLock<HashMap<Uuid, Profile>>>,
    roles: Arc<RwLock<HashMap<Uuid, Role>>>,
    channels: Arc<RwLock<HashMap<Uuid, Channel>>>,
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
    poll_options: Arc<RwLock<HashMap<Uuid, Vec<PollOption>>>>,
    votes: Arc<RwLock<HashMap<(Uuid, Uuid), i16>>>,
    comments: Arc<RwLock<HashMap<Uuid, Comment>>>,
    post_seq: Arc<RwLock<u64>>,
    post_changes: Arc<RwLock<ChangeLog<PostChange>>>,
    post_events: broadcast::Sender<PostChange>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let capacity = config.change_window();
        let (post_events, _) = broadcast::channel(POST_EVENT_CAPACITY);
        Self {
            config,
            identities: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            roles: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            posts: Arc::new(RwLock::new(HashMap::new())),
            poll_options: Arc::new(RwLock::new(HashMap::new())),
            votes: Arc::new(RwLock::new(HashMap::new())),
            comments: Arc::new(RwLock::new(HashMap::new())),
            post_seq: Arc::new(RwLock::new(0)),
            post_changes: Arc::new(RwLock::new(ChangeLog::new(capacity))),
            post_events,
        }
    }

    fn limit(&self) -> usize {
        self.config.changes_limit as usize
    }

    /// Append a post change and fan it out to in-process subscribers.
    async fn record_post_change(&self, op: PostChangeOp, post_id: Uuid, post: Option<Post>) {
        let mut log = self.post_changes.write().await;
        let mut change = None;
        log.record(|seq| {
            let item = PostChange {
                seq,
                op,
                post_id,
                post: post.clone(),
            };
            change = Some(item.clone());
            item
        });
        drop(log);
        if let Some(change) = change {
            metrics::counter!("portal_post_changes_total", "op" => op_label(op)).increment(1);
            // Send fails only when no subscriber exists, which is fine.
            let _ = self.post_events.send(change);
        }
    }
}

fn op_label(op: PostChangeOp) -> &'static str {
    match op {
        PostChangeOp::Created => "created",
        PostChangeOp::Updated => "updated",
        PostChangeOp::Deleted => "deleted",
    }
}

/// Feed ordering: pinned first, then newest first, insertion seq ascending
/// as the stable tiebreak.
fn feed_order(a: &Post, b: &Post) -> std::cmp::Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then(b.created_at.cmp(&a.created_at))
        .then(a.seq.cmp(&b.seq))
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn create_identity(&self, record: IdentityRecord) -> StoreResult<Uuid> {
        let mut identities = self.identities.write().await;
        let key = record.email.to_ascii_lowercase();
        if identities.contains_key(&key) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        let user_id = record.user_id;
        identities.insert(key, record);
        Ok(user_id)
    }

    async fn find_identity(&self, email: &str) -> StoreResult<Option<IdentityRecord>> {
        Ok(self
            .identities
            .read()
            .await
            .get(&email.to_ascii_lowercase())
            .cloned())
    }
}

#[async_trait]
impl CommunityStore for InMemoryStore {
    async fn create_profile(&self, profile: Profile) -> StoreResult<Profile> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(StoreError::Conflict("profile exists".into()));
        }
        profiles.insert(profile.id, profile.clone());
        metrics::gauge!("portal_profiles_total").set(profiles.len() as f64);
        Ok(profile)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound("profile".into()))?;
        update.apply(profile);
        Ok(profile.clone())
    }

    async fn set_approval(&self, user_id: Uuid, approved: bool) -> StoreResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound("profile".into()))?;
        profile.is_approved = approved;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn get_role(&self, user_id: Uuid) -> StoreResult<Role> {
        // Absent role row resolves to member rather than failing the lookup.
        Ok(self
            .roles
            .read()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or_default())
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        self.roles.write().await.insert(user_id, role);
        Ok(())
    }

    async fn list_roster(&self) -> StoreResult<Vec<RosterEntry>> {
        let profiles = self.profiles.read().await;
        let roles = self.roles.read().await;
        let mut entries: Vec<RosterEntry> = profiles
            .values()
            .map(|profile| RosterEntry {
                role: roles.get(&profile.id).copied().unwrap_or_default(),
                profile: profile.clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            a.profile
                .full_name
                .cmp(&b.profile.full_name)
                .then(a.profile.id.cmp(&b.profile.id))
        });
        Ok(entries)
    }

    async fn list_channels(&self) -> StoreResult<Vec<Channel>> {
        let mut items: Vec<Channel> = self.channels.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn create_channel(&self, channel: Channel) -> StoreResult<Channel> {
        let mut channels = self.channels.write().await;
        if channels.values().any(|existing| existing.name == channel.name) {
            return Err(StoreError::Conflict(format!(
                "channel '{}' already exists",
                channel.name
            )));
        }
        channels.insert(channel.id, channel.clone());
        metrics::gauge!("portal_channels_total").set(channels.len() as f64);
        Ok(channel)
    }

    async fn get_channel(&self, channel_id: Uuid) -> StoreResult<Channel> {
        self.channels
            .read()
            .await
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("channel".into()))
    }

    async fn create_post(&self, new_post: NewPost) -> StoreResult<Post> {
        if !self.channels.read().await.contains_key(&new_post.subreddit_id) {
            return Err(StoreError::NotFound("channel".into()));
        }
        let mut seq_guard = self.post_seq.write().await;
        *seq_guard += 1;
        let seq = *seq_guard;
        drop(seq_guard);

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            seq,
            title: new_post.title,
            content: new_post.content,
            image_url: new_post.image_url,
            flair: new_post.flair,
            is_pinned: false,
            is_poll: !new_post.poll_options.is_empty(),
            subreddit_id: new_post.subreddit_id,
            author_id: new_post.author_id,
            created_at: now,
            updated_at: now,
        };
        let mut posts = self.posts.write().await;
        posts.insert(post.id, post.clone());
        metrics::gauge!("portal_posts_total").set(posts.len() as f64);
        drop(posts);

        if post.is_poll {
            let options = new_post
                .poll_options
                .into_iter()
                .map(|option_text| PollOption {
                    id: Uuid::new_v4(),
                    post_id: post.id,
                    option_text,
                    votes: 0,
                })
                .collect();
            self.poll_options.write().await.insert(post.id, options);
        }

        self.record_post_change(PostChangeOp::Created, post.id, Some(post.clone()))
            .await;
        Ok(post)
    }

    async fn list_posts(&self, channel: Option<Uuid>) -> StoreResult<Vec<Post>> {
        let mut items: Vec<Post> = self
            .posts
            .read()
            .await
            .values()
            .filter(|post| channel.map_or(true, |id| post.subreddit_id == id))
            .cloned()
            .collect();
        items.sort_by(feed_order);
        Ok(items)
    }

    async fn set_post_pinned(&self, post_id: Uuid, pinned: bool) -> StoreResult<Post> {
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(&post_id)
            .ok_or_else(|| StoreError::NotFound("post".into()))?;
        post.is_pinned = pinned;
        post.updated_at = Utc::now();
        let updated = post.clone();
        drop(posts);
        self.record_post_change(PostChangeOp::Updated, post_id, Some(updated.clone()))
            .await;
        Ok(updated)
    }

    async fn poll_options(&self, post_id: Uuid) -> StoreResult<Vec<PollOption>> {
        Ok(self
            .poll_options
            .read()
            .await
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn post_snapshot(&self) -> StoreResult<Snapshot<Post>> {
        // `next_seq` is the checkpoint a consumer should use as `since` on
        // its first changes poll.
        let mut items: Vec<Post> = self.posts.read().await.values().cloned().collect();
        items.sort_by(feed_order);
        let next_seq = self.post_changes.read().await.next_seq;
        Ok(Snapshot { items, next_seq })
    }

    async fn post_changes(&self, since: u64) -> StoreResult<ChangeSet<PostChange>> {
        // Inclusive `seq >= since` with a page limit. A caller whose `since`
        // predates the retained window receives partial history and should
        // re-bootstrap from a snapshot.
        let guard = self.post_changes.read().await;
        let items = guard
            .items
            .iter()
            .filter(|item| item.seq >= since)
            .take(self.limit())
            .cloned()
            .collect();
        Ok(ChangeSet {
            items,
            next_seq: guard.next_seq,
        })
    }

    fn subscribe_post_changes(&self) -> broadcast::Receiver<PostChange> {
        self.post_events.subscribe()
    }

    async fn cast_post_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        vote: VoteType,
    ) -> StoreResult<i16> {
        if !self.posts.read().await.contains_key(&post_id) {
            return Err(StoreError::NotFound("post".into()));
        }
        // The whole toggle runs under one write lock: re-cast removes the
        // row, opposite direction replaces it, absent inserts it.
        let mut votes = self.votes.write().await;
        let key = (post_id, user_id);
        let result = match votes.get(&key) {
            Some(existing) if *existing == vote.value() => {
                votes.remove(&key);
                0
            }
            _ => {
                votes.insert(key, vote.value());
                vote.value()
            }
        };
        metrics::gauge!("portal_votes_total").set(votes.len() as f64);
        Ok(result)
    }

    async fn post_vote_tally(&self, post_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .votes
            .read()
            .await
            .iter()
            .filter(|((post, _), _)| *post == post_id)
            .map(|(_, vote_type)| i64::from(*vote_type))
            .sum())
    }

    async fn user_post_vote(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<i16> {
        Ok(self
            .votes
            .read()
            .await
            .get(&(post_id, user_id))
            .copied()
            .unwrap_or(0))
    }

    async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        if !self.posts.read().await.contains_key(&new_comment.post_id) {
            return Err(StoreError::NotFound("post".into()));
        }
        let mut comments = self.comments.write().await;
        if let Some(parent_id) = new_comment.parent_id {
            // Parent must already exist on the same post; creation order
            // makes the thread acyclic.
            let parent = comments
                .get(&parent_id)
                .ok_or_else(|| StoreError::NotFound("parent comment".into()))?;
            if parent.post_id != new_comment.post_id {
                return Err(StoreError::NotFound("parent comment".into()));
            }
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new_comment.post_id,
            parent_id: new_comment.parent_id,
            author_id: new_comment.author_id,
            content: new_comment.content,
            created_at: Utc::now(),
        };
        comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn comment_count(&self, post_id: Uuid) -> StoreResult<u64> {
        Ok(self
            .comments
            .read()
            .await
            .values()
            .filter(|comment| comment.post_id == post_id)
            .count() as u64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
