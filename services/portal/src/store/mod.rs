//! Storage traits for the portal.
//!
//! # Purpose
//! Defines the community and identity store contracts, the shared error
//! taxonomy, and the snapshot/changes shapes used for incremental sync.
//!
//! # Notes
//! Two backends implement these traits: an in-memory store for development
//! and tests, and a Postgres store for durable deployments. The vote
//! uniqueness constraint on (post_id, user_id) is enforced inside each
//! backend, not by callers, so concurrent casts linearize correctly.
use crate::model::{
    Channel, Comment, NewComment, NewPost, PollOption, Post, PostChange, Profile, ProfileUpdate,
    Role, RosterEntry, VoteType,
};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
}

impl StoreConfig {
    pub fn change_window(&self) -> usize {
        self.change_retention_max_rows
            .unwrap_or(self.changes_limit as i64)
            .max(self.changes_limit as i64) as usize
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // Pool exhaustion and transport failures are transient; everything
        // else is unexpected and logged as such by callers.
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Unexpected(err.into()),
        }
    }
}

/// Credential material held by the identity store. Hashing policy lives in
/// `auth::password`; the store only persists and returns it.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub user_id: Uuid,
    pub email: String,
    pub salt: String,
    pub digest: String,
}

/// Identity store: authenticates users and owns the unique email space.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create an identity. Fails with [`StoreError::Conflict`] when the email
    /// is already registered.
    async fn create_identity(&self, record: IdentityRecord) -> StoreResult<Uuid>;

    /// Look up credential material by email, if the identity exists.
    async fn find_identity(&self, email: &str) -> StoreResult<Option<IdentityRecord>>;
}

/// Community store: profiles, roles, channels, posts, votes, and comments.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    // Profiles and roles.
    async fn create_profile(&self, profile: Profile) -> StoreResult<Profile>;
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StoreResult<Profile>;
    async fn set_approval(&self, user_id: Uuid, approved: bool) -> StoreResult<Profile>;
    /// Resolve the role for an identity. A missing role row resolves to
    /// [`Role::Member`]; this lookup never fails for absence.
    async fn get_role(&self, user_id: Uuid) -> StoreResult<Role>;
    async fn set_role(&self, user_id: Uuid, role: Role) -> StoreResult<()>;
    /// All profiles joined with their roles, ordered by full name.
    async fn list_roster(&self) -> StoreResult<Vec<RosterEntry>>;

    // Channel catalog.
    async fn list_channels(&self) -> StoreResult<Vec<Channel>>;
    async fn create_channel(&self, channel: Channel) -> StoreResult<Channel>;
    async fn get_channel(&self, channel_id: Uuid) -> StoreResult<Channel>;

    // Post ledger.
    async fn create_post(&self, new_post: NewPost) -> StoreResult<Post>;
    /// Posts in feed order: pinned first, then newest first, ties broken by
    /// insertion sequence ascending. `channel` filters to one channel.
    async fn list_posts(&self, channel: Option<Uuid>) -> StoreResult<Vec<Post>>;
    async fn set_post_pinned(&self, post_id: Uuid, pinned: bool) -> StoreResult<Post>;
    async fn poll_options(&self, post_id: Uuid) -> StoreResult<Vec<PollOption>>;
    async fn post_snapshot(&self) -> StoreResult<Snapshot<Post>>;
    async fn post_changes(&self, since: u64) -> StoreResult<ChangeSet<PostChange>>;
    /// In-process subscription to the post change stream. A receiver that
    /// lags past the channel capacity must re-bootstrap from a snapshot.
    fn subscribe_post_changes(&self) -> broadcast::Receiver<PostChange>;

    // Vote ledger.
    /// Toggle/upsert a vote atomically: same direction removes the row,
    /// opposite direction replaces it, absent inserts it. Returns the
    /// caller's resulting vote value (-1, 0, or 1).
    async fn cast_post_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        vote: VoteType,
    ) -> StoreResult<i16>;
    /// Sum of vote_type over all rows for the post. Recomputed, not stored.
    async fn post_vote_tally(&self, post_id: Uuid) -> StoreResult<i64>;
    async fn user_post_vote(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<i16>;

    // Comments.
    async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment>;
    async fn comment_count(&self, post_id: Uuid) -> StoreResult<u64>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Combined store handle the application state carries.
pub trait PortalStore: CommunityStore + IdentityStore {}

impl<T: CommunityStore + IdentityStore> PortalStore for T {}
