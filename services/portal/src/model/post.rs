//! Post model definitions and change-log payloads.
//!
//! # Purpose
//! Defines the post row, poll options, the enriched feed item, and the change
//! payloads emitted by the store's post change stream.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A post within exactly one channel. `seq` is the insertion sequence the
/// store assigns; the feed uses it as the stable tiebreak after the pinned
/// and recency keys.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Post {
    pub id: Uuid,
    pub seq: u64,
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub flair: Option<String>,
    pub is_pinned: bool,
    pub is_poll: bool,
    pub subreddit_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload handed to the store. A non-empty `poll_options` list
/// turns the post into a poll.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub flair: Option<String>,
    pub subreddit_id: Uuid,
    pub author_id: Uuid,
    pub poll_options: Vec<String>,
}

/// Poll option with its denormalized counter. No vote write path exists for
/// these; the counter is schema-carried state.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PollOption {
    pub id: Uuid,
    pub post_id: Uuid,
    pub option_text: String,
    pub votes: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PostChange {
    pub seq: u64,
    pub op: PostChangeOp,
    pub post_id: Uuid,
    pub post: Option<Post>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PostChangeOp {
    Created,
    Updated,
    Deleted,
}

/// Render-ready feed entry: the post plus author display fields, channel
/// name, tally, comment count, and the viewer's own vote. Never persisted;
/// recomputed per refresh.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub channel_name: String,
    pub vote_count: i64,
    pub comment_count: u64,
    pub user_vote: i16,
    pub poll_options: Vec<PollOption>,
}
