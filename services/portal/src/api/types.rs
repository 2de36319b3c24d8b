//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the portal REST API and OpenAPI schema
//! generation.
use crate::model::{Channel, FeedItem, Post, PostChange, Profile, Role, RosterEntry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeatureFlags {
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub features: FeatureFlags,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Session issued at sign-in/sign-up. `profile` is absent for identities
/// whose profile row was never written (a partially created account); such
/// sessions resolve as unapproved.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionResponse {
    pub token: String,
    pub profile: Option<Profile>,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChannelCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChannelListResponse {
    pub items: Vec<Channel>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PostCreateRequest {
    pub title: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub flair: Option<String>,
    pub subreddit_id: Uuid,
    #[serde(default)]
    pub poll_options: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct VoteRequest {
    pub vote_type: i16,
}

/// The caller's vote on the post after the cast: -1, 0, or 1.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct VoteResponse {
    pub user_vote: i16,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CommentCreateRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PinRequest {
    pub pinned: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeedResponse {
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PostSnapshotResponse {
    pub items: Vec<Post>,
    pub next_seq: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PostChangesResponse {
    pub items: Vec<PostChange>,
    pub next_seq: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RosterResponse {
    pub items: Vec<RosterEntry>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RosterCreateRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub room_number: Option<String>,
    pub phone: Option<String>,
    pub batch: Option<String>,
    pub branch: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// Profile fields and role update independently; either may fail on its own
/// and the error codes are distinct.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RosterUpdateRequest {
    pub full_name: Option<String>,
    pub room_number: Option<String>,
    pub phone: Option<String>,
    pub batch: Option<String>,
    pub branch: Option<String>,
    pub avatar_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ApprovalRequest {
    pub approved: bool,
}
