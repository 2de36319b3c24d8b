//! OpenAPI schema aggregation for the portal API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for
//! docs and client generation.
use crate::api::{
    admin, auth, channels, feed, posts, profile, system,
    types::{
        ApprovalRequest, ChannelCreateRequest, ChannelListResponse, CommentCreateRequest,
        ErrorResponse, FeatureFlags, FeedResponse, HealthStatus, PinRequest, PostChangesResponse,
        PostCreateRequest, PostSnapshotResponse, RosterCreateRequest, RosterResponse,
        RosterUpdateRequest, SessionResponse, SignInRequest, SignUpRequest, SystemInfo,
        VoteRequest, VoteResponse,
    },
};
use crate::model::{
    Channel, Comment, FeedItem, PollOption, Post, PostChange, PostChangeOp, Profile,
    ProfileUpdate, Role, RosterEntry,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "portal",
        version = "v1",
        description = "Hostel community portal HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        auth::sign_up,
        auth::sign_in,
        profile::get_own_profile,
        profile::update_own_profile,
        channels::list_channels,
        channels::create_channel,
        feed::get_feed,
        posts::create_post,
        posts::cast_vote,
        posts::create_comment,
        posts::set_pin,
        posts::post_snapshot,
        posts::post_changes,
        admin::list_roster,
        admin::create_roster_entry,
        admin::update_roster_entry,
        admin::set_approval
    ),
    components(schemas(
        FeatureFlags,
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        SignUpRequest,
        SignInRequest,
        SessionResponse,
        Profile,
        ProfileUpdate,
        Role,
        RosterEntry,
        RosterResponse,
        RosterCreateRequest,
        RosterUpdateRequest,
        ApprovalRequest,
        Channel,
        ChannelCreateRequest,
        ChannelListResponse,
        Post,
        PostCreateRequest,
        PostChange,
        PostChangeOp,
        PostSnapshotResponse,
        PostChangesResponse,
        PollOption,
        FeedItem,
        FeedResponse,
        VoteRequest,
        VoteResponse,
        Comment,
        CommentCreateRequest,
        PinRequest
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "auth", description = "Sign-in and sign-up"),
        (name = "profile", description = "Self-service profile"),
        (name = "community", description = "Channels, posts, votes, and comments"),
        (name = "admin", description = "Steward-only roster management")
    )
)]
pub struct ApiDoc;
