//! Post ledger handlers: creation, voting, comments, pinning, and the
//! snapshot/changes polling surface.
//!
//! # Purpose
//! All community writes go through here, each gated by the Authorization
//! Context before any store call. Write failures always surface to the
//! caller; nothing is retried server-side.
use crate::api::error::{api_store_error, api_validation_error, ApiError};
use crate::api::types::{
    CommentCreateRequest, PinRequest, PostChangesResponse, PostCreateRequest,
    PostSnapshotResponse, VoteRequest, VoteResponse,
};
use crate::app::AppState;
use crate::auth::AuthContext;
use crate::model::{Comment, NewComment, NewPost, Post, VoteType};
use crate::store::CommunityStore;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/v1/posts",
    tag = "community",
    request_body = PostCreateRequest,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Empty title", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Channel missing", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context =
        AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;

    // Reject an empty-after-trim title before any write happens.
    let title = body.title.trim().to_string();
    if title.is_empty() {
        return Err(api_validation_error("title must not be empty"));
    }
    let content = body
        .content
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty());
    let flair = body
        .flair
        .map(|flair| flair.trim().to_string())
        .filter(|flair| !flair.is_empty());
    let poll_options: Vec<String> = body
        .poll_options
        .into_iter()
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect();

    let post = state
        .store
        .create_post(NewPost {
            title,
            content,
            image_url: body.image_url,
            flair,
            subreddit_id: body.subreddit_id,
            author_id: context.user_id,
            poll_options,
        })
        .await
        .map_err(|err| api_store_error("failed to create post", err))?;
    tracing::info!(post_id = %post.id, author = %context.user_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    post,
    path = "/v1/posts/{post_id}/votes",
    tag = "community",
    params(("post_id" = Uuid, Path, description = "Post identifier")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Resulting vote for the caller", body = VoteResponse),
        (status = 404, description = "Post missing", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn cast_vote(
    Path(post_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let context =
        AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;
    let vote = VoteType::try_from(body.vote_type)
        .map_err(|message| api_validation_error(&message))?;

    let user_vote = state
        .store
        .cast_post_vote(post_id, context.user_id, vote)
        .await
        .map_err(|err| api_store_error("failed to cast vote", err))?;
    Ok(Json(VoteResponse { user_vote }))
}

#[utoipa::path(
    post,
    path = "/v1/posts/{post_id}/comments",
    tag = "community",
    params(("post_id" = Uuid, Path, description = "Post identifier")),
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 404, description = "Post or parent missing", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_comment(
    Path(post_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context =
        AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;

    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(api_validation_error("comment content must not be empty"));
    }

    let comment = state
        .store
        .create_comment(NewComment {
            post_id,
            parent_id: body.parent_id,
            author_id: context.user_id,
            content,
        })
        .await
        .map_err(|err| api_store_error("failed to create comment", err))?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    patch,
    path = "/v1/posts/{post_id}/pin",
    tag = "community",
    params(("post_id" = Uuid, Path, description = "Post identifier")),
    request_body = PinRequest,
    responses(
        (status = 200, description = "Pin state updated", body = Post),
        (status = 403, description = "Steward role required", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn set_pin(
    Path(post_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PinRequest>,
) -> Result<Json<Post>, ApiError> {
    AuthContext::require_steward(state.store.as_ref(), &state.session, &headers).await?;
    let post = state
        .store
        .set_post_pinned(post_id, body.pinned)
        .await
        .map_err(|err| api_store_error("failed to update pin", err))?;
    Ok(Json(post))
}

#[utoipa::path(
    get,
    path = "/v1/posts/snapshot",
    tag = "community",
    responses(
        (status = 200, description = "Full post snapshot with changes checkpoint", body = PostSnapshotResponse)
    )
)]
pub(crate) async fn post_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PostSnapshotResponse>, ApiError> {
    AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;
    let snapshot = state
        .store
        .post_snapshot()
        .await
        .map_err(|err| api_store_error("failed to load post snapshot", err))?;
    Ok(Json(PostSnapshotResponse {
        items: snapshot.items,
        next_seq: snapshot.next_seq,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangesQuery {
    since: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/v1/posts/changes",
    tag = "community",
    params(("since" = Option<u64>, Query, description = "Last seen sequence")),
    responses(
        (status = 200, description = "Post change page", body = PostChangesResponse)
    )
)]
pub(crate) async fn post_changes(
    Query(query): Query<ChangesQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PostChangesResponse>, ApiError> {
    AuthContext::require_approved(state.store.as_ref(), &state.session, &headers).await?;
    let changes = state
        .store
        .post_changes(query.since.unwrap_or(0))
        .await
        .map_err(|err| api_store_error("failed to load post changes", err))?;
    Ok(Json(PostChangesResponse {
        items: changes.items,
        next_seq: changes.next_seq,
    }))
}
