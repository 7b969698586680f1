use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::engagement::{CommentCreate, CommentDelete, EngagementService, LikeToggle};
use crate::app::feed::{clamp_page_size, decode_cursor, encode_cursor, FeedService};
use crate::app::videos::{VideoDelete, VideoMutation, VideoService};
use crate::domain::engagement::{Comment, CommentNode};
use crate::domain::video::{Video, Visibility};
use crate::http::{AppError, AuthUser};
use crate::realtime::events::RoomEvent;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub items: Vec<Video>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub count: usize,
}

pub async fn list_feed(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let limit = clamp_page_size(query.limit);
    let cursor = decode_cursor(query.cursor.as_deref());

    let service = FeedService::new(state.db.clone());
    let page = service
        .list_feed(viewer_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to fetch feed");
            AppError::internal("failed to fetch feed")
        })?;

    Ok(Json(FeedResponse {
        count: page.items.len(),
        next_cursor: encode_cursor(page.next_cursor),
        has_more: page.has_more,
        items: page.items,
    }))
}

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

const MAX_TITLE_LEN: usize = 150;
const MAX_DESCRIPTION_LEN: usize = 5000;

#[derive(Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    pub description: Option<String>,
    pub media_key: String,
    pub visibility: Option<Visibility>,
}

pub async fn create_video(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<Json<Video>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }
    if payload.title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title exceeds 150 characters"));
    }
    if let Some(description) = &payload.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::bad_request("description exceeds 5000 characters"));
        }
    }
    if payload.media_key.trim().is_empty() {
        return Err(AppError::bad_request("media_key is required"));
    }

    let service = VideoService::new(state.db.clone());
    let video = service
        .create(
            auth.user_id,
            payload.title,
            payload.description,
            payload.media_key,
            payload.visibility.unwrap_or(Visibility::Public),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, owner_id = %auth.user_id, "failed to create video");
            AppError::internal("failed to create video")
        })?;

    Ok(Json(video))
}

pub async fn get_video(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<Video>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let service = VideoService::new(state.db.clone());
    let video = service.get(id, viewer_id).await.map_err(|err| {
        tracing::error!(error = ?err, video_id = %id, "failed to fetch video");
        AppError::internal("failed to fetch video")
    })?;

    let Some(video) = video else {
        return Err(AppError::not_found("video not found"));
    };

    // View counting never fails the read that caused it.
    let db = state.db.clone();
    tokio::spawn(async move {
        if let Err(err) = VideoService::new(db).record_view(id).await {
            tracing::warn!(error = ?err, video_id = %id, "failed to record view");
        }
    });

    Ok(Json(video))
}

#[derive(Deserialize)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

pub async fn update_video(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateVideoRequest>,
) -> Result<Json<Video>, AppError> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("title cannot be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::bad_request("title exceeds 150 characters"));
        }
    }
    if let Some(description) = &payload.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::bad_request("description exceeds 5000 characters"));
        }
    }

    let service = VideoService::new(state.db.clone());
    let outcome = service
        .update(
            id,
            auth.user_id,
            payload.title,
            payload.description,
            payload.visibility,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, video_id = %id, "failed to update video");
            AppError::internal("failed to update video")
        })?;

    match outcome {
        VideoMutation::Applied(video) => Ok(Json(video)),
        VideoMutation::NotFound => Err(AppError::not_found("video not found")),
        VideoMutation::NotOwner => Err(AppError::forbidden("not the video owner")),
    }
}

pub async fn delete_video(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = VideoService::new(state.db.clone());
    let outcome = service.soft_delete(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, video_id = %id, "failed to delete video");
        AppError::internal("failed to delete video")
    })?;

    match outcome {
        VideoDelete::Deleted => Ok(StatusCode::NO_CONTENT),
        VideoDelete::NotFound => Err(AppError::not_found("video not found")),
        VideoDelete::NotOwner => Err(AppError::forbidden("not the video owner")),
    }
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct LikeToggleResponse {
    pub succeeded: bool,
}

/// Toggle the actor's like. A throttled or missing-video attempt is a no-op
/// reported as `succeeded: false`; rapid clicking must never surface an
/// error to the user.
pub async fn toggle_like(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeToggleResponse>, AppError> {
    if !state.rate_limiter.try_acquire(auth.user_id, id) {
        tracing::debug!(user_id = %auth.user_id, video_id = %id, "like toggle throttled");
        return Ok(Json(LikeToggleResponse { succeeded: false }));
    }

    let service = EngagementService::new(state.db.clone());
    let toggle = service
        .toggle_like(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, video_id = %id, "failed to toggle like");
            AppError::internal("failed to toggle like")
        })?;

    let succeeded = matches!(toggle, LikeToggle::Liked | LikeToggle::Unliked);
    Ok(Json(LikeToggleResponse { succeeded }))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

const MAX_COMMENT_LEN: usize = 1000;

#[derive(Serialize)]
pub struct CommentTreeResponse {
    pub comments: Vec<CommentNode>,
}

/// Plain read fallback for the comment tree: a viewer with no working room
/// connection can always re-fetch the same shape the snapshot path sends.
pub async fn list_comments(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<CommentTreeResponse>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let video = VideoService::new(state.db.clone())
        .get(id, viewer_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, video_id = %id, "failed to fetch video");
            AppError::internal("failed to list comments")
        })?;
    if video.is_none() {
        return Err(AppError::not_found("video not found"));
    }

    let comments = EngagementService::new(state.db.clone())
        .comment_tree(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, video_id = %id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    Ok(Json(CommentTreeResponse { comments }))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    pub parent_id: Option<Uuid>,
}

pub async fn create_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("comment body cannot be empty"));
    }
    if payload.body.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request("comment body exceeds 1000 characters"));
    }

    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .create_comment(auth.user_id, id, payload.body, payload.parent_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, video_id = %id, "failed to comment");
            AppError::internal("failed to comment")
        })?;

    match outcome {
        CommentCreate::Created(comment) => {
            // Push only after the transaction committed; viewers that miss
            // this are re-seeded by the snapshot path on their next join.
            state.rooms.broadcast(
                id,
                &RoomEvent::CommentAdded {
                    comment: comment.clone(),
                },
            );
            Ok(Json(comment))
        }
        CommentCreate::VideoNotFound => Err(AppError::not_found("video not found")),
        CommentCreate::ParentNotFound => Err(AppError::bad_request("invalid parent comment")),
    }
}

pub async fn delete_comment(
    Path((video_id, comment_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .delete_comment(comment_id, video_id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %comment_id, user_id = %auth.user_id, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;

    match outcome {
        CommentDelete::Deleted => {
            // A delete can reshape nested state, so replace wholesale
            // instead of describing the change incrementally.
            match service.comment_tree(video_id).await {
                Ok(comments) => state
                    .rooms
                    .broadcast(video_id, &RoomEvent::Snapshot { comments }),
                Err(err) => {
                    // Delivery is best-effort; the mutation stands either way.
                    tracing::warn!(
                        error = ?err,
                        video_id = %video_id,
                        "failed to build snapshot after comment delete"
                    );
                }
            }
            Ok(StatusCode::NO_CONTENT)
        }
        CommentDelete::NotFound => Err(AppError::not_found("comment not found")),
        CommentDelete::NotAuthor => Err(AppError::forbidden("not the comment author")),
    }
}
