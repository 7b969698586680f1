use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::{handlers, ws};
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::list_feed))
}

pub fn videos() -> Router<AppState> {
    Router::new()
        .route("/videos", post(handlers::create_video))
        .route("/videos/:id", get(handlers::get_video))
        .route("/videos/:id", patch(handlers::update_video))
        .route("/videos/:id", delete(handlers::delete_video))
        .route("/videos/:id/like", post(handlers::toggle_like))
        .route("/videos/:id/comments", get(handlers::list_comments))
        .route("/videos/:id/comments", post(handlers::create_comment))
        .route(
            "/videos/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
        .route("/videos/:id/live", get(ws::join_comment_room))
}
