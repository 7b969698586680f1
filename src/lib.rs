pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;
pub mod realtime;

use crate::app::rate_limiter::RateLimiter;
use crate::infra::db::Db;
use crate::realtime::CommentRooms;

/// Everything a request handler can reach. The rooms and the rate limiter
/// are the only process-wide mutable state; both start empty and die with
/// the process.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub rooms: CommentRooms,
    pub rate_limiter: RateLimiter,
}
