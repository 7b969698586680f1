pub mod engagement;
pub mod feed;
pub mod rate_limiter;
pub mod videos;
