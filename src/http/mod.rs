use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;
mod ws;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .nest("/v1", routes::feed().merge(routes::videos()))
        .with_state(state)
}
