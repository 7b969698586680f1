use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use uuid::Uuid;

use crate::http::AppError;
use crate::AppState;

/// The actor identity minted by the auth gateway in front of this service.
/// Credential checks happen there; by the time a request reaches us the
/// actor is an opaque, already-authenticated ID in a trusted header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

const ACTOR_ID_HEADER: HeaderName = HeaderName::from_static("x-actor-id");

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing actor identity"))?;

        let user_id = Uuid::parse_str(header)
            .map_err(|_| AppError::unauthorized("invalid actor identity"))?;

        Ok(AuthUser { user_id })
    }
}
