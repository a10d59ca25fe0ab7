use actix_web::{web, HttpRequest};

use crate::domain::errors::DomainError;
use crate::domain::ports::SessionStore;
use crate::errors::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

/// Resolve the request's session cookie against `sessions` on the blocking
/// pool. No cookie, or an empty one, is an anonymous request.
pub async fn session_user<S>(req: &HttpRequest, sessions: S) -> Result<Option<i64>, DomainError>
where
    S: SessionStore + Clone,
{
    let Some(token) = req
        .cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
    else {
        return Ok(None);
    };

    web::block(move || sessions.user_for(&token))
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}

/// User behind the request's session cookie, if any.
pub async fn current_user(
    req: &HttpRequest,
    state: &web::Data<AppState>,
) -> Result<Option<i64>, AppError> {
    Ok(session_user(req, state.sessions.clone()).await?)
}

/// Like `current_user`, but an anonymous request is a 401.
pub async fn require_user(
    req: &HttpRequest,
    state: &web::Data<AppState>,
) -> Result<i64, AppError> {
    current_user(req, state).await?.ok_or(AppError::Unauthorized)
}
