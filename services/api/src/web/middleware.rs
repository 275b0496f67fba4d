//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.
//!
//! Authentication itself happens upstream; requests reach us with the caller's
//! id in the `x-user-id` header.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use portal_core::domain::User;
use portal_core::ports::StoreError;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, placed in request extensions by [`require_user`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Loads the user named by the identity header.
pub async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("{} header is required", USER_ID_HEADER)))?;

    match state.store.get_user(user_id).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound(_)) => {
            warn!("Rejected request from unknown user {}", user_id);
            Err(ApiError::Unauthorized(format!("unknown user {}", user_id)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Middleware that resolves the caller and inserts it into request extensions.
///
/// A missing or unknown identity is answered with 401 Unauthorized.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_caller(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
