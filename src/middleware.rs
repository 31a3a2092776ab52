use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, model::CurrentUser, AppState};

/// Authentication gate for protected routes. Handlers that take a
/// `CurrentUser` only run once the session cookie has been verified, and get
/// the caller id as a plain value to pass on to the services.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = state.auth.verify_caller(&parts.headers)?;
        Ok(CurrentUser { user_id })
    }
}
