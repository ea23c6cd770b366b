//! Request authentication
//!
//! `auth_middleware` runs on every request and, when the `Authorization`
//! header carries valid Basic or Bearer credentials, stores the `User` in the
//! request extensions. Handlers that require a caller take an [`AuthUser`].

pub mod password;
pub mod token;

pub use password::{hash_password, password_problems, verify_password};
pub use token::{generate_api_token, hash_api_token, parse_authorization, Credentials};

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};

use crate::domain::entities::User;
use crate::error::AppError;
use crate::AppState;

/// Extract credentials from the Authorization header
fn extract_credentials(request: &Request<Body>) -> Option<Credentials> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_authorization)
}

/// Authentication middleware
///
/// Never rejects; unauthenticated requests pass through without a user and
/// are turned away by [`AuthUser`] on the routes that need one.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(credentials) = extract_credentials(&request) {
        match state.identity_service.authenticate(&credentials).await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = %user.id, "Request authenticated");
                request.extensions_mut().insert(user);
            }
            Ok(None) => tracing::debug!("Rejected request credentials"),
            Err(e) => tracing::warn!(error = %e, "Authentication lookup failed"),
        }
    }

    next.run(request).await
}

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}
