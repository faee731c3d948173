use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    auth::{claims::Claims, jwt::JwtKeys},
    error::AppError,
};

/// Request extension holding claims that passed `require_bearer`.
/// Private so nothing else can insert or shadow it.
#[derive(Clone)]
struct VerifiedClaims(Claims);

/// Rejects the request with 401 unless it carries a valid `Bearer` token.
pub async fn require_bearer(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Authorization header must start with 'Bearer '".into())
    })?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("invalid or expired token".into())
    })?;

    req.extensions_mut().insert(VerifiedClaims(claims));
    Ok(next.run(req).await)
}

/// Claims of the caller, available behind `require_bearer`.
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedClaims>()
            .map(|v| CurrentUser(v.0.clone()))
            .ok_or_else(|| AppError::Unauthorized("not authenticated".into()))
    }
}
