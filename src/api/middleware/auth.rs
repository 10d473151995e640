//! Bearer credential authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;

use crate::{error::AppError, state::AppState};

/// Owner resolved from the request's session credential.
///
/// Inserted into request extensions by [`layer`]; handlers take it with
/// `Extension<AuthenticatedOwner>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedOwner(pub i64);

/// Authenticates requests using Bearer credentials from the Authorization header.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <owner_id>.<expires_unix>.<signature>
/// ```
///
/// # Errors
///
/// Returns `401 Unauthorized` with `WWW-Authenticate: Bearer` if the header is
/// missing, or the credential is malformed, forged or expired.
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let AuthBearer(credential) = AuthBearer::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                serde_json::json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    let owner_id = st.auth_service.authenticate(&credential)?;
    parts.extensions.insert(AuthenticatedOwner(owner_id));

    Ok(next.run(Request::from_parts(parts, body)).await)
}
