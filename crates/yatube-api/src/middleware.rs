use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, warn};

use yatube_types::api::Claims;

use crate::auth::{AppState, db_call};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_URL: &str = "/auth/login/";

/// Decodes the session token, if any, and attaches its [`Claims`] to the
/// request. Bad or expired tokens, tokens for deleted users and failed user
/// lookups leave the request anonymous rather than failing it.
pub async fn attach_viewer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(&req) {
        match decode::<Claims>(
            &token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => {
                let user_id = data.claims.sub;
                match db_call(&state, move |db| db.get_user_by_id(user_id)).await {
                    Ok(Some(_)) => {
                        req.extensions_mut().insert(data.claims);
                    }
                    Ok(None) => debug!("Session for unknown user {}", user_id),
                    Err(e) => warn!("Session lookup for {} failed, serving anonymously: {}", user_id, e),
                }
            }
            Err(e) => debug!("Rejected session token: {}", e),
        }
    }

    next.run(req).await
}

/// Auth gate for write pages and the follow feed.
pub async fn require_auth(req: Request, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<Claims>().is_none() {
        return Err(AppError::Unauthenticated);
    }
    Ok(next.run(req).await)
}

/// Session cookie first, then `Authorization: Bearer`.
fn session_token(req: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// The signed-in user, if there is one.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Claims>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Claims>().cloned()))
    }
}
