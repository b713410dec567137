//! Request token authentication for the media endpoints.
//!
//! Every mutating request carries the acting user's id and a token bound to
//! that id. The token is an HMAC-SHA256 over the actor id:
//!
//! ```text
//! token = hex(HMAC-SHA256(secret_key, "media-token:{actor}"))
//! ```
//!
//! The actor travels in the `X-Media-Actor` header; the token in the
//! `X-CSRF-Token` header or the `token` query parameter. A request failing the
//! check is answered with `403` before any handler runs.
//!
//! # Example
//!
//! ```rust
//! use media_manager::server::auth::RequestTokens;
//!
//! let tokens = RequestTokens::new("my-secret-key");
//! let token = tokens.issue("alice");
//!
//! assert!(tokens.verify("alice", &token).is_ok());
//! assert!(tokens.verify("bob", &token).is_err());
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::handlers::ErrorResponse;
use crate::error::MediaError;

/// Header carrying the request token.
pub const TOKEN_HEADER: &str = "x-csrf-token";

/// Header carrying the acting user's id.
pub const ACTOR_HEADER: &str = "x-media-actor";

/// Query parameter accepted in place of [`TOKEN_HEADER`].
pub const TOKEN_QUERY_PARAM: &str = "token";

// =============================================================================
// Types
// =============================================================================

type HmacSha256 = Hmac<Sha256>;

/// Reasons a request token is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No token in header or query
    MissingToken,

    /// No actor header
    MissingActor,

    /// Token is not valid hex
    InvalidTokenFormat,

    /// Token does not match the actor
    InvalidToken,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::MissingToken => write!(f, "Missing request token"),
            TokenError::MissingActor => write!(f, "Missing actor header"),
            TokenError::InvalidTokenFormat => write!(f, "Invalid request token format"),
            TokenError::InvalidToken => write!(f, "Invalid request token"),
        }
    }
}

impl From<TokenError> for MediaError {
    fn from(_: TokenError) -> Self {
        MediaError::TokenInvalid
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let status = StatusCode::FORBIDDEN;
        let detail = self.to_string();
        let err = MediaError::from(self.clone());

        // A wrong token for a known actor is worth a warning; missing pieces
        // are usually a misconfigured client.
        match self {
            TokenError::InvalidToken => {
                warn!(
                    error_type = err.kind(),
                    status = status.as_u16(),
                    "Token check failed: {}",
                    detail
                );
            }
            _ => {
                debug!(
                    error_type = err.kind(),
                    status = status.as_u16(),
                    "Token check failed: {}",
                    detail
                );
            }
        }

        let error_response = ErrorResponse::with_status(err.kind(), err.to_string(), status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Request Tokens
// =============================================================================

/// Issues and verifies per-actor request tokens.
#[derive(Clone)]
pub struct RequestTokens {
    secret_key: Vec<u8>,
}

impl RequestTokens {
    /// Create a token authority with the given secret key.
    ///
    /// The key should be at least 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Hex-encoded token for `actor`.
    pub fn issue(&self, actor: &str) -> String {
        hex::encode(self.compute_mac(actor))
    }

    /// Check `token` against `actor` in constant time.
    pub fn verify(&self, actor: &str, token: &str) -> Result<(), TokenError> {
        let provided = hex::decode(token).map_err(|_| TokenError::InvalidTokenFormat)?;
        let expected = self.compute_mac(actor);

        if provided.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(TokenError::InvalidToken)
        }
    }

    fn compute_mac(&self, actor: &str) -> Vec<u8> {
        // HMAC accepts keys of any length, so this never fails in practice
        let mut mac = match HmacSha256::new_from_slice(&self.secret_key) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(b"media-token:");
        mac.update(actor.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for RequestTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTokens")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Actor Extension
// =============================================================================

/// The authenticated actor, inserted into request extensions by
/// [`token_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(TokenError::MissingActor)
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Verify the request token before the request reaches a media handler.
///
/// On success the [`Actor`] is added to the request extensions.
///
/// ```ignore
/// use axum::{middleware, Router};
/// use media_manager::server::auth::{token_middleware, RequestTokens};
///
/// let tokens = RequestTokens::new("secret-key");
/// let app = Router::new()
///     .route("/media/delete", post(delete_handler))
///     .layer(middleware::from_fn_with_state(tokens, token_middleware));
/// ```
pub async fn token_middleware(
    State(tokens): State<RequestTokens>,
    mut request: Request,
    next: Next,
) -> Result<Response, TokenError> {
    let actor = header_value(request.headers(), ACTOR_HEADER).ok_or(TokenError::MissingActor)?;
    let token = header_value(request.headers(), TOKEN_HEADER)
        .or_else(|| query_token(request.uri().query().unwrap_or("")))
        .ok_or(TokenError::MissingToken)?;

    tokens.verify(&actor, &token)?;

    request.extensions_mut().insert(Actor(actor));
    Ok(next.run(request).await)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn query_token(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

// =============================================================================
// Tests
// =============================================================================
