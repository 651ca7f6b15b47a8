//! Axum extractors for authentication
//!
//! Generic over any state `S` where `AuthBackend: FromRef<S>`.
//! This is axum's idiomatic nested-state pattern.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::backend::AuthBackend;
use crate::context::AuthContext;
use crate::error::AuthError;

/// Authenticated user extractor (JWT bearer header)
#[derive(Debug)]
pub struct AuthUser(pub AuthContext);

impl<S> FromRequestParts<S> for AuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let backend = AuthBackend::from_ref(state);
        backend.authenticate_header(parts).map(AuthUser)
    }
}

/// Authentication outcome for WebSocket handshakes.
///
/// Never rejects: a failed handshake still has to be upgraded so the server
/// can answer with a policy-violation close frame instead of an HTTP error.
/// Accepts the bearer header or a `token` query parameter.
#[derive(Debug)]
pub struct StreamAuth(pub Result<AuthContext, AuthError>);

impl<S> FromRequestParts<S> for StreamAuth
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let backend = AuthBackend::from_ref(state);
        Ok(StreamAuth(backend.authenticate_header_or_query(parts)))
    }
}
