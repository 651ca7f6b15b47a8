//! Authentication backend
//!
//! Turns a bearer token into an `AuthContext`. Tokens are self-contained,
//! so no storage lookup is involved.

use axum::http::{header::AUTHORIZATION, request::Parts};
use axum::extract::Query;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::jwt::{extract_bearer_token, validate_jwt_token};

/// `?token=` fallback for clients that cannot set headers on a WebSocket handshake
#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authentication backend shared by every domain state.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthBackend {
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Validate a raw JWT and build the caller context
    pub fn authenticate_jwt(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = validate_jwt_token(token, &self.config)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;
        Ok(AuthContext::new(user_id, claims.email))
    }

    /// Authenticate from the `Authorization` header only
    pub(crate) fn authenticate_header(&self, parts: &Parts) -> Result<AuthContext, AuthError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;
        let token = extract_bearer_token(header)?;
        self.authenticate_jwt(&token)
    }

    /// Authenticate from the `Authorization` header, falling back to `?token=`
    pub(crate) fn authenticate_header_or_query(
        &self,
        parts: &Parts,
    ) -> Result<AuthContext, AuthError> {
        if parts.headers.contains_key(AUTHORIZATION) {
            return self.authenticate_header(parts);
        }

        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAuthorization)?;
        self.authenticate_jwt(&token)
    }
}
