// src/identity.rs
//! Request-scoped identity.
//!
//! Sessions are issued by the external identity provider; a request carries
//! its token either as `Authorization: Bearer <token>` or in the session
//! cookie. This module only looks the token up.
use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};
use tracing::warn;

use crate::error::AppError;
use crate::models::Identity;
use crate::state::AppState;

/// Outcome of resolving the caller's session. Never rejects the request;
/// each handler decides how strict to be.
pub struct CurrentIdentity(Result<Option<Identity>, AppError>);

impl CurrentIdentity {
    pub fn anonymous() -> Self {
        Self(Ok(None))
    }

    /// For read paths: a failed lookup counts as anonymous.
    pub fn optional(self) -> Option<Identity> {
        match self.0 {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, continuing anonymously");
                None
            }
        }
    }

    /// For action paths: a failed lookup is a server error and a missing
    /// identity is `Unauthorized`.
    pub fn require(self) -> Result<Identity, AppError> {
        self.0?.ok_or(AppError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers, &state.config.session_cookie) else {
            return Ok(Self::anonymous());
        };

        Ok(Self(state.store.resolve_session(token).await))
    }
}

/// Bearer token first, then the named cookie.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty());

    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value)
}
