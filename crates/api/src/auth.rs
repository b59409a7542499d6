//! Request authentication.
//!
//! Tokens are not issued or verified here: `bearer` mode only requires that
//! a token is present and uses it as the user id.

use std::str::FromStr;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use domain::DEMO_USER_ID;

use crate::error::ApiError;

/// User id recorded on invoices created without an authenticated user.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// How requests are attributed to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Every request runs as the demo user.
    #[default]
    Demo,
    /// Requests must carry `Authorization: Bearer <user id>`.
    Bearer,
    /// Requests run without a user.
    Disabled,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(AuthMode::Demo),
            "bearer" => Ok(AuthMode::Bearer),
            "disabled" | "none" => Ok(AuthMode::Disabled),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

/// The user a request is attributed to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Option<String>);

impl CurrentUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Id to record as the author of new records.
    pub fn id_or_anonymous(&self) -> &str {
        self.id().unwrap_or(ANONYMOUS_USER_ID)
    }
}

/// Middleware attaching a [`CurrentUser`] extension to the request.
pub async fn authenticate(
    State(mode): State<AuthMode>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match mode {
        AuthMode::Demo => CurrentUser(Some(DEMO_USER_ID.to_string())),
        AuthMode::Bearer => {
            let token = bearer_token(request.headers())
                .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;
            CurrentUser(Some(token.to_string()))
        }
        AuthMode::Disabled => CurrentUser(None),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
