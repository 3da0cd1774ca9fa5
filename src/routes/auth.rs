use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;

/// Token a store expects in `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(token: &str) -> Self {
        if token.is_empty() {
            tracing::warn!("Auth token not configured; all authenticated requests will be rejected");
        }
        Self(Arc::from(token))
    }

    /// Whether `presented` matches. An unset token matches nothing.
    pub fn verify(&self, presented: &str) -> bool {
        !self.0.is_empty() && constant_time_eq(presented.as_bytes(), self.0.as_bytes())
    }
}

pub async fn require_bearer(
    State(expected): State<BearerToken>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = extract_bearer(req.headers()).is_some_and(|token| expected.verify(token));
    if !authorized {
        tracing::debug!(path = %req.uri().path(), "Rejected unauthenticated request");
        return ApiError::Unauthorized.into_response();
    }
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Compare two byte strings in time independent of where they differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
