use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;

use crate::error::WebError;

/// Rejects requests whose `Authorization: Bearer <key>` is not a configured API key.
pub async fn require_auth(
    State(api_keys): State<ApiKeys>,
    req: Request,
    next: Next,
) -> Result<Response, WebError> {
    match bearer_token(req.headers()) {
        Some(token) if api_keys.is_valid(token) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("Invalid API key attempt");
            Err(WebError::Unauthorized)
        }
        None => Err(WebError::Unauthorized),
    }
}

/// Who is asking on a public route. Only admins see unpublished events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Caller {
    #[default]
    Public,
    Admin,
}

impl Caller {
    pub fn is_admin(self) -> bool {
        self == Caller::Admin
    }
}

/// Tags the request with its [`Caller`]. A missing or unknown key is a public caller.
pub async fn identify_caller(
    State(api_keys): State<ApiKeys>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = match bearer_token(req.headers()) {
        Some(token) if api_keys.is_valid(token) => Caller::Admin,
        _ => Caller::Public,
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().copied().unwrap_or_default())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

#[derive(Clone, Default)]
pub struct ApiKeys {
    keys: Arc<HashSet<String>>,
}

impl ApiKeys {
    pub fn from_comma_separated(keys_str: &str) -> Self {
        let keys = keys_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Self {
            keys: Arc::new(keys),
        }
    }

    pub fn is_valid(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_keys() {
        let keys = ApiKeys::from_comma_separated(" alpha, ,beta ");
        assert!(keys.is_valid("alpha"));
        assert!(keys.is_valid("beta"));
        assert!(!keys.is_valid(""));
        assert!(!keys.is_valid("gamma"));
    }

    #[test]
    fn reads_bearer_tokens_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer  alpha ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("alpha"));
    }

    #[test]
    fn empty_configuration_accepts_nothing() {
        let keys = ApiKeys::from_comma_separated("");
        assert!(keys.is_empty());
        assert!(!keys.is_valid("anything"));
    }
}
