//! Protocol routing contract.
//!
//! Each protocol formatter declares a path prefix and its routes; the
//! server-level router matches inbound requests against them in
//! registration order.

use crate::http::{ProtocolRequest, ProtocolResponse};
use async_trait::async_trait;

/// One route a protocol service serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: &'static str,
    /// Sub-path under the service prefix.
    pub path: &'static str,
}

impl RouteSpec {
    /// Create a route.
    pub const fn new(method: &'static str, path: &'static str) -> Self {
        Self { method, path }
    }

    /// Create a GET route.
    pub const fn get(path: &'static str) -> Self {
        Self::new("GET", path)
    }

    /// Create a POST route.
    pub const fn post(path: &'static str) -> Self {
        Self::new("POST", path)
    }
}

/// Error escaping a protocol service.
///
/// The router converts it into a generic 500 response; it must never
/// reach the transport unhandled.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("internal error: {0}")]
    Internal(String),
}

/// A protocol formatter bound to a path prefix.
#[async_trait]
pub trait ProtocolService: Send + Sync {
    /// Path prefix all routes are mounted under.
    fn prefix(&self) -> &str;

    /// Routes served by this protocol.
    fn routes(&self) -> Vec<RouteSpec>;

    /// Handle a matched request.
    async fn handle(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, ServiceError>;

    /// Whether this service serves the request: method equality plus
    /// normalized prefix-joined path equality, trailing slashes ignored.
    fn matches(&self, request: &ProtocolRequest) -> bool {
        let path = normalize_path(&request.path);
        self.routes().iter().any(|route| {
            route.method.eq_ignore_ascii_case(&request.method)
                && normalize_path(&join_path(self.prefix(), route.path)) == path
        })
    }
}

/// Join a prefix and a sub-path with exactly one separator.
pub fn join_path(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Normalize a path for comparison: leading slash enforced, trailing
/// slashes ignored.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseBody;

    struct FakeService;

    #[async_trait]
    impl ProtocolService for FakeService {
        fn prefix(&self) -> &str {
            "/v1/"
        }

        fn routes(&self) -> Vec<RouteSpec> {
            vec![RouteSpec::post("/chat/completions"), RouteSpec::get("models")]
        }

        async fn handle(&self, _request: &ProtocolRequest) -> Result<ProtocolResponse, ServiceError> {
            Ok(ProtocolResponse {
                status: 204,
                headers: Default::default(),
                body: ResponseBody::Full(String::new()),
            })
        }
    }

    #[test]
    fn matches_joined_paths_with_slash_tolerance() {
        let service = FakeService;
        assert!(service.matches(&ProtocolRequest::new("POST", "/v1/chat/completions")));
        assert!(service.matches(&ProtocolRequest::new("post", "/v1/chat/completions/")));
        assert!(service.matches(&ProtocolRequest::new("GET", "/v1/models")));
        assert!(!service.matches(&ProtocolRequest::new("GET", "/v1/chat/completions")));
        assert!(!service.matches(&ProtocolRequest::new("POST", "/v2/chat/completions")));
    }

    #[test]
    fn join_and_normalize_are_separator_safe() {
        assert_eq!(join_path("/v1", "/models"), "/v1/models");
        assert_eq!(join_path("/v1/", "models"), "/v1/models");
        assert_eq!(normalize_path("v1/models/"), "/v1/models");
        assert_eq!(normalize_path("/"), "/");
    }
}
