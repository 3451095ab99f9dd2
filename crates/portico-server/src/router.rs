use portico_contract::{ProtocolRequest, ProtocolResponse, ProtocolService};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Server-level protocol router.
///
/// Tries services in registration order and dispatches to the first
/// whose routes match. Unmatched requests get a 404; a service error
/// becomes a generic 500 so a broken handler never abandons the
/// connection without a terminal response.
#[derive(Clone, Default)]
pub struct ProtocolRouter {
    services: Vec<Arc<dyn ProtocolService>>,
}

impl ProtocolRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol service. Order matters: earlier services win.
    #[must_use]
    pub fn with_service(mut self, service: Arc<dyn ProtocolService>) -> Self {
        self.services.push(service);
        self
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, request: &ProtocolRequest) -> ProtocolResponse {
        for service in &self.services {
            if service.matches(request) {
                return match service.handle(request).await {
                    Ok(response) => response,
                    Err(err) => {
                        error!(error = %err, method = %request.method, path = %request.path, "protocol service failed");
                        ProtocolResponse::json(
                            500,
                            &json!({
                                "error": { "message": err.to_string(), "type": "server_error" }
                            }),
                        )
                    }
                };
            }
        }
        ProtocolResponse::json(
            404,
            &json!({
                "error": {
                    "message": format!("no route for {} {}", request.method, request.path),
                    "type": "not_found"
                }
            }),
        )
    }
}
