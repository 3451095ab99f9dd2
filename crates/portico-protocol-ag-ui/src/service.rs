use crate::encoder::AgUiEncoder;
use crate::events::Event;
use crate::types::{gen_run_id, gen_thread_id, RequestError, RunAgentInput};
use async_trait::async_trait;
use portico_contract::{
    sse_stream, ProtocolRequest, ProtocolResponse, ProtocolService, RouteSpec, ServiceError,
    WireFrame,
};
use portico_runtime::{InvokeOptions, Invoker};

const AGENT_PATH: &str = "/agent";

/// AG-UI protocol service. Always streams.
pub struct AgUiProtocol {
    invoker: Invoker,
    prefix: String,
}

impl AgUiProtocol {
    /// Create the service with the default `/ag-ui` prefix.
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            prefix: "/ag-ui".to_string(),
        }
    }

    /// Override the path prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    async fn run_agent(&self, request: &ProtocolRequest) -> ProtocolResponse {
        let input: RunAgentInput = match serde_json::from_slice(&request.body) {
            Ok(input) => input,
            // AG-UI has no non-stream error channel: parse failures are
            // reported inside a one-shot event stream.
            Err(err) => {
                return error_stream(
                    gen_thread_id(),
                    gen_run_id(),
                    RequestError::validation(err.to_string()),
                );
            }
        };
        if let Err(err) = input.validate() {
            return error_stream(input.thread_id, input.run_id, err);
        }

        let thread_id = input.thread_id.clone();
        let run_id = input.run_id.clone();
        let events = self
            .invoker
            .invoke(input.into_run_request(), InvokeOptions::default());
        let encoder = AgUiEncoder::new(thread_id, run_id);
        ProtocolResponse::sse(sse_stream(events, encoder))
    }
}

/// One-shot RUN_STARTED + RUN_ERROR stream for pre-run failures.
fn error_stream(thread_id: String, run_id: String, err: RequestError) -> ProtocolResponse {
    let fragments: Vec<String> = [
        Event::run_started(thread_id, run_id),
        Event::run_error(err.message, Some(err.code)),
    ]
    .into_iter()
    .map(|event| {
        WireFrame::Json(serde_json::to_value(event).expect("event serializes")).to_sse()
    })
    .collect();
    ProtocolResponse::sse(Box::pin(futures::stream::iter(fragments)))
}

#[async_trait]
impl ProtocolService for AgUiProtocol {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![RouteSpec::post(AGENT_PATH)]
    }

    async fn handle(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, ServiceError> {
        Ok(self.run_agent(request).await)
    }
}
