use crate::encoder::{completion_id, unix_timestamp, CompletionCollector, OpenAiStreamEncoder};
use crate::types::{ChatCompletionRequest, ErrorBody, ModelCard, ModelList};
use async_trait::async_trait;
use futures::StreamExt;
use portico_contract::{
    join_path, normalize_path, sse_stream, ProtocolRequest, ProtocolResponse, ProtocolService,
    RouteSpec, ServiceError,
};
use portico_runtime::{InvokeOptions, Invoker};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const MODELS_PATH: &str = "/models";

/// OpenAI-compatible protocol service.
pub struct OpenAiProtocol {
    invoker: Invoker,
    prefix: String,
    model_id: String,
}

impl OpenAiProtocol {
    /// Create the service with the default `/v1` prefix.
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            prefix: "/v1".to_string(),
            model_id: "agent".to_string(),
        }
    }

    /// Override the path prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the model id advertised by `/models` and used when requests
    /// omit `model`.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = model.into();
        self
    }

    async fn chat_completions(&self, request: &ProtocolRequest) -> ProtocolResponse {
        let parsed: ChatCompletionRequest = match serde_json::from_slice(&request.body) {
            Ok(parsed) => parsed,
            Err(err) => {
                return ProtocolResponse::json(
                    400,
                    &ErrorBody::new("invalid_request_error", err.to_string(), None),
                );
            }
        };

        let model = parsed.model.clone().unwrap_or_else(|| self.model_id.clone());
        let stream = parsed.stream;
        let run = parsed.into_run_request();
        let events = self.invoker.invoke(run, InvokeOptions::default());

        if stream {
            let encoder = OpenAiStreamEncoder::new(model);
            return ProtocolResponse::sse(sse_stream(events, encoder));
        }

        // Non-streaming: exhaust the sequence before rendering anything.
        let mut events = events;
        let mut collector = CompletionCollector::default();
        while let Some(event) = events.next().await {
            collector.on_event(&event);
        }
        if let Some((message, code)) = collector.error() {
            return ProtocolResponse::json(
                500,
                &ErrorBody::new("server_error", message.clone(), code.clone()),
            );
        }
        let completion = collector.into_completion(completion_id(), unix_timestamp(), model);
        ProtocolResponse::json(200, &completion)
    }

    fn models(&self) -> ProtocolResponse {
        ProtocolResponse::json(
            200,
            &ModelList {
                object: "list".to_string(),
                data: vec![ModelCard {
                    id: self.model_id.clone(),
                    object: "model".to_string(),
                    created: unix_timestamp(),
                    owned_by: "portico".to_string(),
                }],
            },
        )
    }
}

#[async_trait]
impl ProtocolService for OpenAiProtocol {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn routes(&self) -> Vec<RouteSpec> {
        vec![
            RouteSpec::post(CHAT_COMPLETIONS_PATH),
            RouteSpec::get(MODELS_PATH),
        ]
    }

    async fn handle(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, ServiceError> {
        let path = normalize_path(&request.path);
        if request.method.eq_ignore_ascii_case("POST")
            && path == normalize_path(&join_path(&self.prefix, CHAT_COMPLETIONS_PATH))
        {
            return Ok(self.chat_completions(request).await);
        }
        if request.method.eq_ignore_ascii_case("GET")
            && path == normalize_path(&join_path(&self.prefix, MODELS_PATH))
        {
            return Ok(self.models());
        }
        Ok(ProtocolResponse::json(
            404,
            &ErrorBody::new("not_found", format!("no route for {path}"), None),
        ))
    }
}
