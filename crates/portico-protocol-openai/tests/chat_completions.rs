use async_trait::async_trait;
use futures::StreamExt;
use portico_contract::{
    AgentEvent, AgentHandler, HandlerError, HandlerOutput, HandlerStream, ProtocolRequest,
    ProtocolService, ResponseBody, RunRequest, StreamItem,
};
use portico_protocol_openai::OpenAiProtocol;
use portico_runtime::Invoker;
use serde_json::{json, Value};
use std::sync::Arc;

struct TextHandler(&'static str);

#[async_trait]
impl AgentHandler for TextHandler {
    async fn handle(&self, _request: &RunRequest) -> Result<HandlerOutput, HandlerError> {
        Ok(HandlerOutput::Text(self.0.to_string()))
    }
}

struct StreamHandler(Vec<Result<StreamItem, HandlerError>>);

#[async_trait]
impl AgentHandler for StreamHandler {
    async fn handle(&self, _request: &RunRequest) -> Result<HandlerOutput, HandlerError> {
        let items: HandlerStream = Box::pin(futures::stream::iter(self.0.clone()));
        Ok(HandlerOutput::Stream(items))
    }
}

struct FailingHandler;

#[async_trait]
impl AgentHandler for FailingHandler {
    async fn handle(&self, _request: &RunRequest) -> Result<HandlerOutput, HandlerError> {
        Err(HandlerError::new("agent blew up"))
    }
}

fn service(handler: Arc<dyn AgentHandler>) -> OpenAiProtocol {
    OpenAiProtocol::new(Invoker::new(handler)).with_model("test-model")
}

fn chat_request(body: Value) -> ProtocolRequest {
    ProtocolRequest::new("POST", "/v1/chat/completions").with_json(&body)
}

fn full_body(response: portico_contract::ProtocolResponse) -> Value {
    match response.body {
        ResponseBody::Full(body) => serde_json::from_str(&body).expect("json body"),
        ResponseBody::Stream(_) => panic!("expected a full body"),
    }
}

async fn sse_fragments(response: portico_contract::ProtocolResponse) -> Vec<String> {
    match response.body {
        ResponseBody::Stream(stream) => stream.collect().await,
        ResponseBody::Full(body) => panic!("expected a stream, got: {body}"),
    }
}

fn chunk_json(fragment: &str) -> Value {
    let payload = fragment
        .strip_prefix("data: ")
        .unwrap_or(fragment)
        .trim_end();
    serde_json::from_str(payload).unwrap_or_else(|_| panic!("not json: {fragment}"))
}

#[tokio::test]
async fn hello_aggregates_to_a_stop_completion() {
    let service = service(Arc::new(TextHandler("Hello")));
    let response = service
        .handle(&chat_request(json!({
            "messages": [{ "role": "user", "content": "hi" }]
        })))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    let body = full_body(response);
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn split_tool_arguments_reassemble_in_aggregate_mode() {
    let service = service(Arc::new(StreamHandler(vec![
        Ok(AgentEvent::tool_call_chunk("t1", Some("calc".into()), Some("{\"a\":".into())).into()),
        Ok(AgentEvent::tool_call_chunk("t1", None, Some("1}".into())).into()),
    ])));
    let response = service
        .handle(&chat_request(json!({ "messages": [] })))
        .await
        .unwrap();
    let body = full_body(response);
    let call = &body["choices"][0]["message"]["tool_calls"][0];
    assert_eq!(call["id"], "t1");
    assert_eq!(call["function"]["name"], "calc");
    assert_eq!(call["function"]["arguments"], "{\"a\":1}");
    assert_eq!(body["choices"][0]["finish_reason"], "tool_calls");
}

#[tokio::test]
async fn streaming_text_carries_role_once_and_terminates() {
    let service = service(Arc::new(StreamHandler(vec![
        Ok("Hi, ".into()),
        Ok("there".into()),
    ])));
    let response = service
        .handle(&chat_request(json!({
            "messages": [{ "role": "user", "content": "hi" }],
            "stream": true
        })))
        .await
        .unwrap();
    assert_eq!(response.headers["content-type"], "text/event-stream");
    let fragments = sse_fragments(response).await;

    assert_eq!(fragments.last().unwrap(), "data: [DONE]\n\n");
    let first = chunk_json(&fragments[0]);
    assert_eq!(first["object"], "chat.completion.chunk");
    assert_eq!(first["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(first["choices"][0]["delta"]["content"], "Hi, ");
    let second = chunk_json(&fragments[1]);
    assert!(second["choices"][0]["delta"].get("role").is_none());
    let finish = chunk_json(&fragments[fragments.len() - 2]);
    assert_eq!(finish["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn streamed_tool_call_finishes_with_tool_calls_reason() {
    let service = service(Arc::new(StreamHandler(vec![Ok(AgentEvent::tool_call(
        "t1",
        "search",
        "{\"q\":\"rust\"}",
    )
    .into())])));
    let response = service
        .handle(&chat_request(json!({ "messages": [], "stream": true })))
        .await
        .unwrap();
    let fragments = sse_fragments(response).await;

    let intro = chunk_json(&fragments[0]);
    let call = &intro["choices"][0]["delta"]["tool_calls"][0];
    assert_eq!(call["index"], 0);
    assert_eq!(call["id"], "t1");
    assert_eq!(call["function"]["arguments"], "");
    let args = chunk_json(&fragments[1]);
    assert_eq!(
        args["choices"][0]["delta"]["tool_calls"][0]["function"]["arguments"],
        "{\"q\":\"rust\"}"
    );
    let finish = chunk_json(&fragments[fragments.len() - 2]);
    assert_eq!(finish["choices"][0]["finish_reason"], "tool_calls");
}

#[tokio::test]
async fn handler_failure_streams_an_error_chunk_then_done() {
    let service = service(Arc::new(FailingHandler));
    let response = service
        .handle(&chat_request(json!({ "messages": [], "stream": true })))
        .await
        .unwrap();
    let fragments = sse_fragments(response).await;

    assert_eq!(fragments.len(), 2);
    let error = chunk_json(&fragments[0]);
    assert_eq!(error["choices"][0]["finish_reason"], "error");
    assert_eq!(fragments[1], "data: [DONE]\n\n");
}

#[tokio::test]
async fn handler_failure_in_aggregate_mode_is_a_500() {
    let service = service(Arc::new(FailingHandler));
    let response = service
        .handle(&chat_request(json!({ "messages": [] })))
        .await
        .unwrap();
    assert_eq!(response.status, 500);
    let body = full_body(response);
    assert_eq!(body["error"]["message"], "agent blew up");
    assert_eq!(body["error"]["type"], "server_error");
}

#[tokio::test]
async fn missing_messages_is_a_400() {
    let service = service(Arc::new(TextHandler("unused")));
    let response = service
        .handle(&chat_request(json!({ "model": "x" })))
        .await
        .unwrap();
    assert_eq!(response.status, 400);
    let body = full_body(response);
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn models_lists_the_configured_model() {
    let service = service(Arc::new(TextHandler("unused")));
    let response = service
        .handle(&ProtocolRequest::new("GET", "/v1/models"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    let body = full_body(response);
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["id"], "test-model");
    assert_eq!(body["data"][0]["object"], "model");
}

#[tokio::test]
async fn request_model_overrides_the_default_in_chunks() {
    let service = service(Arc::new(StreamHandler(vec![Ok("x".into())])));
    let response = service
        .handle(&chat_request(json!({
            "messages": [],
            "model": "gpt-custom",
            "stream": true
        })))
        .await
        .unwrap();
    let fragments = sse_fragments(response).await;
    assert_eq!(chunk_json(&fragments[0])["model"], "gpt-custom");
}
