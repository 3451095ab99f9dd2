use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use portico_contract::{
    AgentHandler, HandlerError, HandlerOutput, HandlerStream, RunRequest, StreamItem,
};
use portico_protocol_ag_ui::AgUiProtocol;
use portico_protocol_openai::OpenAiProtocol;
use portico_runtime::Invoker;
use portico_server::{http, ProtocolRouter};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct GreetingHandler;

#[async_trait]
impl AgentHandler for GreetingHandler {
    async fn handle(&self, request: &RunRequest) -> Result<HandlerOutput, HandlerError> {
        let name = request.last_user_text().unwrap_or("world").to_string();
        let items: Vec<Result<StreamItem, HandlerError>> =
            vec![Ok("Hello, ".into()), Ok(name.into())];
        let stream: HandlerStream = Box::pin(futures::stream::iter(items));
        Ok(HandlerOutput::Stream(stream))
    }
}

fn app() -> axum::Router {
    let invoker = Invoker::new(Arc::new(GreetingHandler));
    let router = ProtocolRouter::new()
        .with_service(Arc::new(
            OpenAiProtocol::new(invoker.clone()).with_model("greeter"),
        ))
        .with_service(Arc::new(AgUiProtocol::new(invoker)));
    http::app(router)
}

fn json_request(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn unknown_paths_return_404_json() {
    let response = app()
        .oneshot(json_request("POST", "/nope", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn models_route_serves_the_static_listing() {
    let response = app()
        .oneshot(Request::builder().uri("/v1/models").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["data"][0]["id"], "greeter");
}

#[tokio::test]
async fn chat_completions_aggregates_the_streamed_greeting() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/v1/chat/completions",
            json!({ "messages": [{ "role": "user", "content": "portico" }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "Hello, portico");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn chat_completions_streams_sse_when_requested() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/v1/chat/completions",
            json!({
                "messages": [{ "role": "user", "content": "portico" }],
                "stream": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let body = body_string(response).await;
    assert!(body.contains("chat.completion.chunk"));
    assert!(body.ends_with("data: [DONE]\n\n"));
}

#[tokio::test]
async fn agui_agent_route_streams_the_run_lifecycle() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/ag-ui/agent",
            json!({
                "threadId": "t1",
                "runId": "r1",
                "messages": [{ "role": "user", "content": "portico" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let body = body_string(response).await;
    assert!(body.contains("\"type\":\"RUN_STARTED\""));
    assert!(body.contains("\"type\":\"TEXT_MESSAGE_CONTENT\""));
    assert!(body.contains("\"type\":\"RUN_FINISHED\""));
    let started = body.find("RUN_STARTED").unwrap();
    let finished = body.find("RUN_FINISHED").unwrap();
    assert!(started < finished);
}

#[tokio::test]
async fn trailing_slash_still_routes() {
    let response = app()
        .oneshot(json_request(
            "POST",
            "/v1/chat/completions/",
            json!({ "messages": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
