use async_trait::async_trait;
use clap::Parser;
use portico_contract::{
    AgentEvent, AgentHandler, HandlerError, HandlerOutput, HandlerStream, RunRequest, StreamItem,
};
use portico_protocol_ag_ui::AgUiProtocol;
use portico_protocol_openai::OpenAiProtocol;
use portico_runtime::Invoker;
use portico_server::{http, ProtocolRouter};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "portico-server")]
struct Args {
    #[arg(long, env = "PORTICO_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    http_addr: String,

    /// Model id advertised to OpenAI-protocol clients.
    #[arg(long, env = "PORTICO_MODEL", default_value = "portico-demo")]
    model: String,

    #[arg(long, env = "PORTICO_OPENAI_PREFIX", default_value = "/v1")]
    openai_prefix: String,

    #[arg(long, env = "PORTICO_AGUI_PREFIX", default_value = "/ag-ui")]
    agui_prefix: String,
}

/// Demo agent: streams the last user message back word by word, or
/// demonstrates a tool-call round when asked to "search".
struct EchoHandler;

#[async_trait]
impl AgentHandler for EchoHandler {
    async fn handle(&self, request: &RunRequest) -> Result<HandlerOutput, HandlerError> {
        let text = request.last_user_text().unwrap_or_default().to_string();

        if let Some(query) = text.strip_prefix("search ") {
            let query = query.to_string();
            let items: Vec<Result<StreamItem, HandlerError>> = vec![
                Ok(AgentEvent::tool_call(
                    "call_demo_1",
                    "search",
                    serde_json::json!({ "q": query }).to_string(),
                )
                .into()),
                Ok(AgentEvent::tool_result("call_demo_1", "no results in demo mode").into()),
                Ok(StreamItem::Text("Searched for: ".to_string())),
                Ok(StreamItem::Text(query)),
            ];
            let stream: HandlerStream = Box::pin(futures::stream::iter(items));
            return Ok(HandlerOutput::Stream(stream));
        }

        let items: Vec<Result<StreamItem, HandlerError>> = text
            .split_inclusive(' ')
            .map(|word| Ok(StreamItem::Text(word.to_string())))
            .collect();
        let stream: HandlerStream = Box::pin(futures::stream::iter(items));
        Ok(HandlerOutput::Stream(stream))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let invoker = Invoker::new(Arc::new(EchoHandler));
    let router = ProtocolRouter::new()
        .with_service(Arc::new(
            OpenAiProtocol::new(invoker.clone())
                .with_prefix(&args.openai_prefix)
                .with_model(&args.model),
        ))
        .with_service(Arc::new(
            AgUiProtocol::new(invoker).with_prefix(&args.agui_prefix),
        ));

    let app = http::app(router).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .expect("failed to bind http listener");
    info!(addr = %args.http_addr, "portico server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("http server crashed");
}
