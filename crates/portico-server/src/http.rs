//! Axum transport binding.
//!
//! Converts concrete HTTP requests into the abstract protocol request,
//! feeds the [`ProtocolRouter`], and writes the abstract response back:
//! one payload, or chunk-by-chunk when the body is a stream.

use crate::router::ProtocolRouter;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use portico_contract::{ProtocolRequest, ProtocolResponse, ResponseBody};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::warn;

/// Request bodies above this size are rejected by the binding.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Build the axum application around a protocol router.
pub fn app(router: ProtocolRouter) -> Router {
    Router::new().fallback(dispatch).with_state(router)
}

async fn dispatch(State(router): State<ProtocolRouter>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            return status_response(StatusCode::PAYLOAD_TOO_LARGE);
        }
    };

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let request = ProtocolRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parse_query(parts.uri.query().unwrap_or_default()),
        headers,
        body,
    };

    into_axum_response(router.dispatch(&request).await)
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn into_axum_response(response: ProtocolResponse) -> Response {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    let body = match response.body {
        ResponseBody::Full(text) => Body::from(text),
        ResponseBody::Stream(stream) => {
            Body::from_stream(stream.map(|fragment| Ok::<_, Infallible>(Bytes::from(fragment))))
        }
    };
    builder.body(body).unwrap_or_else(|err| {
        warn!(error = %err, "failed to build http response");
        status_response(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

fn status_response(status: StatusCode) -> Response {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_parse_with_and_without_values() {
        let query = parse_query("a=1&b=&flag&c=x=y");
        assert_eq!(query["a"], "1");
        assert_eq!(query["b"], "");
        assert_eq!(query["flag"], "");
        assert_eq!(query["c"], "x=y");
    }
}
