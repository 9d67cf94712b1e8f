use hyper::body::HttpBody;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::credentials::{parse_bearer, Secret};
use crate::engine::GatewayEngine;
use crate::error::GatewayError;
use crate::input::NumericFields;
use crate::types::ClientIdentity;

/// Largest accepted POST body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state handed to every connection
pub struct AppState {
    pub engine: GatewayEngine,
    pub model_version: String,
}

impl AppState {
    pub fn new(engine: GatewayEngine, model_version: impl Into<String>) -> Self {
        Self {
            engine,
            model_version: model_version.into(),
        }
    }
}

/// Handle incoming HTTP requests
pub async fn handle_request(
    req: Request<Body>,
    remote: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {} from {}", method, path, remote);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/api/risk") | (&Method::POST, "/api/risk") => {
            handle_risk(req, remote, &state).await
        }
        (&Method::GET, "/stats") => handle_stats(&state),
        (&Method::GET, "/metrics") => handle_metrics(&state),
        (&Method::GET, "/health") => handle_health(&state),
        (&Method::GET, "/") => handle_root(&state),
        _ => handle_not_found(&method, &path),
    };

    Ok(response)
}

/// Risk endpoint. Both routes produce the same envelope.
async fn handle_risk(req: Request<Body>, remote: SocketAddr, state: &AppState) -> Response<Body> {
    let credential = bearer_credential(&req);
    let schema = state.engine.schema();

    let parsed = if req.method() == Method::GET {
        let params: HashMap<String, String> = req
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        schema.parse_query(&params)
    } else {
        match read_json_body(req).await {
            Ok(body) => schema.parse_json(&body),
            Err(message) => Err(GatewayError::InvalidInput(message)),
        }
    };

    let input: NumericFields = match parsed {
        Ok(input) => input,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let identity = ClientIdentity::from(remote.ip());
    match state.engine.evaluate(&identity, input, credential.as_ref()) {
        Ok(evaluation) => json_response(
            StatusCode::OK,
            &json!({
                "risk_score": evaluation.output.value,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "model_version": state.model_version,
                "status": "success",
            }),
        ),
        Err(GatewayError::InvalidInput(message)) => {
            error_response(StatusCode::BAD_REQUEST, &format!("Invalid input: {}", message))
        }
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}

fn bearer_credential(req: &Request<Body>) -> Option<Secret> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
}

async fn read_json_body(req: Request<Body>) -> Result<serde_json::Value, String> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > MAX_BODY_BYTES) {
        return Err(format!("body exceeds {} bytes", MAX_BODY_BYTES));
    }

    // Chunked bodies carry no length, so the limit is enforced while reading
    let mut body = req.into_body();
    let mut buffer = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| format!("failed to read body: {}", e))?;
        if buffer.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(format!("body exceeds {} bytes", MAX_BODY_BYTES));
        }
        buffer.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&buffer).map_err(|e| format!("malformed JSON: {}", e))
}

/// Stats endpoint - JSON snapshot.
///
/// Only the block list size is published. Naming members would let a blocked
/// client learn that it is being answered by a decoy.
fn handle_stats(state: &AppState) -> Response<Body> {
    let stats = state.engine.stats();

    let mut body = match serde_json::to_value(&stats) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to serialize stats: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    if let Some(fields) = body.as_object_mut() {
        fields.insert("protection_rate".to_string(), json!(stats.protection_rate()));
    }

    json_response(StatusCode::OK, &body)
}

/// Metrics endpoint - Prometheus text
fn handle_metrics(state: &AppState) -> Response<Body> {
    let mut response = Response::new(Body::from(state.engine.stats().to_prometheus_format()));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}

/// Health check endpoint - JSON response
fn handle_health(state: &AppState) -> Response<Body> {
    let stats = state.engine.stats();
    json_response(
        StatusCode::OK,
        &json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "model_version": state.model_version,
            "uptime_seconds": stats.uptime_secs,
        }),
    )
}

/// Root endpoint - node information
fn handle_root(state: &AppState) -> Response<Body> {
    Response::new(Body::from(format!(
        "Decoy Gate - risk scoring gateway\n\
         Status: Active\n\
         Version: {}\n\
         Model: {}\n\
         Endpoints: GET|POST /api/risk, GET /stats, GET /metrics, GET /health\n",
        env!("CARGO_PKG_VERSION"),
        state.model_version
    )))
}

/// 404 handler
fn handle_not_found(method: &Method, path: &str) -> Response<Body> {
    warn!("404 Not Found: {} {}", method, path);
    let mut response = Response::new(Body::from("404 Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &json!({ "status": "error", "error": message }))
}

/// Serve on an already-bound listener until `shutdown` resolves
pub async fn run<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    listener.set_nonblocking(true)?;
    let local = listener.local_addr()?;

    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let remote = conn.remote_addr();
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                handle_request(req, remote, Arc::clone(&state))
            }))
        }
    });

    info!("Listening on http://{}", local);
    Server::from_tcp(listener)?
        .serve(make_svc)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
