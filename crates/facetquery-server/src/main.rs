use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use facetquery_core::{AssemblerConfig, OutputFormat, QueryAssembler, QuerySpec, QuerySpecInput};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
mod metrics;

#[derive(Clone)]
struct AppState {
    assembler: Arc<QueryAssembler>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("FACETQUERY_CONFIG") {
        Ok(path) => {
            let config = AssemblerConfig::load(&path)?;
            info!("loaded assembler config from {}", path);
            config
        }
        Err(_) => AssemblerConfig::default(),
    };
    let state = AppState {
        assembler: Arc::new(QueryAssembler::new(config)),
    };

    let addr: SocketAddr = std::env::var("FACETQUERY_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("http listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/query", post(assemble_query))
        .route("/v1/query/explain", post(explain_query))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn default_suppress() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssembleRequest {
    spec: QuerySpecInput,
    #[serde(default)]
    format: Option<OutputFormat>,
    #[serde(default = "default_suppress")]
    suppress_attachmentless: bool,
}

fn bad_request(msg: String) -> Response {
    metrics::QUERY_ASSEMBLE_TOTAL
        .with_label_values(&["invalid"])
        .inc();
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
}

fn validate(
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> Result<(QuerySpec, OutputFormat, bool), Response> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    let spec = QuerySpec::try_from(req.spec).map_err(|e| bad_request(e.to_string()))?;
    Ok((
        spec,
        req.format.unwrap_or_default(),
        req.suppress_attachmentless,
    ))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn assemble_query(
    State(app): State<AppState>,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> Response {
    let (spec, format, suppress) = match validate(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let timer = metrics::QUERY_ASSEMBLE_SECONDS.start_timer();
    for t in app.assembler.explain(&spec) {
        if let Some(reason) = t.translation.skip_reason() {
            metrics::FILTERS_SKIPPED_TOTAL
                .with_label_values(&[reason.label()])
                .inc();
        }
    }
    let query = app.assembler.assemble(&spec, &format, suppress);
    timer.observe_duration();
    metrics::QUERY_ASSEMBLE_TOTAL.with_label_values(&["ok"]).inc();
    (StatusCode::OK, Json(json!({ "query": query }))).into_response()
}

async fn explain_query(
    State(app): State<AppState>,
    payload: Result<Json<AssembleRequest>, JsonRejection>,
) -> Response {
    let (spec, format, suppress) = match validate(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let fields = app.assembler.explain(&spec);
    let query = app.assembler.assemble(&spec, &format, suppress);
    (
        StatusCode::OK,
        Json(json!({ "fields": fields, "query": query })),
    )
        .into_response()
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buf);
    (StatusCode::OK, String::from_utf8(buf).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState {
            assembler: Arc::new(QueryAssembler::default()),
        })
    }

    async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_assemble_query() {
        let (status, body) = post_json(
            "/v1/query",
            json!({"spec": {
                "searchFields": [{"field": "*", "type": "text", "value": "foo"}],
                "rows": 20,
                "start": 0
            }}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let query = body["query"].as_str().unwrap();
        assert!(query.starts_with("q=*%3A*%20AND%20subject_s%3A*&fq=foo&"));
        assert!(query.ends_with("&facet=on&wt=json"));
    }

    #[tokio::test]
    async fn test_assemble_with_format_and_attachments() {
        let (status, body) = post_json(
            "/v1/query",
            json!({
                "spec": {"rows": 5},
                "format": {"wt": "xml"},
                "suppressAttachmentless": false
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let query = body["query"].as_str().unwrap();
        assert!(query.starts_with("q=*%3A*&sort="));
        assert!(query.ends_with("&wt=xml"));
    }

    #[tokio::test]
    async fn test_cursor_without_id_field_is_bad_request() {
        let (status, body) = post_json(
            "/v1/query",
            json!({"spec": {"rows": 5, "pageStrategy": "cursor"}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("idField"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (status, body) = post_json("/v1/query", json!({"spec": {"rows": "many"}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_explain_lists_skipped_fields() {
        let (status, body) = post_json(
            "/v1/query/explain",
            json!({"spec": {
                "searchFields": [
                    {"field": "year_i", "type": "range", "value": [2001]},
                    {"field": "tags_ss", "type": "list-facet", "value": ["a"]}
                ],
                "rows": 5
            }}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields[0]["field"], "year_i");
        assert_eq!(fields[0]["outcome"], "skipped");
        assert_eq!(fields[0]["reason"], "too_few_bounds");
        assert_eq!(fields[1]["outcome"], "filter");
        assert_eq!(fields[1]["filter"], "tags_ss:(\"a\")");
        assert!(body["query"].as_str().unwrap().contains("fq=tags_ss"));
    }
}
