use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::error::{Result, WardenError};
use crate::stats::TrafficStats;

type RespBody = BoxBody<Bytes, hyper::Error>;

fn json_response<T: Serialize>(status: StatusCode, value: &T, what: &str) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(value)
        .map_err(|e| WardenError::Http(format!("Failed to serialize {what} response: {e}")))?;

    let body = Full::new(Bytes::from(body_bytes))
        .map_err(|never| match never {})
        .boxed();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| WardenError::Http(format!("Failed to build {what} response: {e}")))
}

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "healthy"}), "health")
}

/// Current traffic statistics as JSON, buckets and clients sorted by key
pub fn stats_response(stats: &TrafficStats) -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &stats.snapshot(), "stats")
}
