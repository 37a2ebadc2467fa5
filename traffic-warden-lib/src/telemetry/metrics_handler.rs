use http::header::CONTENT_TYPE;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::debug;

use crate::error::{Result, WardenError};

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Scrape response: every warden instrument in the Prometheus text format.
pub fn handle_metrics(registry: &Registry) -> Result<Response<RespBody>> {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    let mut text = Vec::new();
    encoder
        .encode(&families, &mut text)
        .map_err(|e| WardenError::Http(format!("Cannot render warden metrics: {e}")))?;

    debug!(families = families.len(), bytes = text.len(), "Metrics scraped");

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, encoder.format_type())
        .body(Full::new(Bytes::from(text)).map_err(|never| match never {}).boxed())
        .map_err(|e| WardenError::Http(format!("Cannot build metrics scrape response: {e}")))
}
