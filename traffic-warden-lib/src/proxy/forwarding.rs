use http::{Request, Response, Uri};
use hyper::body::Incoming;
use tracing::debug;

use crate::meter::MeteredBody;
use crate::proxy::client_pool::HttpClient;
use crate::proxy::http_result::{HttpError, HttpResult};

/// Target URI on `upstream` for the path and query of `uri`.
pub fn upstream_uri(uri: &Uri, upstream: &str) -> HttpResult<Uri> {
    let pq = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("http://{upstream}{pq}")
        .parse::<Uri>()
        .map_err(|e| HttpError::InvalidUri(e.to_string()))
}

/// Send a metered request to the upstream and return its raw response.
///
/// The `Host` header of the client request is kept as is.
pub async fn forward(
    req: Request<MeteredBody<Incoming>>,
    upstream: &str,
    client: &HttpClient,
) -> HttpResult<Response<Incoming>> {
    let (mut parts, body) = req.into_parts();
    parts.uri = upstream_uri(&parts.uri, upstream)?;
    // the pooled client speaks HTTP/1.1 to the upstream whatever the client used
    parts.version = http::Version::HTTP_11;

    debug!(uri = %parts.uri, "forwarding to upstream");

    client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(|e| HttpError::FailedToGetResponseFromUpstream(e.to_string()))
}
