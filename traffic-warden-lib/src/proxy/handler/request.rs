use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use tracing::{debug, warn};

use crate::monitor::MonitoredRequest;
use crate::proxy::forwarding::forward;
use crate::proxy::handler::abuse::check_abuse;
use crate::proxy::handler::headers::add_forwarded_headers;
use crate::proxy::synthetic_response::synthetic_error_response;
use crate::proxy::ProxyContext;

type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

/// Monitor, then reject or forward one client request.
///
/// Every response sent back, including rejections and synthetic errors, goes
/// through the egress meter of the requesting client.
pub async fn handle_proxy_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    ctx: &ProxyContext,
) -> Response<RespBody> {
    let method = req.method().clone();
    let MonitoredRequest { mut request, client_id, egress, verdict } =
        ctx.monitor.use_monitoring(req, Some(peer));

    if let Some(rejection) = check_abuse(&verdict, &client_id, ctx.action, ctx.metrics.as_ref()) {
        return egress.wrap_response(rejection).map(|b| b.boxed());
    }

    add_forwarded_headers(&mut request, peer);

    match forward(request, &ctx.upstream, ctx.pool.client()).await {
        Ok(resp) => {
            debug!(client = %client_id, %method, status = resp.status().as_u16(), "upstream responded");
            egress.wrap_response(resp).map(|b| b.boxed())
        }
        Err(e) => {
            warn!(client = %client_id, error = %e, error_type = e.error_type(), "forwarding failed");
            let status: StatusCode = e.into();
            egress
                .wrap_response(synthetic_error_response(status))
                .map(|b| b.boxed())
        }
    }
}
