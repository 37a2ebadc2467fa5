use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Build a bodyless 4xx/5xx response
pub(crate) fn synthetic_error_response(status_code: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(full_body(Bytes::new()));
    *resp.status_mut() = status_code;
    resp
}

pub(crate) fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}
