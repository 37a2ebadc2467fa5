use hyper::header::{HeaderValue, HOST};
use hyper::Request;
use std::net::SocketAddr;

use crate::meter::FORWARDED_FOR;

pub const FORWARDED_HOST: &str = "x-forwarded-host";
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Add X-Forwarded-* headers to the request
///
/// Appends the peer IP to X-Forwarded-For (or creates it), copies Host into
/// X-Forwarded-Host and sets X-Forwarded-Proto to "http".
pub fn add_forwarded_headers<B>(req: &mut Request<B>, peer: SocketAddr) {
    let client_ip = peer.ip().to_string();
    let forwarded_for = match req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
    {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        req.headers_mut().insert(FORWARDED_FOR, value);
    }

    if let Some(host) = req.headers().get(HOST).cloned() {
        req.headers_mut().insert(FORWARDED_HOST, host);
    }

    req.headers_mut()
        .insert(FORWARDED_PROTO, HeaderValue::from_static("http"));
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

    #[test]
    fn creates_forwarded_for_from_peer() -> TestResult {
        let mut req = Request::builder()
            .header(HOST, "shop.example")
            .body(())?;
        add_forwarded_headers(&mut req, "10.1.2.3:5555".parse()?);

        assert_eq!(req.headers().get(FORWARDED_FOR).ok_or("missing xff")?, "10.1.2.3");
        assert_eq!(req.headers().get(FORWARDED_HOST).ok_or("missing host")?, "shop.example");
        assert_eq!(req.headers().get(FORWARDED_PROTO).ok_or("missing proto")?, "http");
        Ok(())
    }

    #[test]
    fn appends_to_existing_forwarded_for() -> TestResult {
        let mut req = Request::builder()
            .header(FORWARDED_FOR, "203.0.113.7")
            .body(())?;
        add_forwarded_headers(&mut req, "10.1.2.3:5555".parse()?);

        assert_eq!(
            req.headers().get(FORWARDED_FOR).ok_or("missing xff")?,
            "203.0.113.7, 10.1.2.3"
        );
        Ok(())
    }
}
