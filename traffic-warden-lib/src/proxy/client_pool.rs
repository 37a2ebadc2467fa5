use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::meter::MeteredBody;

/// Upstream client. Request bodies arrive already wrapped by the ingress
/// meter, so the meter sees exactly what is streamed to the upstream.
pub type HttpClient = Client<HttpConnector, MeteredBody<Incoming>>;

/// Shared HTTP/1.1 client pool for upstream connections
///
/// Reuses keep-alive connections instead of opening a new TCP connection
/// for every forwarded request.
#[derive(Clone)]
pub struct ClientPool {
    client: Arc<HttpClient>,
}

impl ClientPool {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(timeouts.connect_ms)));
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_idle_timeout(Duration::from_secs(timeouts.pool_idle_secs));

        Self { client: Arc::new(builder.build(connector)) }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}
