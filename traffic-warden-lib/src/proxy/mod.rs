pub mod client_pool;
pub mod connection;
pub mod context;
pub mod forwarding;
pub mod handler;
pub mod http_result;
pub mod server;
pub mod synthetic_response;

pub use client_pool::ClientPool;
pub use context::ProxyContext;
pub use http_result::HttpError;
pub use server::{run, serve};
