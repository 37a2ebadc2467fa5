pub mod abuse;
pub mod headers;
pub mod request;

pub use abuse::{check_abuse, ABUSE_REASON_HEADER, ABUSE_VERDICT_HEADER};
pub use headers::add_forwarded_headers;
pub use request::handle_proxy_request;
