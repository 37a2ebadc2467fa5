pub mod guards;

pub use guards::ConnectionGuard;
