use thiserror::Error;

/// Errors that can occur outside the accounting engine (config, I/O, HTTP host)
#[derive(Error, Debug)]
pub enum WardenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, WardenError>;
