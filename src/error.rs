use std::io;
use thiserror::Error;

/// Reasons a request head is rejected. Every variant is answered with 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("connection closed before the end of the request head")]
    Incomplete,

    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),

    #[error("malformed request line")]
    RequestLine,

    #[error("invalid method token")]
    Method,

    #[error("invalid request target")]
    Uri,

    #[error("unsupported protocol version")]
    Version,

    #[error("malformed header line")]
    Header,

    #[error("invalid value for header {0}")]
    HeaderValue(&'static str),
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP parsing error: {0}")]
    Parse(#[from] ParseError),

    #[error("Buffer error: {0}")]
    Buffer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
