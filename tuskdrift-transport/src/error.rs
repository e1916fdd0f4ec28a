use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame encode/decode error: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),

    #[error("invalid frame length: {0}")]
    InvalidFrameLength(usize),

    #[error("connect rejected: {0}")]
    ConnectRejected(String),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("connection closed before response")]
    ConnectionClosed,

    #[error("transport is not ready (state: {0})")]
    NotReady(&'static str),
}

pub type Result<T> = std::result::Result<T, TransportError>;
