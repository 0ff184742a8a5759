pub type TransportResult<T, E = TransportError> = Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("send error: {0}")]
    Send(String),

    /// An error the daemon reported back over the wire.
    #[error("{0}")]
    Remote(String),
}
