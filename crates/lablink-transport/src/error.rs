/// Errors that can occur in instrument transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the target.
    #[error("failed to connect to {descriptor}: {source}")]
    Connect {
        descriptor: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the connected transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The target descriptor could not be parsed.
    #[error("invalid target descriptor: {descriptor}")]
    InvalidDescriptor { descriptor: String },

    /// The target names no port and no protocol default was supplied.
    #[error("no port specified for {descriptor}")]
    MissingPort { descriptor: String },

    /// The operation needs an open connection.
    #[error("transport is not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
