use lablink_transport::TransportError;

/// Errors that can occur in adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The receive loop died on a transport error. Every fragment that made
    /// it across beforehand has already been delivered or deferred.
    #[error("connection lost: {source}")]
    ConnectionLost {
        #[source]
        source: TransportError,
    },

    /// The remote end closed the connection in an orderly way.
    #[error("connection closed by remote end")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
