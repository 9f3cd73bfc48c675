//! Host error types.

use thiserror::Error;

/// Errors that terminate the host loop.
///
/// Everything per-message is answered as data; only these are fatal.
#[derive(Debug, Error)]
pub enum HostError {
    /// Reading or writing the underlying stream failed.
    #[error("transport I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// A response could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message() {
        let err = HostError::Transport(std::io::Error::other("pipe gone"));
        assert!(err.to_string().contains("transport I/O error"));
        assert!(err.to_string().contains("pipe gone"));
    }
}
