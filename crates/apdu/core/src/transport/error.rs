//! Transport failures

use thiserror::Error;

/// Failure of the link to the secure element
///
/// Transports convert their own errors into this type so the session can
/// treat every link failure alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No link to the card, or the link was closed
    #[error("Card link unavailable")]
    Connection,

    /// The exchange failed midway
    #[error("APDU exchange failed")]
    Transmission,

    /// The card was removed or reset during the exchange
    #[error("Card removed or reset")]
    CardRemoved,

    /// No answer in time
    #[error("Card did not answer in time")]
    Timeout,

    /// Transport specific failure
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Wrap a transport specific message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
