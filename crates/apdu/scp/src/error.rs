use openscp_apdu_core::StatusWord;
use thiserror::Error;

use crate::session::SessionState;

/// Result type for secure channel operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for secure channel operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The underlying exchange failed
    #[error(transparent)]
    Transport(#[from] openscp_apdu_core::TransportError),

    /// The card answered with an unexpected status or malformed data
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Cryptogram, MAC or receipt verification failed, or decryption failed
    #[error("Cryptographic error: {0}")]
    Crypto(&'static str),

    /// The operation is not allowed in the current session state
    #[error("{operation} not allowed in session state {state}")]
    InvalidState {
        /// Rejected operation
        operation: &'static str,
        /// State the session was in
        state: SessionState,
    },

    /// Key material or parameters are unusable
    #[error("Configuration error: {0}")]
    Config(&'static str),

    /// The command cannot be encoded for this transport
    #[error(transparent)]
    Apdu(#[from] openscp_apdu_core::Error),
}

impl Error {
    /// Whether this error ends the session
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_) | Self::Crypto(_))
    }

    pub(crate) const fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }

    pub(crate) const fn unexpected_status(command: &'static str, status: StatusWord) -> Self {
        Self::Protocol(ProtocolError::UnexpectedStatus { command, status })
    }

    pub(crate) const fn malformed(message: &'static str) -> Self {
        Self::Protocol(ProtocolError::Malformed(message))
    }
}

/// Protocol-level failures reported by or about the card
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A command answered with a status other than the expected one
    #[error("{command} failed with status {status} ({})", .status.description())]
    UnexpectedStatus {
        /// Command name
        command: &'static str,
        /// Status word returned
        status: StatusWord,
    },

    /// The response data does not have the expected structure
    #[error("Malformed response: {0}")]
    Malformed(&'static str),

    /// A certificate in the bundle cannot be used
    #[error("Unsupported certificate: {0}")]
    UnsupportedCertificate(&'static str),

    /// The card kept answering 61xx past the configured limit
    #[error("GET RESPONSE limit exceeded")]
    GetResponseLimit,

    /// The card rejected a block of a chained command
    #[error("Command chaining interrupted with status {0}")]
    ChainingInterrupted(StatusWord),
}

impl From<openscp_apdu_core::Error> for ProtocolError {
    fn from(error: openscp_apdu_core::Error) -> Self {
        match error {
            openscp_apdu_core::Error::InvalidResponse(message) => Self::Malformed(message),
            openscp_apdu_core::Error::InvalidCommandLength { .. } => {
                Self::Malformed("command length")
            }
        }
    }
}
