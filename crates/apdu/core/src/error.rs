//! Core error type for APDU encoding and parsing
//!
//! Transport failures have their own type, [`TransportError`](crate::transport::TransportError),
//! since they originate outside this crate.

/// Error raised while building or parsing APDUs
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The command cannot be encoded with the available length encoding
    #[error("Invalid command length: data {data} bytes, Le {le}")]
    InvalidCommandLength {
        /// Length of the command data field
        data: usize,
        /// Expected response length
        le: usize,
    },

    /// Response too short or otherwise malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(&'static str),
}

impl Error {
    /// Create a new command length error
    pub const fn command_length(data: usize, le: usize) -> Self {
        Self::InvalidCommandLength { data, le }
    }
}

/// Result type for APDU operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
