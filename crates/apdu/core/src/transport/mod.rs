//! Transport traits for APDU communication with cards
//!
//! The transport is the caller-provided link to the secure element: a
//! reader, an embedded SE driver, a simulator or a test double.

pub mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

/// Trait for basic card transports
///
/// A transport is responsible for sending and receiving raw APDU bytes.
/// It has no knowledge of command structure, secure channels, or protocol details.
pub trait CardTransport: Send + fmt::Debug {
    /// Error type returned by the transport
    type Error: Into<TransportError> + fmt::Debug;

    /// Send raw APDU bytes to card and return response bytes
    ///
    /// One blocking exchange. Implementations must not handle GET RESPONSE
    /// or other protocol details.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error>;

    /// Whether the link carries extended length APDUs
    fn is_extended_length_supported(&self) -> bool;

    /// Tear down the link
    ///
    /// Must be safe to call more than once.
    fn close(&mut self);
}
