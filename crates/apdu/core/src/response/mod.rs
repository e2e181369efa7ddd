//! APDU response definitions
//!
//! This module provides the response APDU type according to ISO/IEC 7816-4.

pub mod status;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::{Error, Result};
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data, empty when the card returned only a status word
    payload: Bytes,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Create a success response
    pub const fn success(payload: Bytes) -> Self {
        Self {
            payload,
            status: StatusWord::SUCCESS,
        }
    }

    /// Create a response carrying only a status word
    pub fn status_only(status: impl Into<StatusWord>) -> Self {
        Self {
            payload: Bytes::new(),
            status: status.into(),
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &Bytes) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::InvalidResponse("response shorter than a status word"));
        }

        let split = data.len() - 2;
        let status = StatusWord::new(data[split], data[split + 1]);
        let payload = data.slice(..split);

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self { payload, status })
    }

    /// Response payload without the status word
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the response, returning its payload
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Serialize back to `payload || SW1 SW2`
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload.len() + 2);
        buf.put_slice(&self.payload);
        buf.put_slice(&self.status.to_bytes());
        buf.freeze()
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::from_bytes(&Bytes::copy_from_slice(data))
    }
}

impl TryFrom<Bytes> for Response {
    type Error = Error;

    fn try_from(data: Bytes) -> Result<Self> {
        Self::from_bytes(&data)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        response.to_bytes()
    }
}
