//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for talking to a secure element
//! according to ISO/IEC 7816-4:
//!
//! - [`Apdu`] command encoding in short and extended form, plus ISO command chaining
//! - [`Response`] and [`StatusWord`] parsing
//! - the [`CardTransport`] capability that callers implement for their link
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod response;
pub mod transport;

mod error;
pub use error::{Error, Result};

pub use command::Apdu;
pub use response::Response;
pub use response::status::StatusWord;
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Apdu, Bytes, BytesMut, CardTransport, Error, Response, Result, StatusWord, TransportError,
    };
}
