//! GlobalPlatform secure channel engine
//!
//! This crate establishes authenticated, encrypted sessions with a
//! GlobalPlatform security domain over any [`CardTransport`]:
//!
//! - SCP03, symmetric AES keys with an 8 or 16 byte MAC mode
//! - SCP11a, SCP11b and SCP11c, P-256 key agreement with X.509 certificates
//!
//! The main entry point is [`SecurityDomainSession`], which runs the
//! handshake and then wraps every command with C-MAC and C-DECRYPTION and
//! verifies every response with R-MAC and R-ENCRYPTION.
//!
//! ```no_run
//! use openscp::prelude::*;
//!
//! # fn run<T: CardTransport>(transport: T) -> openscp::Result<()> {
//! let key = [0x40u8; 16];
//! let params = Scp03Params::new(KeyRef::new(0x01, 0x30), StaticKeys::new(&key, &key, &key)?);
//!
//! let mut session = SecurityDomainSession::new(transport);
//! session.authenticate(params, ScpMode::S8)?;
//! let response = session.send(&Apdu::new(0x80, 0xCA, 0x00, 0x66).with_le(256))?;
//! println!("{:02X?}", response.payload());
//! session.close();
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod certificate;
pub mod commands;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod mode;
pub mod scp03;
pub mod scp11;
pub mod secure_channel;
pub mod session;

mod util;

// Re-exports
pub use certificate::{CertificateChain, ScpCertificate};
pub use config::SessionConfig;
pub use error::{Error, ProtocolError, Result};
pub use keys::{
    AesAlg, AesKey, KeyRef, OceCredentials, Scp03Params, Scp11Params, Scp11Variant, ScpParams,
    SessionKeys, StaticKeys,
};
pub use mode::ScpMode;
pub use secure_channel::SecureChannel;
pub use session::{SecurityDomainSession, SessionState};

// Re-export from openscp_apdu_core for convenience
pub use openscp_apdu_core::{Apdu, CardTransport, Response, StatusWord, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        AesAlg, Apdu, CardTransport, CertificateChain, Error, KeyRef, OceCredentials, Response,
        Result, Scp03Params, Scp11Params, ScpMode, ScpParams, SecurityDomainSession,
        SessionConfig, SessionState, StaticKeys, StatusWord, TransportError,
    };
}
