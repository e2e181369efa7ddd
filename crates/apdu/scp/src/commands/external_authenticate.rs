//! EXTERNAL AUTHENTICATE command for SCP03
//!
//! Completes the SCP03 handshake with the host cryptogram. The command is
//! always sent with a C-MAC, which the secure channel appends.

use bytes::Bytes;
use openscp_apdu_core::Apdu;

use crate::constants::{cla, ins, security_level};

/// EXTERNAL AUTHENTICATE command, before the C-MAC is added
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAuthenticateCommand {
    host_cryptogram: Bytes,
    security_level: u8,
}

impl ExternalAuthenticateCommand {
    /// Command requesting full security (C-MAC, C-DEC, R-MAC, R-ENC)
    pub fn new(host_cryptogram: impl Into<Bytes>) -> Self {
        Self {
            host_cryptogram: host_cryptogram.into(),
            security_level: security_level::FULL,
        }
    }

    /// Build the command APDU carrying only the host cryptogram
    ///
    /// The CLA already has the secure messaging bit set.
    pub fn to_apdu(&self) -> Apdu {
        Apdu::new(
            cla::GP | cla::SECURE_MESSAGING,
            ins::EXTERNAL_AUTHENTICATE,
            self.security_level,
            0x00,
        )
        .with_data(self.host_cryptogram.clone())
    }
}
