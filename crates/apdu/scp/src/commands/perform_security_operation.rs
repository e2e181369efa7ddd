//! PERFORM SECURITY OPERATION command
//!
//! Presents one certificate of the OCE chain to the security domain during
//! SCP11a and SCP11c handshakes.

use bytes::Bytes;
use openscp_apdu_core::Apdu;

use crate::{
    constants::{cla, ins},
    keys::KeyRef,
};

/// P2 bit marking that more certificates follow
const MORE_CERTIFICATES: u8 = 0x80;

/// PERFORM SECURITY OPERATION carrying one OCE certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformSecurityOperationCommand {
    oce_key_ref: KeyRef,
    certificate: Bytes,
    last: bool,
}

impl PerformSecurityOperationCommand {
    /// Create the command for one certificate of the chain
    pub fn new(oce_key_ref: KeyRef, certificate: impl Into<Bytes>, last: bool) -> Self {
        Self {
            oce_key_ref,
            certificate: certificate.into(),
            last,
        }
    }

    /// One command per certificate, leaf last
    pub fn for_chain(oce_key_ref: KeyRef, certificates: &[Bytes]) -> Vec<Self> {
        certificates
            .iter()
            .enumerate()
            .map(|(index, cert)| Self::new(oce_key_ref, cert.clone(), index + 1 == certificates.len()))
            .collect()
    }

    /// Build the command APDU
    pub fn to_apdu(&self) -> Apdu {
        let p2 = if self.last {
            self.oce_key_ref.id
        } else {
            self.oce_key_ref.id | MORE_CERTIFICATES
        };
        Apdu::new(cla::GP, ins::PERFORM_SECURITY_OPERATION, self.oce_key_ref.version, p2)
            .with_data(self.certificate.clone())
    }
}
