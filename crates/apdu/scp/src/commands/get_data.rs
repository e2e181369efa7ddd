//! GET DATA command for the certificate store
//!
//! Reads the certificate bundle (`BF21`) stored for a security domain key.

use openscp_apdu_core::Apdu;

use crate::{
    Result,
    constants::{cla, ins, tags},
    keys::KeyRef,
    util::tlv,
};

/// GET DATA for the certificates of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetCertificatesCommand {
    key_ref: KeyRef,
}

impl GetCertificatesCommand {
    /// Create the command for a key reference
    pub const fn new(key_ref: KeyRef) -> Self {
        Self { key_ref }
    }

    /// Build the command APDU
    pub fn to_apdu(&self) -> Result<Apdu> {
        let [p1, p2] = tags::CERTIFICATE_STORE;
        let key = tlv::primitive(tags::KEY_ID_VERSION, &[self.key_ref.id, self.key_ref.version])?;
        let data = tlv::constructed(tags::CONTROL_REFERENCE, vec![key])?;
        Ok(Apdu::new(cla::GP, ins::GET_DATA, p1, p2)
            .with_data(data.to_vec())
            .with_force_add_le(true))
    }
}
