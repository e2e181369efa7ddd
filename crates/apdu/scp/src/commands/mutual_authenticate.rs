//! MUTUAL AUTHENTICATE and INTERNAL AUTHENTICATE commands for SCP11
//!
//! Both carry the key agreement control reference template and the OCE
//! ephemeral public key. SCP11a and SCP11c use MUTUAL AUTHENTICATE, SCP11b
//! uses INTERNAL AUTHENTICATE.

use openscp_apdu_core::Apdu;
use p256::{PublicKey, elliptic_curve::sec1::ToEncodedPoint};

use crate::{
    Error, Result,
    constants::{cla, ins, scp, tags},
    keys::{AesAlg, KeyRef, Scp11Variant},
    util::tlv,
};

/// Receipt length, one AES block
pub const RECEIPT_LEN: usize = 16;

/// Key agreement command for one of the SCP11 variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAgreementCommand {
    variant: Scp11Variant,
    sd_key_ref: KeyRef,
    session_key_alg: AesAlg,
    ephemeral_public_key: PublicKey,
}

impl KeyAgreementCommand {
    /// Create the command
    pub const fn new(
        variant: Scp11Variant,
        sd_key_ref: KeyRef,
        session_key_alg: AesAlg,
        ephemeral_public_key: PublicKey,
    ) -> Self {
        Self {
            variant,
            sd_key_ref,
            session_key_alg,
            ephemeral_public_key,
        }
    }

    /// Command data: `A6 {90 95 80 81} || 5F49 {ePK.OCE}`
    pub fn data(&self) -> Result<Vec<u8>> {
        let key_len = self.session_key_alg.key_len() as u8;
        let control_reference = tlv::constructed(
            tags::CONTROL_REFERENCE,
            vec![
                tlv::primitive(tags::SCP_PARAMETERS, &[scp::SCP11, self.variant.parameters()])?,
                tlv::primitive(tags::KEY_USAGE, &[scp::KEY_USAGE])?,
                tlv::primitive(tags::KEY_TYPE, &[scp::KEY_TYPE_AES])?,
                tlv::primitive(tags::KEY_LENGTH, &[key_len])?,
            ],
        )?;

        let point = self.ephemeral_public_key.to_encoded_point(false);
        let ephemeral = tlv::primitive(tags::EPHEMERAL_PUBLIC_KEY, point.as_bytes())?;

        let mut data = control_reference.to_vec();
        data.extend(ephemeral.to_vec());
        Ok(data)
    }

    /// Build the command APDU
    pub fn to_apdu(&self) -> Result<Apdu> {
        let instruction = match self.variant {
            Scp11Variant::B => ins::INTERNAL_AUTHENTICATE,
            Scp11Variant::A | Scp11Variant::C => ins::MUTUAL_AUTHENTICATE,
        };
        Ok(
            Apdu::new(cla::GP, instruction, self.sd_key_ref.version, self.sd_key_ref.id)
                .with_data(self.data()?)
                .with_force_add_le(true),
        )
    }
}

/// Successful key agreement response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAgreementResponse {
    /// ePK.SD.ECKA
    pub ephemeral_public_key: PublicKey,
    /// The `5F49` TLV exactly as received, input to the receipt
    pub ephemeral_tlv: Vec<u8>,
    /// Card receipt
    pub receipt: [u8; RECEIPT_LEN],
}

impl KeyAgreementResponse {
    /// Parse `5F49 {ePK.SD} || 86 {receipt}`
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (ephemeral, ephemeral_tlv, rest) = tlv::next(payload)?;
        if ephemeral.tag().to_bytes() != tags::EPHEMERAL_PUBLIC_KEY.to_be_bytes() {
            return Err(Error::malformed("missing ephemeral public key"));
        }
        let ephemeral_public_key = PublicKey::from_sec1_bytes(tlv::primitive_value(&ephemeral)?)
            .map_err(|_| Error::malformed("ephemeral public key is not a P-256 point"))?;

        let (receipt_tlv, raw, rest) = tlv::next(rest)?;
        if raw.first() != Some(&tags::RECEIPT) || !rest.is_empty() {
            return Err(Error::malformed("expected a single receipt TLV"));
        }
        let receipt = tlv::primitive_value(&receipt_tlv)?
            .try_into()
            .map_err(|_| Error::malformed("receipt length"))?;

        Ok(Self {
            ephemeral_public_key,
            ephemeral_tlv: ephemeral_tlv.to_vec(),
            receipt,
        })
    }
}
