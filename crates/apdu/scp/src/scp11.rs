//! SCP11 handshake
//!
//! The host presents its certificate chain (SCP11a/c), then sends an
//! ephemeral P-256 key in MUTUAL or INTERNAL AUTHENTICATE. Both sides run two
//! ECDH agreements and the X9.63 KDF; the card proves it derived the same
//! keys with a CMAC receipt over the exchanged key agreement data.

use openscp_apdu_core::Apdu;
use p256::{PublicKey, SecretKey};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::{
    Error, Result,
    commands::{KeyAgreementCommand, KeyAgreementResponse, PerformSecurityOperationCommand},
    constants::scp,
    crypto,
    keys::{AesAlg, AesKey, Scp11Params, Scp11Variant, SessionKeys},
    mode::ScpMode,
    secure_channel::SecureChannel,
};

/// Number of keys produced by the X9.63 KDF: receipt, S-ENC, S-MAC, S-RMAC, DEK
const DERIVED_KEY_COUNT: usize = 5;

/// Split the X9.63 output into the receipt key and the session keys
pub fn derive_session_keys(
    shared_secret: &[u8],
    session_key_alg: AesAlg,
) -> Result<(AesKey, SessionKeys)> {
    let key_len = session_key_alg.key_len();
    let shared_info = [scp::KEY_USAGE, scp::KEY_TYPE_AES, key_len as u8];
    let material = crypto::x963_kdf(shared_secret, &shared_info, key_len * DERIVED_KEY_COUNT);

    let key = |index: usize| AesKey::new(&material[index * key_len..(index + 1) * key_len]);
    let receipt_key = key(0)?;
    let keys = SessionKeys {
        enc: key(1)?,
        mac: key(2)?,
        rmac: key(3)?,
        dek: key(4)?,
    };
    Ok((receipt_key, keys))
}

/// One SCP11 handshake
#[derive(Debug)]
pub struct Scp11Handshake<'a> {
    params: &'a Scp11Params,
    variant: Scp11Variant,
    mode: ScpMode,
    ephemeral: SecretKey,
}

impl<'a> Scp11Handshake<'a> {
    /// Start a handshake with a fresh ephemeral key
    pub fn new(params: &'a Scp11Params, mode: ScpMode) -> Result<Self> {
        Self::with_ephemeral_key(params, mode, crypto::generate_ephemeral_key())
    }

    /// Start a handshake with a fixed ephemeral key
    pub fn with_ephemeral_key(
        params: &'a Scp11Params,
        mode: ScpMode,
        ephemeral: SecretKey,
    ) -> Result<Self> {
        let variant = params.validate()?;
        Ok(Self {
            params,
            variant,
            mode,
            ephemeral,
        })
    }

    /// SCP11 variant
    pub const fn variant(&self) -> Scp11Variant {
        self.variant
    }

    /// PERFORM SECURITY OPERATION commands for the OCE chain, leaf last
    ///
    /// Empty for SCP11b.
    pub fn certificate_commands(&self) -> Vec<Apdu> {
        self.params
            .oce
            .as_ref()
            .map(|oce| {
                PerformSecurityOperationCommand::for_chain(oce.key_ref, &oce.certificates)
                    .iter()
                    .map(PerformSecurityOperationCommand::to_apdu)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// MUTUAL or INTERNAL AUTHENTICATE command
    pub fn key_agreement_command(&self) -> Result<Apdu> {
        KeyAgreementCommand::new(
            self.variant,
            self.params.sd_key_ref,
            self.params.session_key_alg,
            self.ephemeral.public_key(),
        )
        .to_apdu()
    }

    /// Derive the session keys and verify the card receipt
    ///
    /// `command_data` is the data field of the key agreement command that
    /// was sent, `payload` the data of the card's response.
    pub fn authenticate_card(
        &self,
        command_data: &[u8],
        payload: &[u8],
        sd_public_key: &PublicKey,
    ) -> Result<SecureChannel> {
        let response = KeyAgreementResponse::parse(payload)?;

        let static_secret = match (&self.params.oce, self.variant) {
            (Some(oce), Scp11Variant::A | Scp11Variant::C) => &oce.secret_key,
            (None, Scp11Variant::B) => &self.ephemeral,
            _ => return Err(Error::Config("OCE credentials do not match the SCP11 variant")),
        };

        let mut shared_secret = Zeroizing::new(Vec::with_capacity(64));
        shared_secret.extend_from_slice(&crypto::ecdh(
            &self.ephemeral,
            &response.ephemeral_public_key,
        ));
        shared_secret.extend_from_slice(&crypto::ecdh(static_secret, sd_public_key));

        let (receipt_key, keys) = derive_session_keys(&shared_secret, self.params.session_key_alg)?;
        let receipt = crypto::aes_cmac(
            receipt_key.as_bytes(),
            &[command_data, &response.ephemeral_tlv[..]],
        )?;
        if !crypto::ct_eq(&receipt, &response.receipt) {
            warn!(variant = %self.variant, "receipt verification failed");
            return Err(Error::Crypto("receipt verification failed"));
        }

        debug!(variant = %self.variant, "receipt verified");
        Ok(SecureChannel::new(keys, self.mode, receipt))
    }
}
