//! SCP03 handshake
//!
//! INITIALIZE UPDATE announces the host challenge, the card answers with its
//! challenge and cryptogram, and EXTERNAL AUTHENTICATE proves the host holds
//! the same static keys. Session keys come from the SP 800-108 KDF over both
//! challenges.

use openscp_apdu_core::Apdu;
use tracing::{debug, warn};

use crate::{
    Error, Result,
    commands::{ExternalAuthenticateCommand, InitializeUpdateCommand, InitializeUpdateResponse},
    constants::derivation,
    crypto,
    keys::{AesKey, Scp03Params, SessionKeys, StaticKeys},
    mode::ScpMode,
    secure_channel::SecureChannel,
};

/// Derive S-ENC, S-MAC and S-RMAC for a challenge pair
///
/// The static DEK is carried over unchanged.
pub fn derive_session_keys(static_keys: &StaticKeys, context: &[u8]) -> Result<SessionKeys> {
    let enc = crypto::scp03_kdf(
        static_keys.enc.as_bytes(),
        derivation::S_ENC,
        context,
        static_keys.enc.bits(),
    )?;
    let mac = crypto::scp03_kdf(
        static_keys.mac.as_bytes(),
        derivation::S_MAC,
        context,
        static_keys.mac.bits(),
    )?;
    let rmac = crypto::scp03_kdf(
        static_keys.mac.as_bytes(),
        derivation::S_RMAC,
        context,
        static_keys.mac.bits(),
    )?;

    Ok(SessionKeys {
        enc: AesKey::new(&enc)?,
        mac: AesKey::new(&mac)?,
        rmac: AesKey::new(&rmac)?,
        dek: static_keys.dek.clone(),
    })
}

/// Card or host cryptogram
fn cryptogram(
    s_mac: &AesKey,
    constant: u8,
    context: &[u8],
    mode: ScpMode,
) -> Result<Vec<u8>> {
    let value = crypto::scp03_kdf(s_mac.as_bytes(), constant, context, mode.cryptogram_bits())?;
    Ok(value.to_vec())
}

/// One SCP03 handshake, from INITIALIZE UPDATE to EXTERNAL AUTHENTICATE
#[derive(Debug)]
pub struct Scp03Handshake<'a> {
    params: &'a Scp03Params,
    mode: ScpMode,
    host_challenge: Vec<u8>,
}

impl<'a> Scp03Handshake<'a> {
    /// Start a handshake with a fresh random host challenge
    pub fn new(params: &'a Scp03Params, mode: ScpMode) -> Self {
        Self {
            params,
            mode,
            host_challenge: crypto::random_bytes(mode.challenge_len()),
        }
    }

    /// Start a handshake with a fixed host challenge
    pub fn with_host_challenge(
        params: &'a Scp03Params,
        mode: ScpMode,
        host_challenge: &[u8],
    ) -> Result<Self> {
        if host_challenge.len() != mode.challenge_len() {
            return Err(Error::Config("host challenge length does not match the mode"));
        }
        Ok(Self {
            params,
            mode,
            host_challenge: host_challenge.to_vec(),
        })
    }

    /// INITIALIZE UPDATE command
    pub fn initialize_update(&self) -> Apdu {
        InitializeUpdateCommand::new(self.params.key_ref, self.host_challenge.clone()).to_apdu()
    }

    /// Verify the INITIALIZE UPDATE response and prepare EXTERNAL AUTHENTICATE
    ///
    /// Returns the MACed EXTERNAL AUTHENTICATE command and the channel that
    /// becomes active once the card accepts it.
    pub fn authenticate_card(
        &self,
        payload: &[u8],
        extended_supported: bool,
    ) -> Result<(Apdu, SecureChannel)> {
        let response = InitializeUpdateResponse::parse(payload)?;
        if response.mode() != self.mode {
            warn!(requested = %self.mode, reported = %response.mode(), "SCP03 mode mismatch");
            return Err(Error::malformed("card reports a different SCP03 mode"));
        }
        debug!(
            kvn = response.key_version,
            card_challenge = %hex::encode(&response.card_challenge),
            "INITIALIZE UPDATE accepted"
        );

        let mut context = Vec::with_capacity(self.mode.challenge_len() * 2);
        context.extend_from_slice(&self.host_challenge);
        context.extend_from_slice(&response.card_challenge);

        let keys = derive_session_keys(&self.params.keys, &context)?;
        let card_cryptogram =
            cryptogram(&keys.mac, derivation::CARD_CRYPTOGRAM, &context, self.mode)?;
        if !crypto::ct_eq(&card_cryptogram, &response.card_cryptogram) {
            warn!("card cryptogram verification failed");
            return Err(Error::Crypto("card cryptogram verification failed"));
        }

        let host_cryptogram =
            cryptogram(&keys.mac, derivation::HOST_CRYPTOGRAM, &context, self.mode)?;
        let mut channel = SecureChannel::new(keys, self.mode, [0u8; crypto::BLOCK_LEN]);
        let command = channel.mac_only(
            &ExternalAuthenticateCommand::new(host_cryptogram).to_apdu(),
            extended_supported,
        )?;
        debug!("card cryptogram verified");
        Ok((command, channel))
    }
}
