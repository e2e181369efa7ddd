//! Secure messaging for an established SCP03 or SCP11 session
//!
//! Both protocols protect commands and responses the same way once the
//! handshake has produced session keys: C-MAC and C-DECRYPTION on commands,
//! R-MAC and R-ENCRYPTION on responses.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use openscp_apdu_core::{
    Apdu, Response,
    command::{EXTENDED_MAX_DATA, put_lc, requires_extended_length},
};
use tracing::{trace, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Error, Result,
    constants::cla,
    crypto::{self, Block},
    keys::SessionKeys,
    mode::ScpMode,
};

/// Prefix of the counter block that yields the response ICV
const RESPONSE_ICV_PREFIX: u8 = 0x80;

/// Chaining value, header and the longest Lc
const MAC_HEADER_LEN: usize = crypto::BLOCK_LEN + 4 + 3;

/// Secure channel state: session keys, MAC chaining value and counter
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureChannel {
    keys: SessionKeys,
    #[zeroize(skip)]
    mode: ScpMode,
    mac_chain: Block,
    counter: u32,
}

impl fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("mode", &self.mode)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl SecureChannel {
    /// Create a channel with an initial chaining value
    ///
    /// The encryption counter starts at 1.
    pub const fn new(keys: SessionKeys, mode: ScpMode, mac_chain: Block) -> Self {
        Self {
            keys,
            mode,
            mac_chain,
            counter: 1,
        }
    }

    /// MAC mode of the channel
    pub const fn mode(&self) -> ScpMode {
        self.mode
    }

    /// Encryption counter for the next command
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Current MAC chaining value
    pub const fn mac_chain(&self) -> &Block {
        &self.mac_chain
    }

    #[cfg(test)]
    pub(crate) const fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Add a C-MAC to a command without encrypting it or advancing the counter
    ///
    /// Used for EXTERNAL AUTHENTICATE, which is MACed but never encrypted.
    pub fn mac_only(&mut self, command: &Apdu, extended_supported: bool) -> Result<Apdu> {
        let cla = command.cla | cla::SECURE_MESSAGING;
        let (wrapped, chain) = self.compute_mac(command, cla, &command.data, extended_supported)?;
        self.mac_chain = chain;
        Ok(wrapped)
    }

    /// Protect a command with C-DECRYPTION and C-MAC
    ///
    /// The channel state is left untouched when the command cannot be
    /// encoded for the transport.
    pub fn wrap(&mut self, command: &Apdu, extended_supported: bool) -> Result<Apdu> {
        let next_counter = self
            .counter
            .checked_add(1)
            .ok_or(Error::Crypto("encryption counter exhausted"))?;

        let encrypted = if command.data.is_empty() {
            Bytes::new()
        } else {
            let icv = crypto::aes_ecb_encrypt(
                self.keys.enc.as_bytes(),
                &crypto::counter_block(0x00, self.counter),
            )?;
            Bytes::from(crypto::aes_cbc_encrypt(
                self.keys.enc.as_bytes(),
                &icv,
                &command.data,
            )?)
        };

        let cla = command.cla | cla::SECURE_MESSAGING;
        let (wrapped, chain) = self.compute_mac(command, cla, &encrypted, extended_supported)?;

        trace!(counter = self.counter, "wrapped {}", wrapped);
        self.mac_chain = chain;
        self.counter = next_counter;
        Ok(wrapped)
    }

    /// Verify the R-MAC of a response and decrypt its data
    ///
    /// Responses with an error status carry neither R-MAC nor data and are
    /// returned as they are.
    pub fn unwrap(&mut self, response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() && !status.is_warning() {
            if response.payload().is_empty() {
                return Ok(response);
            }
            warn!(%status, "response data under an error status");
            return Err(Error::Crypto("unauthenticated data under an error status"));
        }

        let body = response.payload();
        let mac_len = self.mode.mac_len();
        if body.len() < mac_len {
            warn!(%status, "response too short for an R-MAC");
            return Err(Error::Crypto("response too short for an R-MAC"));
        }

        let (data, rmac) = body.split_at(body.len() - mac_len);
        let expected = crypto::aes_cmac(
            self.keys.rmac.as_bytes(),
            &[&self.mac_chain[..], data, &status.to_bytes()[..]],
        )?;
        if !crypto::ct_eq(&expected[..mac_len], rmac) {
            warn!(%status, "R-MAC verification failed");
            return Err(Error::Crypto("R-MAC verification failed"));
        }

        if data.is_empty() {
            return Ok(Response::status_only(status));
        }

        // The response belongs to the command that advanced the counter
        let icv = crypto::aes_ecb_encrypt(
            self.keys.enc.as_bytes(),
            &crypto::counter_block(RESPONSE_ICV_PREFIX, self.counter.wrapping_sub(1)),
        )?;
        let plain = crypto::aes_cbc_decrypt(self.keys.enc.as_bytes(), &icv, data)?;
        Ok(Response::new(plain, status))
    }

    /// MAC `command` with `data` as its data field, returning the protected
    /// command and the new chaining value
    fn compute_mac(
        &self,
        command: &Apdu,
        cla: u8,
        data: &Bytes,
        extended_supported: bool,
    ) -> Result<(Apdu, Block)> {
        let mac_len = self.mode.mac_len();
        let wrapped_len = data.len() + mac_len;
        let extended = requires_extended_length(wrapped_len, command.le);
        if wrapped_len > EXTENDED_MAX_DATA || (extended && !extended_supported) {
            return Err(openscp_apdu_core::Error::command_length(wrapped_len, command.le).into());
        }

        let mut mac_input = BytesMut::with_capacity(MAC_HEADER_LEN + data.len());
        mac_input.put_slice(&self.mac_chain);
        mac_input.put_slice(&[cla, command.ins, command.p1, command.p2]);
        put_lc(&mut mac_input, wrapped_len, extended)?;
        mac_input.put_slice(data);
        let chain = crypto::aes_cmac(self.keys.mac.as_bytes(), &[&mac_input[..]])?;

        let mut wrapped_data = BytesMut::with_capacity(wrapped_len);
        wrapped_data.put_slice(data);
        wrapped_data.put_slice(&chain[..mac_len]);

        let wrapped = Apdu {
            cla,
            data: wrapped_data.freeze(),
            ..command.clone()
        };
        Ok((wrapped, chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::AesKey;
    use hex_literal::hex;
    use openscp_apdu_core::StatusWord;

    fn scp03_s8_keys() -> SessionKeys {
        SessionKeys {
            enc: AesKey::new(&hex!("8aac6b39a7c426423400d8b5d9c0adc3")).unwrap(),
            mac: AesKey::new(&hex!("a2e96754f593e7e80e695bec50a24283")).unwrap(),
            rmac: AesKey::new(&hex!("983882695ee1ac61743415ab536ce1be")).unwrap(),
            dek: AesKey::new(&[0x40; 16]).unwrap(),
        }
    }

    /// Channel right after EXTERNAL AUTHENTICATE
    fn authenticated_channel() -> SecureChannel {
        let mut channel = SecureChannel::new(scp03_s8_keys(), ScpMode::S8, [0u8; 16]);
        let ext_auth = Apdu::new(0x84, 0x82, 0x33, 0x00).with_data(hex!("c28a6a8b99435e37").to_vec());
        let wrapped = channel.mac_only(&ext_auth, false).unwrap();
        assert_eq!(
            wrapped.to_bytes(false).unwrap().as_ref(),
            hex!("8482330010c28a6a8b99435e37773690b204fd7f24")
        );
        assert_eq!(channel.counter(), 1);
        channel
    }

    #[test]
    fn test_wrap_and_unwrap_sequence() {
        let mut channel = authenticated_channel();

        let get_data = Apdu::new(0x80, 0xCA, 0x00, 0x66).with_le(256);
        let wrapped = channel.wrap(&get_data, false).unwrap();
        assert_eq!(
            wrapped.to_bytes(false).unwrap().as_ref(),
            hex!("84ca00660810db707888fcde3300")
        );
        assert_eq!(channel.counter(), 2);

        let response = Response::new(
            hex!("d78117d1e6c7b0d9c83e246e55e887d9c3fbc6273d3643ae").to_vec(),
            StatusWord::new(0x90, 0x00),
        );
        let plain = channel.unwrap(response).unwrap();
        assert_eq!(plain.payload(), hex!("6601aa"));

        let store = Apdu::new(0x80, 0xE2, 0x90, 0x00).with_data(hex!("0102030405").to_vec());
        let wrapped = channel.wrap(&store, false).unwrap();
        assert_eq!(
            wrapped.to_bytes(false).unwrap().as_ref(),
            hex!("84e290001860673033da340f87e911b2dd7dda581d3bc8cd7a5dcf06f6")
        );

        let response = Response::new(hex!("546f44930a01e8c4").to_vec(), StatusWord::new(0x90, 0x00));
        let plain = channel.unwrap(response).unwrap();
        assert!(plain.payload().is_empty());
        assert!(plain.is_success());
    }

    #[test]
    fn test_tampered_rmac() {
        let mut channel = authenticated_channel();
        channel
            .wrap(&Apdu::new(0x80, 0xCA, 0x00, 0x66).with_le(256), false)
            .unwrap();

        let response = Response::new(
            hex!("d78117d1e6c7b0d9c83e246e55e887d9c3fbc6273d3643af").to_vec(),
            StatusWord::new(0x90, 0x00),
        );
        assert_eq!(
            channel.unwrap(response),
            Err(Error::Crypto("R-MAC verification failed"))
        );
    }

    #[test]
    fn test_error_status_passthrough() {
        let mut channel = authenticated_channel();
        channel
            .wrap(&Apdu::new(0x80, 0xCA, 0x00, 0x66).with_le(256), false)
            .unwrap();

        let response = Response::status_only(StatusWord::new(0x6A, 0x88));
        assert_eq!(channel.unwrap(response.clone()), Ok(response));

        let response = Response::new(vec![0x01, 0x02], StatusWord::new(0x6A, 0x88));
        assert!(matches!(channel.unwrap(response), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_oversized_wrap_leaves_state() {
        let mut channel = authenticated_channel();
        let chain = *channel.mac_chain();

        let large = Apdu::new(0x80, 0xE2, 0x90, 0x00).with_data((0..250u8).collect::<Vec<_>>());
        let err = channel.wrap(&large, false).unwrap_err();
        assert!(matches!(err, Error::Apdu(_)));
        assert!(!err.is_fatal());
        assert_eq!(channel.counter(), 1);
        assert_eq!(channel.mac_chain(), &chain);

        let wrapped = channel.wrap(&large, true).unwrap();
        let bytes = wrapped.to_bytes(true).unwrap();
        assert_eq!(&bytes[..7], &hex!("84e29000000108"));
        assert_eq!(&bytes[bytes.len() - 8..], &hex!("c1dd3fdd0889f2b0"));
        assert_eq!(channel.counter(), 2);
    }

    #[test]
    fn test_debug_hides_keys() {
        let channel = authenticated_channel();
        let debug = format!("{channel:?}");
        assert!(!debug.contains("8aac"));
        assert!(debug.contains("S8"));
    }
}
