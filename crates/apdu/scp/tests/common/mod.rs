//! Shared test helpers: a scripted transport and fixture loading

#![allow(dead_code, unreachable_pub)]

use std::collections::VecDeque;

use bytes::Bytes;
use openscp::{AesAlg, KeyRef, OceCredentials, Scp03Params, Scp11Params, StaticKeys};
use openscp::{CardTransport, TransportError};
use p256::SecretKey;

pub const STATIC_KEY: [u8; 16] = hex_literal::hex!("404142434445464748494a4b4c4d4e4f");

pub const SD_CA: &[u8] = include_bytes!("../data/sd_ca.der");
pub const SD_ECKA: &[u8] = include_bytes!("../data/sd_ecka.der");
pub const SD_SIGN_ONLY: &[u8] = include_bytes!("../data/sd_sign_only.der");
pub const OCE_CA: &[u8] = include_bytes!("../data/oce_ca.der");
pub const OCE_ECKA: &[u8] = include_bytes!("../data/oce_ecka.der");
pub const PK_SD: &[u8] = include_bytes!("../data/pk_sd_ecka.spki.der");
pub const SK_OCE: &[u8] = include_bytes!("../data/sk_oce_ecka.pk8.der");

/// Transport that replays canned card responses and records every command
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub commands: Vec<Vec<u8>>,
    pub responses: VecDeque<Vec<u8>>,
    pub extended: bool,
    pub closed: usize,
}

impl ScriptedTransport {
    pub fn new<I, R>(responses: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        Self {
            responses: responses.into_iter().map(|r| r.as_ref().to_vec()).collect(),
            ..Default::default()
        }
    }

    pub fn with_extended_length(mut self) -> Self {
        self.extended = true;
        self
    }

    pub fn push_response(&mut self, response: impl AsRef<[u8]>) {
        self.responses.push_back(response.as_ref().to_vec());
    }
}

impl CardTransport for ScriptedTransport {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        self.commands.push(command.to_vec());
        self.responses
            .pop_front()
            .map(Bytes::from)
            .ok_or(TransportError::Timeout)
    }

    fn is_extended_length_supported(&self) -> bool {
        self.extended
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}

/// Install a subscriber so `RUST_LOG=debug` shows the session's events
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn scp03_params() -> Scp03Params {
    Scp03Params::new(
        KeyRef::new(0x01, 0x30),
        StaticKeys::new(&STATIC_KEY, &STATIC_KEY, &STATIC_KEY).unwrap(),
    )
}

pub fn oce_credentials() -> OceCredentials {
    OceCredentials::from_pkcs8_der(
        KeyRef::new(0x10, 0x03),
        SK_OCE,
        vec![Bytes::from_static(OCE_CA), Bytes::from_static(OCE_ECKA)],
    )
    .unwrap()
}

pub fn scp11_params(kid: u8, alg: AesAlg) -> Scp11Params {
    let params = Scp11Params::new(KeyRef::new(kid, 0x03), alg);
    if kid == 0x13 {
        params
    } else {
        params.with_oce(oce_credentials())
    }
}

/// OCE ephemeral key with the fixed scalar 0xE0CE
pub fn ephemeral_oce() -> SecretKey {
    let mut scalar = [0u8; 32];
    scalar[30] = 0xE0;
    scalar[31] = 0xCE;
    SecretKey::from_slice(&scalar).unwrap()
}

pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}
