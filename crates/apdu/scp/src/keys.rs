//! Key material and authentication parameters

use std::fmt;

use bytes::Bytes;
use derive_more::Display;
use p256::{
    PublicKey, SecretKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey},
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Error, Result, constants::scp};

/// Reference to a key slot on the security domain
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("KID={id:#04x} KVN={version:#04x}")]
pub struct KeyRef {
    /// Key identifier (KID)
    pub id: u8,
    /// Key version number (KVN)
    pub version: u8,
}

impl KeyRef {
    /// Create a new key reference
    pub const fn new(id: u8, version: u8) -> Self {
        Self { id, version }
    }
}

/// AES key of 16, 24 or 32 bytes, wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey(Vec<u8>);

impl AesKey {
    /// Create a key, checking its length
    pub fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 | 24 | 32 => Ok(Self(key.to_vec())),
            _ => Err(Error::Config("AES key must be 16, 24 or 32 bytes")),
        }
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key holds no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key length in bits
    pub fn bits(&self) -> u16 {
        (self.0.len() * 8) as u16
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AesKey(<{} bytes redacted>)", self.0.len())
    }
}

impl TryFrom<&[u8]> for AesKey {
    type Error = Error;

    fn try_from(key: &[u8]) -> Result<Self> {
        Self::new(key)
    }
}

/// AES variant for SCP11 session keys
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AesAlg {
    /// AES-128
    #[display("AES-128")]
    Aes128 = 16,
    /// AES-192
    #[display("AES-192")]
    Aes192 = 24,
    /// AES-256
    #[display("AES-256")]
    Aes256 = 32,
}

impl AesAlg {
    /// Session key length in bytes
    pub const fn key_len(self) -> usize {
        self as usize
    }
}

/// SCP03 static keys
#[derive(Debug, Clone)]
pub struct StaticKeys {
    /// Secure channel encryption key
    pub enc: AesKey,
    /// Secure channel MAC key
    pub mac: AesKey,
    /// Data encryption key
    pub dek: AesKey,
}

impl StaticKeys {
    /// Build static keys from raw bytes
    pub fn new(enc: &[u8], mac: &[u8], dek: &[u8]) -> Result<Self> {
        Ok(Self {
            enc: AesKey::new(enc)?,
            mac: AesKey::new(mac)?,
            dek: AesKey::new(dek)?,
        })
    }
}

/// Parameters for an SCP03 handshake
#[derive(Debug, Clone)]
pub struct Scp03Params {
    /// Key set on the security domain
    pub key_ref: KeyRef,
    /// Static keys of that key set
    pub keys: StaticKeys,
}

impl Scp03Params {
    /// Create SCP03 parameters
    pub const fn new(key_ref: KeyRef, keys: StaticKeys) -> Self {
        Self { key_ref, keys }
    }
}

/// SCP11 protocol variant, selected by the security domain key id
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scp11Variant {
    /// Mutual authentication with a static OCE key
    #[display("SCP11a")]
    A,
    /// Card-only authentication
    #[display("SCP11b")]
    B,
    /// Mutual authentication, precomputable by the OCE
    #[display("SCP11c")]
    C,
}

impl Scp11Variant {
    /// Variant for a security domain key id
    pub const fn from_key_id(id: u8) -> Result<Self> {
        match id {
            scp::KID_SCP11A => Ok(Self::A),
            scp::KID_SCP11B => Ok(Self::B),
            scp::KID_SCP11C => Ok(Self::C),
            _ => Err(Error::Config("SCP11 key id must be 0x11, 0x13 or 0x15")),
        }
    }

    /// Parameter byte of the SCP identifier in the control reference template
    pub const fn parameters(self) -> u8 {
        match self {
            Self::A => 0x01,
            Self::B => 0x00,
            Self::C => 0x03,
        }
    }

    /// Whether the variant authenticates the OCE with a static key
    pub const fn requires_oce(self) -> bool {
        !matches!(self, Self::B)
    }
}

/// Off-card entity key agreement credentials (SCP11a and SCP11c)
#[derive(Clone)]
pub struct OceCredentials {
    /// OCE key reference announced in PERFORM SECURITY OPERATION
    pub key_ref: KeyRef,
    /// SK.OCE.ECKA
    pub secret_key: SecretKey,
    /// CERT.OCE.ECKA chain, leaf last, each entry DER encoded
    pub certificates: Vec<Bytes>,
}

impl OceCredentials {
    /// Create OCE credentials
    pub fn new(key_ref: KeyRef, secret_key: SecretKey, certificates: Vec<Bytes>) -> Self {
        Self {
            key_ref,
            secret_key,
            certificates,
        }
    }

    /// Create OCE credentials from a PKCS#8 DER private key
    pub fn from_pkcs8_der(
        key_ref: KeyRef,
        secret_key_der: &[u8],
        certificates: Vec<Bytes>,
    ) -> Result<Self> {
        let secret_key = SecretKey::from_pkcs8_der(secret_key_der)
            .map_err(|_| Error::Config("OCE private key is not a P-256 PKCS#8 key"))?;
        Ok(Self::new(key_ref, secret_key, certificates))
    }
}

impl fmt::Debug for OceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OceCredentials")
            .field("key_ref", &self.key_ref)
            .field("secret_key", &"<redacted>")
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// Parameters for an SCP11 handshake
#[derive(Debug, Clone)]
pub struct Scp11Params {
    /// SD key reference, its id selects the variant
    pub sd_key_ref: KeyRef,
    /// PK.SD.ECKA, fetched from the certificate bundle when absent
    pub sd_public_key: Option<PublicKey>,
    /// OCE credentials, required for SCP11a/c and absent for SCP11b
    pub oce: Option<OceCredentials>,
    /// Session key length
    pub session_key_alg: AesAlg,
}

impl Scp11Params {
    /// Create SCP11 parameters without OCE credentials
    pub const fn new(sd_key_ref: KeyRef, session_key_alg: AesAlg) -> Self {
        Self {
            sd_key_ref,
            sd_public_key: None,
            oce: None,
            session_key_alg,
        }
    }

    /// Use a known SD public key instead of reading the certificate bundle
    pub fn with_sd_public_key(mut self, public_key: PublicKey) -> Self {
        self.sd_public_key = Some(public_key);
        self
    }

    /// Use a known SD public key given as SubjectPublicKeyInfo DER
    pub fn with_sd_public_key_der(self, spki_der: &[u8]) -> Result<Self> {
        let public_key = PublicKey::from_public_key_der(spki_der)
            .map_err(|_| Error::Config("SD public key is not a P-256 SubjectPublicKeyInfo"))?;
        Ok(self.with_sd_public_key(public_key))
    }

    /// Attach OCE credentials
    pub fn with_oce(mut self, oce: OceCredentials) -> Self {
        self.oce = Some(oce);
        self
    }

    /// SCP11 variant, derived from the SD key id
    pub const fn variant(&self) -> Result<Scp11Variant> {
        Scp11Variant::from_key_id(self.sd_key_ref.id)
    }

    /// Check that the parameters fit the variant
    pub fn validate(&self) -> Result<Scp11Variant> {
        let variant = self.variant()?;
        match (&self.oce, variant.requires_oce()) {
            (None, true) => Err(Error::Config("SCP11a/c need OCE credentials")),
            (Some(oce), true) if oce.certificates.is_empty() => {
                Err(Error::Config("OCE certificate chain is empty"))
            }
            (Some(_), false) => Err(Error::Config("SCP11b takes no OCE credentials")),
            _ => Ok(variant),
        }
    }
}

/// Authentication parameters for either protocol
#[derive(Debug, Clone)]
pub enum ScpParams {
    /// SCP03
    Scp03(Scp03Params),
    /// SCP11
    Scp11(Scp11Params),
}

impl From<Scp03Params> for ScpParams {
    fn from(params: Scp03Params) -> Self {
        Self::Scp03(params)
    }
}

impl From<Scp11Params> for ScpParams {
    fn from(params: Scp11Params) -> Self {
        Self::Scp11(params)
    }
}

/// Session keys produced by a handshake
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// S-ENC
    pub enc: AesKey,
    /// S-MAC
    pub mac: AesKey,
    /// S-RMAC
    pub rmac: AesKey,
    /// Data encryption key: the static DEK for SCP03, derived for SCP11
    pub dek: AesKey,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys").finish_non_exhaustive()
    }
}
