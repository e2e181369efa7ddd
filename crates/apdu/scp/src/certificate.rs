//! Security domain certificate bundles
//!
//! GET DATA `BF21` returns the X.509 certificates stored for a key, either
//! concatenated or wrapped in a `BF21` TLV. The SD key agreement certificate
//! is picked from the bundle by its structure, not by its position.

use bytes::Bytes;
use derive_more::Deref;
use p256::PublicKey;
use tracing::debug;
use x509_parser::{oid_registry::OID_KEY_TYPE_EC_PUBLIC_KEY, prelude::*};

use crate::{
    Error, ProtocolError, Result,
    constants::tags,
    util::tlv,
};

/// One X.509 certificate of a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpCertificate {
    der: Bytes,
    subject: Vec<u8>,
    issuer: Vec<u8>,
    is_ca: bool,
    key_agreement: Option<bool>,
    public_key: Option<PublicKey>,
}

impl ScpCertificate {
    /// Parse a single DER encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (rest, cert) = X509Certificate::from_der(der)
            .map_err(|_| Error::malformed("invalid X.509 certificate"))?;
        if !rest.is_empty() {
            return Err(Error::malformed("trailing data after certificate"));
        }
        Self::from_parsed(der, &cert)
    }

    fn from_parsed(der: &[u8], cert: &X509Certificate<'_>) -> Result<Self> {
        let is_ca = cert
            .basic_constraints()
            .map_err(|_| Error::malformed("invalid basic constraints extension"))?
            .is_some_and(|ext| ext.value.ca);
        let key_agreement = cert
            .key_usage()
            .map_err(|_| Error::malformed("invalid key usage extension"))?
            .map(|ext| ext.value.key_agreement());

        let spki = cert.public_key();
        let public_key = (spki.algorithm.algorithm == OID_KEY_TYPE_EC_PUBLIC_KEY)
            .then(|| PublicKey::from_sec1_bytes(&spki.subject_public_key.data).ok())
            .flatten();

        Ok(Self {
            der: Bytes::copy_from_slice(der),
            subject: cert.subject().as_raw().to_vec(),
            issuer: cert.issuer().as_raw().to_vec(),
            is_ca,
            key_agreement,
            public_key,
        })
    }

    /// DER encoding
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Whether BasicConstraints marks the certificate as a CA
    pub const fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Whether the key may be used for key agreement
    ///
    /// Certificates without a KeyUsage extension are not restricted.
    pub fn allows_key_agreement(&self) -> bool {
        self.key_agreement.unwrap_or(true)
    }

    /// Whether this certificate's subject issued `other`
    pub fn issued(&self, other: &Self) -> bool {
        self.subject == other.issuer
    }

    /// P-256 public key from the SubjectPublicKeyInfo
    pub fn public_key(&self) -> Result<PublicKey> {
        self.public_key.ok_or(Error::Protocol(ProtocolError::UnsupportedCertificate(
            "certificate key is not a P-256 EC key",
        )))
    }
}

/// Certificates returned for one security domain key
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct CertificateChain(Vec<ScpCertificate>);

impl CertificateChain {
    /// Parse the data of a GET DATA `BF21` response
    pub fn from_bundle(data: &[u8]) -> Result<Self> {
        let mut rest = if data.starts_with(&tags::CERTIFICATE_STORE) {
            let (value, trailing) = tlv::take_long_tag(tags::CERTIFICATE_STORE, data)
                .ok_or(Error::malformed("truncated certificate store"))?;
            if !trailing.is_empty() {
                return Err(Error::malformed("trailing data after certificate store"));
            }
            value
        } else {
            data
        };

        if rest.is_empty() {
            return Err(Error::malformed("empty certificate bundle"));
        }

        let mut certificates = Vec::new();
        while !rest.is_empty() {
            if rest.starts_with(&tags::GP_CERTIFICATE) {
                return Err(Error::Protocol(ProtocolError::UnsupportedCertificate(
                    "GlobalPlatform certificates are not supported",
                )));
            }
            if rest[0] != tags::SEQUENCE {
                return Err(Error::malformed("expected an X.509 certificate"));
            }

            let (remaining, cert) = X509Certificate::from_der(rest)
                .map_err(|_| Error::malformed("invalid X.509 certificate"))?;
            let der = &rest[..rest.len() - remaining.len()];
            certificates.push(ScpCertificate::from_parsed(der, &cert)?);
            rest = remaining;
        }

        debug!(count = certificates.len(), "parsed certificate bundle");
        Ok(Self(certificates))
    }

    /// The SD key agreement certificate
    ///
    /// This is the single certificate that is not a CA, issued no other
    /// certificate of the bundle and allows key agreement.
    pub fn security_domain_certificate(&self) -> Result<&ScpCertificate> {
        let mut candidates = self.0.iter().enumerate().filter(|(index, cert)| {
            !cert.is_ca()
                && cert.allows_key_agreement()
                && !self
                    .0
                    .iter()
                    .enumerate()
                    .any(|(other_index, other)| other_index != *index && cert.issued(other))
        });

        match (candidates.next(), candidates.next()) {
            (Some((_, cert)), None) => Ok(cert),
            (None, _) => Err(Error::Protocol(ProtocolError::UnsupportedCertificate(
                "no key agreement certificate in bundle",
            ))),
            (Some(_), Some(_)) => Err(Error::Protocol(ProtocolError::UnsupportedCertificate(
                "several key agreement certificates in bundle",
            ))),
        }
    }

    /// PK.SD.ECKA from the SD key agreement certificate
    pub fn security_domain_public_key(&self) -> Result<PublicKey> {
        self.security_domain_certificate()?.public_key()
    }
}
