//! Validated CA identity

use std::fmt;

use zeroize::Zeroizing;

use super::public_key::PublicKeyMaterial;

/// Encoding of the supplied private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Pkcs8,
    Pkcs1,
    Sec1,
}

impl KeyFormat {
    pub(crate) fn from_label(label: &str) -> Option<Self> {
        match label {
            "PRIVATE KEY" => Some(Self::Pkcs8),
            "RSA PRIVATE KEY" => Some(Self::Pkcs1),
            "EC PRIVATE KEY" => Some(Self::Sec1),
            _ => None,
        }
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pkcs8 => "PKCS#8",
            Self::Pkcs1 => "PKCS#1",
            Self::Sec1 => "SEC1",
        })
    }
}

/// One certificate from the bundle.
#[derive(Debug, Clone)]
pub struct CertificateEntry {
    pub(crate) subject: String,
    pub(crate) issuer: String,
    pub(crate) serial: String,
    pub(crate) subject_raw: Vec<u8>,
    pub(crate) issuer_raw: Vec<u8>,
    pub(crate) public_key: PublicKeyMaterial,
}

impl CertificateEntry {
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as lowercase hex.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    #[must_use]
    pub fn public_key(&self) -> &PublicKeyMaterial {
        &self.public_key
    }
}

/// The CA private key. PEM text is wiped from memory on drop.
pub struct PrivateKeyMaterial {
    pub(crate) pem: Zeroizing<String>,
    pub(crate) format: KeyFormat,
    pub(crate) public_key: PublicKeyMaterial,
}

impl PrivateKeyMaterial {
    #[must_use]
    pub fn format(&self) -> KeyFormat {
        self.format
    }

    /// Public half, read from or derived from the private key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKeyMaterial {
        &self.public_key
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("format", &self.format)
            .field("algorithm", &self.public_key.algorithm())
            .finish_non_exhaustive()
    }
}

/// One CRL from the chain, with its original PEM block.
#[derive(Debug, Clone)]
pub struct CrlEntry {
    pub(crate) pem: String,
    pub(crate) issuer: String,
    pub(crate) issuer_raw: Vec<u8>,
    pub(crate) revoked_count: usize,
}

impl CrlEntry {
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn revoked_count(&self) -> usize {
        self.revoked_count
    }
}

/// A key, certificate bundle and CRL chain that passed every check.
///
/// Only the loader constructs this; holding one means validation succeeded.
#[derive(Debug)]
pub struct CaIdentity {
    pub(crate) bundle_pem: String,
    pub(crate) ca_certificate: CertificateEntry,
    pub(crate) chain: Vec<CertificateEntry>,
    pub(crate) private_key: PrivateKeyMaterial,
    pub(crate) crls: Vec<CrlEntry>,
}

impl CaIdentity {
    /// The certificate the private key belongs to (first in the bundle).
    #[must_use]
    pub fn ca_certificate(&self) -> &CertificateEntry {
        &self.ca_certificate
    }

    /// All bundle certificates in file order.
    pub fn certificates(&self) -> impl Iterator<Item = &CertificateEntry> {
        std::iter::once(&self.ca_certificate).chain(self.chain.iter())
    }

    #[must_use]
    pub fn certificate_count(&self) -> usize {
        1 + self.chain.len()
    }

    #[must_use]
    pub fn private_key(&self) -> &PrivateKeyMaterial {
        &self.private_key
    }

    #[must_use]
    pub fn crls(&self) -> &[CrlEntry] {
        &self.crls
    }

    /// Bundle text exactly as supplied.
    #[must_use]
    pub fn certificate_pem(&self) -> &str {
        &self.bundle_pem
    }

    /// Key text exactly as supplied.
    #[must_use]
    pub fn private_key_pem(&self) -> &str {
        &self.private_key.pem
    }

    /// Validated CRL blocks joined in chain order.
    #[must_use]
    pub fn crl_pem(&self) -> String {
        let mut out = String::new();
        for crl in &self.crls {
            out.push_str(crl.pem.trim_end());
            out.push('\n');
        }
        out
    }
}
