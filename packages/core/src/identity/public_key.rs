//! Public key extraction for certificates and private keys
//!
//! Keys are compared by their public components rather than by encoding, so an
//! RSA key matches its certificate whether it was supplied as PKCS#1 or PKCS#8
//! and whatever its size. The public half is read straight out of the private
//! key structure. Only keys that do not carry it (Ed25519, EC keys written
//! without the optional public point) go through a signing backend to derive it.

use rustls::pki_types::{PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer};
use x509_parser::der_parser::ber::{BerObject, BerObjectContent};
use x509_parser::der_parser::der::{Class, Tag, parse_der, parse_der_bitstring};
use x509_parser::oid_registry::{OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use super::types::KeyFormat;

/// Public half of a key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyMaterial {
    /// Big-endian modulus and exponent without leading zero bytes.
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    /// Encoded curve point.
    Ec { point: Vec<u8> },
    /// Any other algorithm, by OID and raw public key bits.
    Other { algorithm: String, key: Vec<u8> },
}

impl PublicKeyMaterial {
    pub(crate) fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Self {
        match spki.parsed() {
            Ok(PublicKey::RSA(rsa)) => Self::rsa(rsa.modulus, rsa.exponent),
            Ok(PublicKey::EC(point)) => Self::Ec {
                point: point.data().to_vec(),
            },
            _ => Self::Other {
                algorithm: spki.algorithm.algorithm.to_id_string(),
                key: spki.subject_public_key.data.to_vec(),
            },
        }
    }

    fn rsa(modulus: &[u8], exponent: &[u8]) -> Self {
        Self::Rsa {
            modulus: unsigned(modulus).to_vec(),
            exponent: unsigned(exponent).to_vec(),
        }
    }

    /// Short algorithm name for log output.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        match self {
            Self::Rsa { .. } => "RSA",
            Self::Ec { .. } => "EC",
            Self::Other { algorithm, .. } => algorithm,
        }
    }
}

/// Public key of a DER private key in the given encoding.
pub(crate) fn from_private_key(format: KeyFormat, der: &[u8]) -> Result<PublicKeyMaterial, String> {
    let stored = match format {
        KeyFormat::Pkcs1 => Some(rsa_public_key(der)?),
        KeyFormat::Sec1 => ec_point(der)?.map(|point| PublicKeyMaterial::Ec { point }),
        KeyFormat::Pkcs8 => pkcs8_public_key(der)?,
    };

    match stored {
        Some(public_key) => Ok(public_key),
        None => derive_with_signer(format, der),
    }
}

/// RSAPrivateKey ::= SEQUENCE { version, modulus, publicExponent, ... }
fn rsa_public_key(der: &[u8]) -> Result<PublicKeyMaterial, String> {
    let fields = sequence(der, "RSA private key")?;
    let [_version, modulus, exponent, ..] = fields.as_slice() else {
        return Err("RSA private key has no modulus and exponent".to_string());
    };

    Ok(PublicKeyMaterial::rsa(
        integer(modulus, "modulus")?,
        integer(exponent, "public exponent")?,
    ))
}

/// ECPrivateKey ::= SEQUENCE { version, privateKey, [0] parameters OPTIONAL, [1] publicKey OPTIONAL }
fn ec_point(der: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let fields = sequence(der, "EC private key")?;
    let Some(tagged) = context_field(fields.get(2..).unwrap_or_default(), 1) else {
        return Ok(None);
    };

    let content = tagged
        .as_slice()
        .map_err(|e| format!("malformed EC public key: {e}"))?;
    let (_, bits) = parse_der_bitstring(content).map_err(|e| format!("malformed EC public key: {e}"))?;
    let point = bits
        .as_slice()
        .map_err(|e| format!("malformed EC public key: {e}"))?;

    Ok(Some(point.to_vec()))
}

/// OneAsymmetricKey ::= SEQUENCE { version, algorithm, privateKey, [0] attributes OPTIONAL, [1] publicKey OPTIONAL }
fn pkcs8_public_key(der: &[u8]) -> Result<Option<PublicKeyMaterial>, String> {
    let fields = sequence(der, "PKCS#8 private key")?;
    let [_version, algorithm, private_key, optional @ ..] = fields.as_slice() else {
        return Err("PKCS#8 private key is truncated".to_string());
    };

    let oid = algorithm
        .as_sequence()
        .ok()
        .and_then(|parts| parts.first())
        .and_then(|oid| oid.as_oid().ok())
        .ok_or_else(|| "PKCS#8 private key has no algorithm identifier".to_string())?;

    if private_key.header.tag() != Tag::OctetString {
        return Err("PKCS#8 private key content is not an OCTET STRING".to_string());
    }
    let private_key = private_key
        .as_slice()
        .map_err(|e| format!("malformed PKCS#8 private key: {e}"))?;

    // [1] IMPLICIT BIT STRING: first content byte is the unused-bit count
    let stored = context_field(optional, 1)
        .and_then(|field| field.as_slice().ok())
        .and_then(|content| content.split_first())
        .map(|(_, key)| key);

    if *oid == OID_PKCS1_RSAENCRYPTION {
        return rsa_public_key(private_key).map(Some);
    }

    if *oid == OID_KEY_TYPE_EC_PUBLIC_KEY {
        let point = match ec_point(private_key)? {
            Some(point) => Some(point),
            None => stored.map(<[u8]>::to_vec),
        };
        return Ok(point.map(|point| PublicKeyMaterial::Ec { point }));
    }

    Ok(stored.map(|key| PublicKeyMaterial::Other {
        algorithm: oid.to_id_string(),
        key: key.to_vec(),
    }))
}

fn derive_with_signer(format: KeyFormat, der: &[u8]) -> Result<PublicKeyMaterial, String> {
    let der = der.to_vec();
    let key_der = match format {
        KeyFormat::Pkcs8 => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)),
        KeyFormat::Pkcs1 => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)),
        KeyFormat::Sec1 => PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)),
    };

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key_der).map_err(|e| {
        format!("key does not embed its public key and could not be loaded to derive it: {e}")
    })?;
    let spki_der = signing_key
        .public_key()
        .ok_or_else(|| format!("could not derive a public key from the {format} key"))?;
    let (_, spki) = SubjectPublicKeyInfo::from_der(spki_der.as_ref())
        .map_err(|e| format!("derived public key is malformed: {e}"))?;

    Ok(PublicKeyMaterial::from_spki(&spki))
}

fn sequence<'a>(der: &'a [u8], what: &str) -> Result<Vec<BerObject<'a>>, String> {
    let (_, object) = parse_der(der).map_err(|e| format!("malformed {what}: {e}"))?;
    match object.content {
        BerObjectContent::Sequence(fields) => Ok(fields),
        _ => Err(format!("malformed {what}: expected a SEQUENCE")),
    }
}

fn integer<'a>(object: &BerObject<'a>, what: &str) -> Result<&'a [u8], String> {
    if object.header.tag() != Tag::Integer {
        return Err(format!("RSA {what} is not an INTEGER"));
    }
    object
        .as_slice()
        .map_err(|e| format!("malformed RSA {what}: {e}"))
}

fn context_field<'b, 'a>(fields: &'b [BerObject<'a>], tag: u32) -> Option<&'b BerObject<'a>> {
    fields
        .iter()
        .find(|f| f.header.class() == Class::ContextSpecific && f.header.tag() == Tag(tag))
}

fn unsigned(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
