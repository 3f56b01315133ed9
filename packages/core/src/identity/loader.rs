//! Load the key, certificate bundle and CRL chain as one CA identity
//!
//! Every check runs regardless of what earlier checks found, so a single call
//! reports all problems with the supplied material. Checks that need a
//! prerequisite (for example the key/certificate comparison needs both a key
//! and a certificate) are skipped when that prerequisite already failed.

use std::path::Path;

use x509_parser::prelude::*;
use zeroize::Zeroizing;

use super::pem_blocks::{PemBlock, split_blocks};
use super::public_key::{self, PublicKeyMaterial};
use super::types::{CaIdentity, CertificateEntry, CrlEntry, KeyFormat, PrivateKeyMaterial};
use crate::error::{ErrorList, ImportError, StageResult};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const CRL_LABEL: &str = "X509 CRL";
const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Load and cross-validate the three inputs.
///
/// # Errors
///
/// Returns every validation problem found across all three inputs. No
/// partially validated identity is ever returned.
pub fn load(bundle_path: &Path, key_path: &Path, crl_chain_path: &Path) -> StageResult<CaIdentity> {
    let mut errors = ErrorList::new();

    let bundle_bytes = read_input(bundle_path, &mut errors);
    let key_bytes = read_input(key_path, &mut errors);
    let crl_bytes = read_input(crl_chain_path, &mut errors);

    let (bundle_text, bundle) = match bundle_bytes {
        None => (None, ParsedBundle::default()),
        Some(bytes) => {
            let text = decode_text(bytes, &mut errors, |reason| ImportError::UnparseablePem {
                path: bundle_path.to_path_buf(),
                index: 1,
                reason,
            });
            match text {
                Some(text) => {
                    let bundle = parse_certificates(bundle_path, &text, &mut errors);
                    (Some(text), bundle)
                }
                None => {
                    errors.push(ImportError::EmptyCertBundle {
                        path: bundle_path.to_path_buf(),
                    });
                    (None, ParsedBundle::default())
                }
            }
        }
    };

    let private_key = key_bytes
        .and_then(|bytes| {
            decode_text(bytes, &mut errors, |reason| ImportError::InvalidKeyMaterial {
                path: key_path.to_path_buf(),
                reason,
            })
        })
        .and_then(|text| parse_private_key(key_path, text, &mut errors));

    let crls = match crl_bytes.and_then(|bytes| {
        decode_text(bytes, &mut errors, |reason| ImportError::InvalidCrl {
            path: crl_chain_path.to_path_buf(),
            index: 1,
            reason,
        })
    }) {
        Some(text) => parse_crls(crl_chain_path, &text, &mut errors),
        None => Vec::new(),
    };

    // The key belongs to block 1 specifically, not to whichever block parsed first
    if let (Some(key), Some(first)) = (&private_key, bundle.first_block()) {
        check_key_matches(key_path, key, first, &mut errors);
    }

    if bundle.complete {
        check_chain_linkage(&bundle.certificates, &mut errors);
        check_crl_issuers(crl_chain_path, &bundle.certificates, &crls, &mut errors);
    }

    if !errors.is_empty() {
        tracing::debug!("CA identity rejected with {} error(s)", errors.len());
        return Err(errors);
    }

    let (Some(bundle_pem), Some(private_key)) = (bundle_text, private_key) else {
        return Err(errors);
    };
    let mut certificates = bundle.certificates.into_iter();
    let Some(ca_certificate) = certificates.next() else {
        return Err(errors);
    };

    let identity = CaIdentity {
        bundle_pem,
        ca_certificate,
        chain: certificates.collect(),
        private_key,
        crls: crls.into_iter().map(|(_, crl)| crl).collect(),
    };

    for (i, cert) in identity.certificates().enumerate() {
        tracing::debug!("Certificate {}: '{}' serial {}", i + 1, cert.subject(), cert.serial());
    }
    for (i, crl) in identity.crls().iter().enumerate() {
        tracing::debug!(
            "CRL {}: issued by '{}', {} revoked certificate(s)",
            i + 1,
            crl.issuer(),
            crl.revoked_count()
        );
    }
    tracing::info!(
        "Loaded CA identity '{}' ({} certificate(s), {} CRL(s), {} {} key)",
        identity.ca_certificate().subject(),
        identity.certificate_count(),
        identity.crls().len(),
        identity.private_key().public_key().algorithm(),
        identity.private_key().format()
    );

    Ok(identity)
}

/// Certificates parsed from the bundle, in file order.
#[derive(Default)]
struct ParsedBundle {
    certificates: Vec<CertificateEntry>,
    /// Block 1 parsed, so `certificates[0]` is the first certificate of the file.
    first_parsed: bool,
    /// Every block parsed.
    complete: bool,
}

impl ParsedBundle {
    fn first_block(&self) -> Option<&CertificateEntry> {
        self.certificates.first().filter(|_| self.first_parsed)
    }
}

fn read_input(path: &Path, errors: &mut ErrorList) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            errors.push(ImportError::FileNotFound {
                path: path.to_path_buf(),
            });
            None
        }
        Err(e) => {
            errors.push(ImportError::FileNotReadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Input as text. Content that is not UTF-8 cannot be PEM and is reported
/// through `not_text` as a problem with the material itself.
fn decode_text(
    bytes: Vec<u8>,
    errors: &mut ErrorList,
    not_text: impl FnOnce(String) -> ImportError,
) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            errors.push(not_text(format!("content is not PEM text ({})", e.utf8_error())));
            drop(Zeroizing::new(e.into_bytes()));
            None
        }
    }
}

fn parse_certificates(path: &Path, text: &str, errors: &mut ErrorList) -> ParsedBundle {
    let blocks = split_blocks(text);
    let mut bundle = ParsedBundle {
        certificates: Vec::with_capacity(blocks.len()),
        ..ParsedBundle::default()
    };

    for block in &blocks {
        match parse_certificate(path, block) {
            Ok(entry) => {
                bundle.first_parsed |= block.index == 1;
                bundle.certificates.push(entry);
            }
            Err(e) => errors.push(e),
        }
    }

    if bundle.certificates.is_empty() {
        errors.push(ImportError::EmptyCertBundle {
            path: path.to_path_buf(),
        });
    }

    bundle.complete = !bundle.certificates.is_empty() && bundle.certificates.len() == blocks.len();
    bundle
}

fn parse_certificate(path: &Path, block: &PemBlock<'_>) -> Result<CertificateEntry, ImportError> {
    let invalid = |reason: String| ImportError::InvalidCertificate {
        path: path.to_path_buf(),
        index: block.index,
        reason,
    };

    let pem = block.decode().map_err(|reason| ImportError::UnparseablePem {
        path: path.to_path_buf(),
        index: block.index,
        reason,
    })?;

    if pem.tag() != CERTIFICATE_LABEL {
        return Err(invalid(format!("unexpected PEM label '{}'", pem.tag())));
    }

    let (_, cert) = parse_x509_certificate(pem.contents()).map_err(|e| invalid(e.to_string()))?;

    let validity = cert.validity();
    if !validity.is_valid() {
        tracing::warn!(
            "Certificate {} ('{}') is outside its validity period ({} to {})",
            block.index,
            cert.subject(),
            validity.not_before,
            validity.not_after
        );
    }

    Ok(CertificateEntry {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: hex::encode(cert.raw_serial()),
        subject_raw: cert.subject().as_raw().to_vec(),
        issuer_raw: cert.issuer().as_raw().to_vec(),
        public_key: PublicKeyMaterial::from_spki(cert.public_key()),
    })
}

fn parse_private_key(path: &Path, text: String, errors: &mut ErrorList) -> Option<PrivateKeyMaterial> {
    let text = Zeroizing::new(text);
    let invalid = |reason: String| ImportError::InvalidKeyMaterial {
        path: path.to_path_buf(),
        reason,
    };

    let blocks = split_blocks(&text);
    let key_blocks: Vec<_> = blocks
        .iter()
        .filter(|b| b.text.contains("PRIVATE KEY-----"))
        .collect();

    let block = match key_blocks.as_slice() {
        [] => {
            errors.push(invalid("no private key found".to_string()));
            return None;
        }
        [block] => *block,
        many => {
            errors.push(invalid(format!(
                "expected exactly one private key, found {}",
                many.len()
            )));
            return None;
        }
    };

    let pem = match block.decode() {
        Ok(pem) => pem,
        Err(reason) => {
            errors.push(invalid(reason));
            return None;
        }
    };

    if pem.tag() == ENCRYPTED_KEY_LABEL {
        errors.push(invalid("encrypted private keys are not supported".to_string()));
        return None;
    }

    let Some(format) = KeyFormat::from_label(pem.tag()) else {
        errors.push(invalid(format!("unsupported key label '{}'", pem.tag())));
        return None;
    };

    let der = Zeroizing::new(pem.contents().to_vec());
    let public_key = match public_key::from_private_key(format, &der) {
        Ok(public_key) => public_key,
        Err(reason) => {
            errors.push(invalid(reason));
            return None;
        }
    };

    Some(PrivateKeyMaterial {
        public_key,
        format,
        pem: text,
    })
}

fn parse_crls(path: &Path, text: &str, errors: &mut ErrorList) -> Vec<(usize, CrlEntry)> {
    let mut crls = Vec::new();

    for block in split_blocks(text) {
        match parse_crl(path, &block) {
            Ok(crl) => crls.push((block.index, crl)),
            Err(e) => errors.push(e),
        }
    }

    crls
}

fn parse_crl(path: &Path, block: &PemBlock<'_>) -> Result<CrlEntry, ImportError> {
    let invalid = |reason: String| ImportError::InvalidCrl {
        path: path.to_path_buf(),
        index: block.index,
        reason,
    };

    let pem = block.decode().map_err(&invalid)?;
    if pem.tag() != CRL_LABEL {
        return Err(invalid(format!("unexpected PEM label '{}'", pem.tag())));
    }

    let (_, crl) = parse_x509_crl(pem.contents()).map_err(|e| invalid(e.to_string()))?;

    Ok(CrlEntry {
        pem: block.text.to_string(),
        issuer: crl.issuer().to_string(),
        issuer_raw: crl.issuer().as_raw().to_vec(),
        revoked_count: crl.iter_revoked_certificates().count(),
    })
}

fn check_key_matches(
    key_path: &Path,
    key: &PrivateKeyMaterial,
    certificate: &CertificateEntry,
    errors: &mut ErrorList,
) {
    if key.public_key() != certificate.public_key() {
        errors.push(ImportError::KeyCertMismatch {
            key_path: key_path.to_path_buf(),
            subject: certificate.subject().to_string(),
        });
    }
}

/// Each certificate must be issued by the one that follows it.
fn check_chain_linkage(certificates: &[CertificateEntry], errors: &mut ErrorList) {
    for (i, pair) in certificates.windows(2).enumerate() {
        let [cert, next] = pair else { continue };
        if cert.issuer_raw != next.subject_raw {
            errors.push(ImportError::BrokenChain {
                index: i + 1,
                subject: cert.subject.clone(),
                issuer: cert.issuer.clone(),
                next_subject: next.subject.clone(),
            });
        }
    }
}

fn check_crl_issuers(
    path: &Path,
    certificates: &[CertificateEntry],
    crls: &[(usize, CrlEntry)],
    errors: &mut ErrorList,
) {
    for (index, crl) in crls {
        let known = certificates.iter().any(|c| c.subject_raw == crl.issuer_raw);
        if !known {
            errors.push(ImportError::UnknownCrlIssuer {
                path: path.to_path_buf(),
                index: *index,
                issuer: crl.issuer.clone(),
            });
        }
    }
}
