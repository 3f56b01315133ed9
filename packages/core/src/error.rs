//! Error types for the import pipeline
//!
//! Every stage reports problems as [`ImportError`] values collected into an
//! [`ErrorList`]. Nothing in the pipeline stops at the first problem it finds
//! inside a stage; the orchestrator only stops between stages.

use std::fmt;
use std::path::PathBuf;

use crate::destinations::Role;

/// Result alias used by every pipeline stage.
pub type StageResult<T> = std::result::Result<T, ErrorList>;

/// Coarse error taxonomy, one entry per failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Input file missing or unreadable
    InputPath,
    /// Key, certificate bundle or CRL chain is not a coherent CA identity
    IdentityValidation,
    /// Configuration file malformed or destinations unresolvable
    Configuration,
    /// A destination file already exists
    DestinationConflict,
    /// Directory creation or artifact write failed
    FileSystemWrite,
}

/// Fine-grained error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileNotFound,
    FileNotReadable,
    UnparseablePem,
    EmptyCertBundle,
    InvalidCertificate,
    InvalidKeyMaterial,
    InvalidCrl,
    KeyCertMismatch,
    BrokenChain,
    UnknownCrlIssuer,
    Configuration,
    DestinationExists,
    DirectoryCreate,
    Write,
}

impl ErrorKind {
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::FileNotFound | Self::FileNotReadable => ErrorCategory::InputPath,
            Self::UnparseablePem
            | Self::EmptyCertBundle
            | Self::InvalidCertificate
            | Self::InvalidKeyMaterial
            | Self::InvalidCrl
            | Self::KeyCertMismatch
            | Self::BrokenChain
            | Self::UnknownCrlIssuer => ErrorCategory::IdentityValidation,
            Self::Configuration => ErrorCategory::Configuration,
            Self::DestinationExists => ErrorCategory::DestinationConflict,
            Self::DirectoryCreate | Self::Write => ErrorCategory::FileSystemWrite,
        }
    }
}

/// A single problem found by one of the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Could not find '{}'", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Could not read '{}': {reason}", path.display())]
    FileNotReadable { path: PathBuf, reason: String },

    #[error("Could not parse PEM block {index} in '{}': {reason}", path.display())]
    UnparseablePem {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Could not detect any certs within '{}'", path.display())]
    EmptyCertBundle { path: PathBuf },

    #[error("Could not parse certificate {index} in '{}': {reason}", path.display())]
    InvalidCertificate {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Invalid private key in '{}': {reason}", path.display())]
    InvalidKeyMaterial { path: PathBuf, reason: String },

    #[error("Could not parse CRL {index} in '{}': {reason}", path.display())]
    InvalidCrl {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Private key in '{}' does not match the public key of '{subject}'", key_path.display())]
    KeyCertMismatch { key_path: PathBuf, subject: String },

    #[error("Certificate {index} ('{subject}') is issued by '{issuer}', but the next certificate in the bundle is '{next_subject}'")]
    BrokenChain {
        index: usize,
        subject: String,
        issuer: String,
        next_subject: String,
    },

    #[error("CRL {index} in '{}' was issued by '{issuer}', which is not in the certificate bundle", path.display())]
    UnknownCrlIssuer {
        path: PathBuf,
        index: usize,
        issuer: String,
    },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Existing file at '{}' ({role})", path.display())]
    DestinationExists { role: Role, path: PathBuf },

    #[error("Could not create directory '{}': {reason}", path.display())]
    DirectoryCreate { path: PathBuf, reason: String },

    #[error("Could not write '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

impl ImportError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::FileNotReadable { .. } => ErrorKind::FileNotReadable,
            Self::UnparseablePem { .. } => ErrorKind::UnparseablePem,
            Self::EmptyCertBundle { .. } => ErrorKind::EmptyCertBundle,
            Self::InvalidCertificate { .. } => ErrorKind::InvalidCertificate,
            Self::InvalidKeyMaterial { .. } => ErrorKind::InvalidKeyMaterial,
            Self::InvalidCrl { .. } => ErrorKind::InvalidCrl,
            Self::KeyCertMismatch { .. } => ErrorKind::KeyCertMismatch,
            Self::BrokenChain { .. } => ErrorKind::BrokenChain,
            Self::UnknownCrlIssuer { .. } => ErrorKind::UnknownCrlIssuer,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::DestinationExists { .. } => ErrorKind::DestinationExists,
            Self::DirectoryCreate { .. } => ErrorKind::DirectoryCreate,
            Self::Write { .. } => ErrorKind::Write,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Ordered collection of errors produced by one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(Vec<ImportError>);

impl ErrorList {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ImportError) {
        self.0.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImportError> {
        self.0.iter()
    }

    /// Kinds of all collected errors, in report order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.0.iter().map(ImportError::kind).collect()
    }

    /// `Ok(value)` when nothing was collected, otherwise the list itself.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was collected.
    pub fn into_result<T>(self, value: T) -> StageResult<T> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ImportError> {
        self.0
    }
}

impl From<ImportError> for ErrorList {
    fn from(error: ImportError) -> Self {
        Self(vec![error])
    }
}

impl From<Vec<ImportError>> for ErrorList {
    fn from(errors: Vec<ImportError>) -> Self {
        Self(errors)
    }
}

impl Extend<ImportError> for ErrorList {
    fn extend<I: IntoIterator<Item = ImportError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ErrorList {
    type Item = ImportError;
    type IntoIter = std::vec::IntoIter<ImportError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ImportError;
    type IntoIter = std::slice::Iter<'a, ImportError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_onto_taxonomy() {
        assert_eq!(ErrorKind::FileNotReadable.category(), ErrorCategory::InputPath);
        assert_eq!(
            ErrorKind::KeyCertMismatch.category(),
            ErrorCategory::IdentityValidation
        );
        assert_eq!(
            ErrorKind::DestinationExists.category(),
            ErrorCategory::DestinationConflict
        );
        assert_eq!(ErrorKind::Write.category(), ErrorCategory::FileSystemWrite);
    }

    #[test]
    fn error_list_keeps_insertion_order() {
        let mut errors = ErrorList::new();
        errors.push(ImportError::EmptyCertBundle {
            path: PathBuf::from("/in/bundle.pem"),
        });
        errors.push(ImportError::configuration("bad"));

        assert_eq!(
            errors.kinds(),
            vec![ErrorKind::EmptyCertBundle, ErrorKind::Configuration]
        );
        assert_eq!(
            errors.to_string(),
            "Could not detect any certs within '/in/bundle.pem'\nConfiguration error: bad"
        );
    }

    #[test]
    fn empty_list_converts_to_ok() {
        assert_eq!(ErrorList::new().into_result(7), Ok(7));

        let failed = ErrorList::from(ImportError::configuration("x")).into_result(7);
        assert!(failed.is_err());
    }
}
