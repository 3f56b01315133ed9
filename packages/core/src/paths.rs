//! Input existence and destination conflict checks

use std::fs::File;
use std::path::Path;

use crate::destinations::DestinationSet;
use crate::error::{ErrorList, ImportError};

/// Check that every supplied input exists and can be opened for reading.
///
/// `None` entries are optional inputs that were not given and are skipped.
#[must_use]
pub fn validate_input_paths<'a, I>(paths: I) -> ErrorList
where
    I: IntoIterator<Item = Option<&'a Path>>,
{
    let mut errors = ErrorList::new();

    for path in paths.into_iter().flatten() {
        if !path.exists() {
            errors.push(ImportError::FileNotFound {
                path: path.to_path_buf(),
            });
            continue;
        }

        if path.is_dir() {
            errors.push(ImportError::FileNotReadable {
                path: path.to_path_buf(),
                reason: "is a directory".to_string(),
            });
            continue;
        }

        if let Err(e) = File::open(path) {
            errors.push(ImportError::FileNotReadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    }

    errors
}

/// Report every artifact destination that already exists.
#[must_use]
pub fn check_destination_conflicts(destinations: &DestinationSet) -> ErrorList {
    let mut errors = ErrorList::new();

    for (role, path) in destinations.artifacts() {
        // symlink_metadata so a dangling link still counts as occupied
        if path.symlink_metadata().is_ok() {
            tracing::debug!("Destination for {} already exists: {}", role, path.display());
            errors.push(ImportError::DestinationExists {
                role,
                path: path.to_path_buf(),
            });
        }
    }

    errors
}
