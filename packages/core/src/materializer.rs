//! Write validated artifacts to their destinations
//!
//! Each file is staged in a temporary file next to its destination, given its
//! final permissions, synced and then moved into place, so a failed write never
//! leaves a truncated artifact under the final name.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::destinations::{DestinationSet, Role};
use crate::error::ImportError;
use crate::identity::CaIdentity;

/// Owner read/write only.
pub const ARTIFACT_MODE: u32 = 0o600;

/// Mode for directories the import creates.
pub const DIRECTORY_MODE: u32 = 0o750;

/// Initial content of the serial-number file.
pub const SERIAL_SEED: &str = "0x0001";

/// Initial content of the certificate inventory.
pub const INVENTORY_SEED: &str = "";

const STAGING_PREFIX: &str = ".ca-import-";

/// Files touched by a successful materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materialized {
    /// Certificate, key and CRL files, in write order.
    pub written: Vec<PathBuf>,
    /// Bookkeeping files that were absent and got seeded.
    pub seeded: Vec<PathBuf>,
}

/// A write failure, together with everything written before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeFailure {
    pub error: ImportError,
    pub written: Vec<PathBuf>,
}

/// Create `path` (and parents) unless it already exists.
///
/// # Errors
///
/// Returns `DirectoryCreate` if the directory cannot be created.
pub fn ensure_directory(path: &Path) -> Result<(), ImportError> {
    if path.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIRECTORY_MODE);
    }

    builder
        .create(path)
        .map_err(|e| ImportError::DirectoryCreate {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    tracing::debug!("Created directory {}", path.display());
    Ok(())
}

/// Atomically write `content` to `path` with permission bits `mode`.
///
/// # Errors
///
/// Returns `Write` if staging, syncing or moving the file fails, including
/// when something already occupies `path`.
pub fn write_artifact(path: &Path, content: &[u8], mode: u32) -> Result<(), ImportError> {
    let staged = stage(path, content, mode)?;

    staged.persist_noclobber(path).map_err(|e| write_error(path, &e.error))?;

    tracing::info!("Wrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}

/// Create `path` with `default_content` only if nothing is there yet.
///
/// Returns whether the file was created. An existing file is left untouched.
///
/// # Errors
///
/// Returns `Write` if the file was absent and could not be created.
pub fn ensure_auxiliary_file(path: &Path, default_content: &str, mode: u32) -> Result<bool, ImportError> {
    if path.symlink_metadata().is_ok() {
        tracing::debug!("Keeping existing {}", path.display());
        return Ok(false);
    }

    let staged = stage(path, default_content.as_bytes(), mode)?;
    match staged.persist_noclobber(path) {
        Ok(_) => {
            tracing::info!("Seeded {}", path.display());
            Ok(true)
        }
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::debug!("{} appeared concurrently, keeping it", path.display());
            Ok(false)
        }
        Err(e) => Err(write_error(path, &e.error)),
    }
}

/// Write the identity and seed bookkeeping files.
///
/// Order: directory, certificate, key, CRLs, serial, inventory. Artifacts
/// written before a failure are left in place.
///
/// # Errors
///
/// Returns the first failure together with the paths already written.
pub fn materialize(
    identity: &CaIdentity,
    destinations: &DestinationSet,
) -> Result<Materialized, MaterializeFailure> {
    let mut done = Materialized::default();
    let fail = |error: ImportError, done: &Materialized| MaterializeFailure {
        error,
        written: done.written.iter().chain(&done.seeded).cloned().collect(),
    };

    ensure_directory(destinations.ca_dir()).map_err(|e| fail(e, &done))?;

    let crl_pem = identity.crl_pem();
    let artifacts: [(Role, &[u8]); 3] = [
        (Role::CaCert, identity.certificate_pem().as_bytes()),
        (Role::CaKey, identity.private_key_pem().as_bytes()),
        (Role::CaCrl, crl_pem.as_bytes()),
    ];

    for (role, content) in artifacts {
        let path = destinations.path(role);
        ensure_parent(path).map_err(|e| fail(e, &done))?;
        write_artifact(path, content, ARTIFACT_MODE).map_err(|e| fail(e, &done))?;
        done.written.push(path.to_path_buf());
    }

    for (role, seed) in [(Role::Serial, SERIAL_SEED), (Role::CertInventory, INVENTORY_SEED)] {
        let path = destinations.path(role);
        ensure_parent(path).map_err(|e| fail(e, &done))?;
        if ensure_auxiliary_file(path, seed, ARTIFACT_MODE).map_err(|e| fail(e, &done))? {
            done.seeded.push(path.to_path_buf());
        }
    }

    Ok(done)
}

fn ensure_parent(path: &Path) -> Result<(), ImportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory(parent),
        _ => Ok(()),
    }
}

fn stage(path: &Path, content: &[u8], mode: u32) -> Result<NamedTempFile, ImportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| write_error(path, &e))?;

    staged.write_all(content).map_err(|e| write_error(path, &e))?;
    set_mode(staged.as_file(), mode).map_err(|e| write_error(path, &e))?;
    staged.as_file().sync_all().map_err(|e| write_error(path, &e))?;

    Ok(staged)
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

fn write_error(path: &Path, e: &std::io::Error) -> ImportError {
    ImportError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
