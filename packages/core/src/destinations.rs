//! Destination roles and the resolver seam

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StageResult;

/// Logical role of a file written by the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    CaCert,
    CaKey,
    CaCrl,
    Serial,
    CertInventory,
}

impl Role {
    /// Artifacts in write order.
    pub const ALL: [Role; 5] = [
        Role::CaCert,
        Role::CaKey,
        Role::CaCrl,
        Role::Serial,
        Role::CertInventory,
    ];

    /// Name of the configuration setting that locates this role.
    #[must_use]
    pub fn setting(self) -> &'static str {
        match self {
            Self::CaCert => "cacert",
            Self::CaKey => "cakey",
            Self::CaCrl => "cacrl",
            Self::Serial => "serial",
            Self::CertInventory => "cert_inventory",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting())
    }
}

/// Resolved target paths for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSet {
    ca_dir: PathBuf,
    cacert: PathBuf,
    cakey: PathBuf,
    cacrl: PathBuf,
    serial: PathBuf,
    cert_inventory: PathBuf,
}

impl DestinationSet {
    #[must_use]
    pub fn new(
        ca_dir: PathBuf,
        cacert: PathBuf,
        cakey: PathBuf,
        cacrl: PathBuf,
        serial: PathBuf,
        cert_inventory: PathBuf,
    ) -> Self {
        Self {
            ca_dir,
            cacert,
            cakey,
            cacrl,
            serial,
            cert_inventory,
        }
    }

    /// Standard file names laid out under a single CA directory.
    #[must_use]
    pub fn in_dir(ca_dir: impl Into<PathBuf>) -> Self {
        let ca_dir = ca_dir.into();
        Self {
            cacert: ca_dir.join("ca_crt.pem"),
            cakey: ca_dir.join("ca_key.pem"),
            cacrl: ca_dir.join("ca_crl.pem"),
            serial: ca_dir.join("serial"),
            cert_inventory: ca_dir.join("inventory.txt"),
            ca_dir,
        }
    }

    #[must_use]
    pub fn ca_dir(&self) -> &Path {
        &self.ca_dir
    }

    #[must_use]
    pub fn path(&self, role: Role) -> &Path {
        match role {
            Role::CaCert => &self.cacert,
            Role::CaKey => &self.cakey,
            Role::CaCrl => &self.cacrl,
            Role::Serial => &self.serial,
            Role::CertInventory => &self.cert_inventory,
        }
    }

    /// Every artifact path paired with its role, in write order.
    pub fn artifacts(&self) -> impl Iterator<Item = (Role, &Path)> {
        Role::ALL.into_iter().map(move |role| (role, self.path(role)))
    }
}

/// Maps logical roles to absolute paths.
pub trait DestinationResolver {
    /// # Errors
    ///
    /// Returns every configuration problem found while resolving.
    fn resolve(&self) -> StageResult<DestinationSet>;
}

/// Resolver over an already-built [`DestinationSet`].
#[derive(Debug, Clone)]
pub struct StaticDestinations(pub DestinationSet);

impl DestinationResolver for StaticDestinations {
    fn resolve(&self) -> StageResult<DestinationSet> {
        Ok(self.0.clone())
    }
}
