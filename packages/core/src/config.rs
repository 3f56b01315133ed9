//! Configuration-file backed destination resolution
//!
//! Settings are read from an optional `[ca]` table in a TOML file:
//!
//! ```toml
//! [ca]
//! cadir = "/srv/ca"
//! cacert = "$cadir/ca_crt.pem"
//! cert_inventory = "/var/log/ca/inventory.txt"
//! ```
//!
//! Unset settings fall back to the standard layout under `cadir`. Values may
//! reference `$cadir` (or `${cadir}`); no other variables exist.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::destinations::{DestinationResolver, DestinationSet, Role};
use crate::error::{ErrorList, ImportError, StageResult};

pub const DEFAULT_CA_DIR: &str = "/etc/ca-import/ca";

const CA_DIR_VARIABLE: &str = "cadir";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    ca: CaSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaSettings {
    cadir: Option<String>,
    cacert: Option<String>,
    cakey: Option<String>,
    cacrl: Option<String>,
    serial: Option<String>,
    cert_inventory: Option<String>,
}

impl CaSettings {
    fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::CaCert => self.cacert.as_deref(),
            Role::CaKey => self.cakey.as_deref(),
            Role::CaCrl => self.cacrl.as_deref(),
            Role::Serial => self.serial.as_deref(),
            Role::CertInventory => self.cert_inventory.as_deref(),
        }
    }
}

fn default_template(role: Role) -> &'static str {
    match role {
        Role::CaCert => "$cadir/ca_crt.pem",
        Role::CaKey => "$cadir/ca_key.pem",
        Role::CaCrl => "$cadir/ca_crl.pem",
        Role::Serial => "$cadir/serial",
        Role::CertInventory => "$cadir/inventory.txt",
    }
}

/// Resolves destinations from an optional configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: Option<PathBuf>,
}

impl ConfigFile {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load_settings(&self) -> StageResult<CaSettings> {
        let Some(path) = &self.path else {
            return Ok(CaSettings::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            ImportError::configuration(format!(
                "could not read config file '{}': {e}",
                path.display()
            ))
        })?;

        let raw: RawConfig = toml::from_str(&content).map_err(|e| {
            ImportError::configuration(format!(
                "could not parse config file '{}': {}",
                path.display(),
                e.message()
            ))
        })?;

        Ok(raw.ca)
    }
}

impl DestinationResolver for ConfigFile {
    fn resolve(&self) -> StageResult<DestinationSet> {
        let settings = self.load_settings()?;
        let mut errors = ErrorList::new();

        let ca_dir = settings.cadir.as_deref().unwrap_or(DEFAULT_CA_DIR);
        if ca_dir.contains('$') {
            errors.push(ImportError::configuration(format!(
                "setting 'cadir' may not reference variables: '{ca_dir}'"
            )));
        } else {
            check_absolute(CA_DIR_VARIABLE, ca_dir, &mut errors);
        }

        let mut resolve = |role: Role| {
            let raw = settings.get(role).unwrap_or(default_template(role));
            match interpolate(raw, ca_dir) {
                Ok(value) => {
                    check_absolute(role.setting(), &value, &mut errors);
                    PathBuf::from(value)
                }
                Err(reason) => {
                    errors.push(ImportError::configuration(format!(
                        "setting '{}': {reason}",
                        role.setting()
                    )));
                    PathBuf::new()
                }
            }
        };

        let set = DestinationSet::new(
            PathBuf::from(ca_dir),
            resolve(Role::CaCert),
            resolve(Role::CaKey),
            resolve(Role::CaCrl),
            resolve(Role::Serial),
            resolve(Role::CertInventory),
        );

        if !errors.is_empty() {
            return Err(errors);
        }

        tracing::debug!("Resolved CA destinations under {}", set.ca_dir().display());
        Ok(set)
    }
}

fn check_absolute(setting: &str, value: &str, errors: &mut ErrorList) {
    if value.is_empty() {
        errors.push(ImportError::configuration(format!(
            "setting '{setting}' is empty"
        )));
    } else if !Path::new(value).is_absolute() {
        errors.push(ImportError::configuration(format!(
            "setting '{setting}' must be an absolute path, got '{value}'"
        )));
    }
}

/// Substitute `$cadir` / `${cadir}` references in a setting value.
fn interpolate(value: &str, ca_dir: &str) -> Result<String, String> {
    let mut out = String::with_capacity(value.len() + ca_dir.len());
    let mut chars = value.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name = if chars.peek().map(|&(_, c)| c) == Some('{') {
            chars.next();
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((_, c)) => name.push(c),
                    None => return Err(format!("unterminated variable reference in '{value}'")),
                }
            }
            name
        } else {
            let mut name = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            name
        };

        if name == CA_DIR_VARIABLE {
            out.push_str(ca_dir);
        } else {
            return Err(format!("unknown variable '${name}' in '{value}'"));
        }
    }

    Ok(out)
}
