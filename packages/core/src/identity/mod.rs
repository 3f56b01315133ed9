//! CA identity loading and cross-validation

mod loader;
mod pem_blocks;
mod public_key;
mod types;

pub use loader::load;
pub use public_key::PublicKeyMaterial;
pub use types::{CaIdentity, CertificateEntry, CrlEntry, KeyFormat, PrivateKeyMaterial};
