//! # CA import core
//!
//! Validates an externally produced Certificate Authority identity (private
//! key, certificate bundle and CRL chain) and commits it to a CA's storage
//! location.
//!
//! The pipeline runs in fixed stages:
//!
//! 1. every input path exists and is readable
//! 2. the three inputs load as one coherent identity (the key belongs to the
//!    first certificate, CRLs come from certificates in the bundle)
//! 3. destinations are resolved from configuration
//! 4. none of the destinations already exists
//! 5. artifacts are written with owner-only permissions
//!
//! Each stage reports all of its errors at once. Nothing is written unless
//! stages 1 to 4 found no errors.
//!
//! Concurrent imports into the same destination are not coordinated; callers
//! that might run more than one must serialize them externally.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use ca_import_core::{ImportRequest, TracingReporter, run_import};
//!
//! let request = ImportRequest::new(
//!     PathBuf::from("/tmp/ca/bundle.pem"),
//!     PathBuf::from("/tmp/ca/key.pem"),
//!     PathBuf::from("/tmp/ca/crls.pem"),
//! );
//!
//! match run_import(&request, &request.config_resolver(), &TracingReporter) {
//!     Ok(report) => println!("imported into {}", report.ca_dir.display()),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! ```

pub mod config;
pub mod destinations;
pub mod error;
pub mod identity;
pub mod materializer;
pub mod orchestrator;
pub mod paths;
pub mod reporter;

pub use config::ConfigFile;
pub use destinations::{DestinationResolver, DestinationSet, Role, StaticDestinations};
pub use error::{ErrorCategory, ErrorKind, ErrorList, ImportError, StageResult};
pub use identity::{CaIdentity, CertificateEntry, CrlEntry, KeyFormat, PublicKeyMaterial};
pub use orchestrator::{
    CONFLICT_REMEDIATION, ImportFailure, ImportOrchestrator, ImportReport, ImportRequest,
    ImportState, Stage, run_import,
};
pub use reporter::{MemoryReporter, ReportedLine, Reporter, TracingReporter};
