//! Import state machine
//!
//! `ValidatingInputs -> LoadingIdentity -> ResolvingDestinations ->
//! CheckingConflicts -> Materializing -> Done`, with `Failed` reachable from
//! every stage. Only `Materializing` touches the file system, and it can only
//! be entered with a [`ClearedDestinations`] value, which the conflict check
//! alone produces.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ConfigFile;
use crate::destinations::{DestinationResolver, DestinationSet};
use crate::error::ErrorList;
use crate::identity::{self, CaIdentity};
use crate::materializer::{self, Materialized};
use crate::paths;
use crate::reporter::Reporter;

/// Appended to destination conflict reports.
pub const CONFLICT_REMEDIATION: &str = "Existing CA files were found. If you really want to replace the current CA, \
delete the files listed above by hand and run the import again. Deleting them invalidates every certificate \
the current CA has issued, so each of those certificates will have to be reissued.";

/// Files the operator asked to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub bundle: PathBuf,
    pub key: PathBuf,
    pub crl_chain: PathBuf,
    pub config: Option<PathBuf>,
}

impl ImportRequest {
    #[must_use]
    pub fn new(bundle: PathBuf, key: PathBuf, crl_chain: PathBuf) -> Self {
        Self {
            bundle,
            key,
            crl_chain,
            config: None,
        }
    }

    #[must_use]
    pub fn with_config(self, config: Option<PathBuf>) -> Self {
        Self { config, ..self }
    }

    /// Resolver for the request's configuration file.
    #[must_use]
    pub fn config_resolver(&self) -> ConfigFile {
        ConfigFile::new(self.config.clone())
    }

    fn input_paths(&self) -> [Option<&Path>; 4] {
        [
            Some(self.bundle.as_path()),
            Some(self.key.as_path()),
            Some(self.crl_chain.as_path()),
            self.config.as_deref(),
        ]
    }
}

/// Pipeline stage, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ValidatingInputs,
    LoadingIdentity,
    ResolvingDestinations,
    CheckingConflicts,
    Materializing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValidatingInputs => "validating inputs",
            Self::LoadingIdentity => "loading CA identity",
            Self::ResolvingDestinations => "resolving destinations",
            Self::CheckingConflicts => "checking destination conflicts",
            Self::Materializing => "writing CA files",
        })
    }
}

/// Destinations that passed the conflict check.
#[derive(Debug)]
pub struct ClearedDestinations(DestinationSet);

impl ClearedDestinations {
    #[must_use]
    pub fn destinations(&self) -> &DestinationSet {
        &self.0
    }
}

/// Summary of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub ca_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub seeded: Vec<PathBuf>,
    pub certificate_count: usize,
    pub crl_count: usize,
}

/// Why an import stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub stage: Stage,
    pub errors: ErrorList,
    /// Files already written when a `Materializing` failure happened.
    pub written: Vec<PathBuf>,
}

impl ImportFailure {
    fn new(stage: Stage, errors: ErrorList) -> Self {
        Self {
            stage,
            errors,
            written: Vec::new(),
        }
    }

    /// Operator guidance appended to the error list, if this stage has any.
    #[must_use]
    pub fn remediation(&self) -> Option<&'static str> {
        match self.stage {
            Stage::CheckingConflicts => Some(CONFLICT_REMEDIATION),
            _ => None,
        }
    }
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Import failed while {}:\n{}", self.stage, self.errors)?;
        if let Some(remediation) = self.remediation() {
            write!(f, "\n{remediation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportFailure {}

/// Current position in the pipeline.
#[derive(Debug)]
pub enum ImportState {
    ValidatingInputs,
    LoadingIdentity,
    ResolvingDestinations {
        identity: CaIdentity,
    },
    CheckingConflicts {
        identity: CaIdentity,
        destinations: DestinationSet,
    },
    Materializing {
        identity: CaIdentity,
        destinations: ClearedDestinations,
    },
    Done(ImportReport),
    Failed(ImportFailure),
}

impl ImportState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Drives one import run through its stages.
pub struct ImportOrchestrator<'a, D, R> {
    request: &'a ImportRequest,
    resolver: &'a D,
    reporter: &'a R,
}

impl<'a, D, R> ImportOrchestrator<'a, D, R>
where
    D: DestinationResolver,
    R: Reporter,
{
    #[must_use]
    pub fn new(request: &'a ImportRequest, resolver: &'a D, reporter: &'a R) -> Self {
        Self {
            request,
            resolver,
            reporter,
        }
    }

    /// Run every stage until `Done` or `Failed`, reporting the outcome.
    ///
    /// # Errors
    ///
    /// Returns the failing stage with its full error list.
    pub fn run(&self) -> Result<ImportReport, ImportFailure> {
        let mut state = ImportState::ValidatingInputs;
        loop {
            state = match self.step(state) {
                ImportState::Done(report) => {
                    self.reporter.inform(&format!(
                        "Successfully imported CA. Files written to {}",
                        report.ca_dir.display()
                    ));
                    return Ok(report);
                }
                ImportState::Failed(failure) => {
                    self.report_failure(&failure);
                    return Err(failure);
                }
                next => next,
            };
        }
    }

    /// Perform one transition.
    pub fn step(&self, state: ImportState) -> ImportState {
        match state {
            ImportState::ValidatingInputs => self.validate_inputs(),
            ImportState::LoadingIdentity => self.load_identity(),
            ImportState::ResolvingDestinations { identity } => self.resolve_destinations(identity),
            ImportState::CheckingConflicts {
                identity,
                destinations,
            } => Self::check_conflicts(identity, destinations),
            ImportState::Materializing {
                identity,
                destinations,
            } => Self::materialize(&identity, &destinations),
            terminal @ (ImportState::Done(_) | ImportState::Failed(_)) => terminal,
        }
    }

    fn validate_inputs(&self) -> ImportState {
        tracing::debug!("Stage: {}", Stage::ValidatingInputs);
        let errors = paths::validate_input_paths(self.request.input_paths());
        if errors.is_empty() {
            ImportState::LoadingIdentity
        } else {
            ImportState::Failed(ImportFailure::new(Stage::ValidatingInputs, errors))
        }
    }

    fn load_identity(&self) -> ImportState {
        tracing::debug!("Stage: {}", Stage::LoadingIdentity);
        match identity::load(&self.request.bundle, &self.request.key, &self.request.crl_chain) {
            Ok(identity) => ImportState::ResolvingDestinations { identity },
            Err(errors) => ImportState::Failed(ImportFailure::new(Stage::LoadingIdentity, errors)),
        }
    }

    fn resolve_destinations(&self, identity: CaIdentity) -> ImportState {
        tracing::debug!("Stage: {}", Stage::ResolvingDestinations);
        match self.resolver.resolve() {
            Ok(destinations) => ImportState::CheckingConflicts {
                identity,
                destinations,
            },
            Err(errors) => {
                ImportState::Failed(ImportFailure::new(Stage::ResolvingDestinations, errors))
            }
        }
    }

    fn check_conflicts(identity: CaIdentity, destinations: DestinationSet) -> ImportState {
        tracing::debug!("Stage: {}", Stage::CheckingConflicts);
        let conflicts = paths::check_destination_conflicts(&destinations);
        if conflicts.is_empty() {
            ImportState::Materializing {
                identity,
                destinations: ClearedDestinations(destinations),
            }
        } else {
            ImportState::Failed(ImportFailure::new(Stage::CheckingConflicts, conflicts))
        }
    }

    fn materialize(identity: &CaIdentity, destinations: &ClearedDestinations) -> ImportState {
        tracing::debug!("Stage: {}", Stage::Materializing);
        match materializer::materialize(identity, destinations.destinations()) {
            Ok(Materialized { written, seeded }) => ImportState::Done(ImportReport {
                ca_dir: destinations.destinations().ca_dir().to_path_buf(),
                written,
                seeded,
                certificate_count: identity.certificate_count(),
                crl_count: identity.crls().len(),
            }),
            Err(failure) => {
                if !failure.written.is_empty() {
                    tracing::warn!(
                        "Import stopped after writing {} file(s); they were left in place",
                        failure.written.len()
                    );
                }
                ImportState::Failed(ImportFailure {
                    stage: Stage::Materializing,
                    errors: ErrorList::from(failure.error),
                    written: failure.written,
                })
            }
        }
    }

    fn report_failure(&self, failure: &ImportFailure) {
        for error in &failure.errors {
            self.reporter.error(&error.to_string());
        }
        if let Some(remediation) = failure.remediation() {
            self.reporter.error(remediation);
        }
        for path in &failure.written {
            self.reporter
                .error(&format!("Already written before the failure: {}", path.display()));
        }
    }
}

/// Run a complete import.
///
/// # Errors
///
/// Returns the failing stage with every error it collected.
pub fn run_import<D, R>(
    request: &ImportRequest,
    resolver: &D,
    reporter: &R,
) -> Result<ImportReport, ImportFailure>
where
    D: DestinationResolver,
    R: Reporter,
{
    ImportOrchestrator::new(request, resolver, reporter).run()
}
