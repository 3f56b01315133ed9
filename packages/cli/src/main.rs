//! `ca-import`
//!
//! Imports an externally produced CA key, certificate bundle and CRL chain
//! into the CA storage location named by the configuration file.

use std::path::PathBuf;
use std::process::ExitCode;

use ca_import_core::{ImportRequest, run_import};
use clap::Parser;

mod console;
mod logging;

#[derive(Debug, Parser)]
#[command(name = "ca-import", version)]
#[command(about = "Import an external CA identity into CA storage", long_about = None)]
struct Cli {
    /// PEM private key of the CA being imported
    #[arg(long, value_name = "PATH")]
    private_key: PathBuf,

    /// PEM certificates, CA certificate first, then its issuers
    #[arg(long, value_name = "PATH")]
    cert_bundle: PathBuf,

    /// PEM CRLs for the certificates in the bundle
    #[arg(long, value_name = "PATH")]
    crl_chain: PathBuf,

    /// TOML file locating the CA directory and its files
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn request(&self) -> ImportRequest {
        ImportRequest::new(
            self.cert_bundle.clone(),
            self.private_key.clone(),
            self.crl_chain.clone(),
        )
        .with_config(self.config.clone())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let request = cli.request();
    match run_import(&request, &request.config_resolver(), &console::ConsoleReporter) {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => {
            tracing::debug!("Import failed while {}", failure.stage);
            ExitCode::FAILURE
        }
    }
}
