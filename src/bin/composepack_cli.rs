//! Composepack CLI - Bridge interface
//!
//! Commands: render, checksum create, checksum check
//! Outputs one JSON object to stdout, logs to stderr
//! Returns 2 when a checksum doesn't match

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use composepack_core::{
    checksum,
    package::PackageLayout,
    pipeline::{render_package, OutputMode, RenderRequest},
    PackageError, Verification,
};

#[derive(Parser)]
#[command(name = "composepack-cli")]
#[command(about = "Composepack CLI - render compose packages and verify their checksum")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a package into a configuration file
    Render {
        /// Path of the package directory
        #[arg(short, long = "package_path")]
        package_path: PathBuf,

        /// Output file, or output directory with --split
        #[arg(short, long = "output_path")]
        output_path: PathBuf,

        /// Custom values file merged over values.yaml
        #[arg(short = 'v', long)]
        values: Option<PathBuf>,

        /// Write one numbered file per fragment instead of one combined file
        #[arg(long)]
        split: bool,
    },

    /// Create or verify the checksum of a package
    Checksum {
        #[command(subcommand)]
        action: ChecksumAction,
    },
}

#[derive(Subcommand)]
enum ChecksumAction {
    /// Write the package digest to its CHECKSUM file
    Create { package: PathBuf },

    /// Compare the package digest with its CHECKSUM file
    Check { package: PathBuf },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            package_path,
            output_path,
            values,
            split,
        } => {
            let layout = PackageLayout::new(&package_path);
            let report = layout.check();
            if !report.valid {
                for issue in report.errors() {
                    error!("{}", issue.message);
                }
                println!("{}", json!({"success": false, "stage": "layout", "layout": report}));
                return ExitCode::FAILURE;
            }

            let request = RenderRequest {
                package: package_path,
                destination: output_path,
                custom_values: values,
                mode: if split { OutputMode::Split } else { OutputMode::Combined },
            };

            match render_package(&request) {
                Ok(outcome) => {
                    println!("{}", json!({"success": true, "outcome": outcome}));
                    ExitCode::SUCCESS
                }
                Err(e) => failure(&e),
            }
        }

        Commands::Checksum { action } => match action {
            ChecksumAction::Create { package } => {
                if let Err(e) = require_dir(&package) {
                    return failure(&e);
                }
                match checksum::create(&package) {
                    Ok(digest) => {
                        println!("{}", json!({"success": true, "digest": digest}));
                        ExitCode::SUCCESS
                    }
                    Err(e) => failure(&e),
                }
            }

            ChecksumAction::Check { package } => match checksum::verify(&package) {
                Ok(outcome) => {
                    let matched = outcome.is_match();
                    println!("{}", json!({"success": matched, "verification": outcome}));
                    match outcome {
                        Verification::Match { .. } => ExitCode::SUCCESS,
                        Verification::Mismatch { .. } => ExitCode::from(2),
                    }
                }
                Err(e) => failure(&e),
            },
        },
    }
}

fn require_dir(path: &Path) -> Result<(), PackageError> {
    std::fs::read_dir(path)
        .map(|_| ())
        .map_err(|source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn failure(e: &PackageError) -> ExitCode {
    error!(stage = e.stage(), path = %e.path().display(), "{e}");
    let output = json!({
        "success": false,
        "stage": e.stage(),
        "path": e.path(),
        "error": e.to_string(),
    });
    println!("{output}");
    ExitCode::FAILURE
}
