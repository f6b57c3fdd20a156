//! `shield`: command-line client for the OffSec Shield console.
//!
//! ## Usage
//!
//! ```bash
//! # Re-verify an exported bundle
//! shield verify bundle.json
//!
//! # Follow the live feed
//! shield --ws-url ws://shield.internal:9115/offsec/ws watch
//!
//! # Block an address through a guardian
//! shield --token $TOKEN block --ip 203.0.113.7 --guardian g1
//! ```

mod commands;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shield_console::{ConsoleConfig, VerificationReport};
use tracing::warn;

use commands::proof::ProofSource;

/// OffSec Shield console client
#[derive(Parser, Debug)]
#[command(name = "shield")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// OffSec HTTP API base URL
    #[arg(long, global = true, env = "OFFSEC_HTTP_URL")]
    http_url: Option<String>,

    /// Live feed WebSocket URL
    #[arg(long, global = true, env = "OFFSEC_WS_URL")]
    ws_url: Option<String>,

    /// Bearer token for action submissions
    #[arg(long, global = true, env = "OFFSEC_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-verify an exported proof bundle (`-` reads stdin)
    Verify { file: PathBuf },
    /// Run the console headless and log every change
    Watch {
        /// Only refresh receipts for this guardian
        #[arg(long)]
        guardian: Option<String>,
    },
    /// Submit an operator block action
    Block {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        guardian: Option<String>,
    },
    /// Fetch and verify a bundle held by a mesh peer
    MeshProof {
        #[arg(long)]
        peer: String,
        #[arg(long)]
        receipt: String,
        /// Write the fetched bundle here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch and verify a named proof bundle
    Proof {
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl Args {
    /// Environment config with flag overrides applied.
    fn config(&self) -> Result<ConsoleConfig> {
        let mut config = ConsoleConfig::from_env();
        if let Some(url) = &self.http_url {
            config.http_base = url.clone();
        }
        if let Some(url) = &self.ws_url {
            config.ws_url = url.clone();
        }
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            config.api_token = Some(token.clone());
        }
        let config = config.normalized();
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn report_exit(report: &VerificationReport) -> Result<ExitCode> {
    commands::print_report(report)?;
    if report.is_fully_verified() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            valid = report.valid,
            anchor = ?report.anchor,
            "[shield] Proof did not verify"
        );
        Ok(ExitCode::FAILURE)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    telemetry::init()?;

    match &args.command {
        Command::Verify { file } => report_exit(&commands::verify::run(file)?),
        Command::Watch { guardian } => {
            commands::watch::run(args.config()?, guardian.clone()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Block { ip, guardian } => {
            commands::block::run(&args.config()?, ip, guardian.clone()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::MeshProof { peer, receipt, out } => {
            let source = ProofSource::Mesh { peer, receipt };
            let report = commands::proof::run(&args.config()?, source, out.as_deref()).await?;
            report_exit(&report)
        }
        Command::Proof { id, out } => {
            let source = ProofSource::Local { id };
            let report = commands::proof::run(&args.config()?, source, out.as_deref()).await?;
            report_exit(&report)
        }
    }
}
