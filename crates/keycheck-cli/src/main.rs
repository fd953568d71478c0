//! keycheck CLI entrypoint.

use clap::Parser;
use console::style;
use keycheck_core::{Error, Result};
use keycheck_licensing::KeygenClient;
use keycheck_secrets::{EnvProvider, FileProvider, SecretProvider};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod config;
mod flow;
mod logging;


use crate::config::{LoadOptions, SECRET_ENV_PREFIX, Settings};
use crate::flow::{RunReport, validity_label};

#[derive(Parser)]
#[command(name = "keycheck")]
#[command(author, version, about = "Validate a license and activate this device", long_about = None)]
struct Cli {
    /// Directory containing settings.{yaml,toml,json} files.
    #[arg(long, env = "KEYCHECK_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment name selecting settings.<env>.* overrides.
    #[arg(long = "env", env = "KEYCHECK_ENV", default_value = "development")]
    environment: String,

    /// JSON file of secrets (license_key, activation_token).
    #[arg(long)]
    secrets: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Increase log verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.log_json, cli.verbose);

    match run(cli).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_failure(&err);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let secrets: Box<dyn SecretProvider> = match &cli.secrets {
        Some(path) => Box::new(FileProvider::load_from_file(path).await?),
        None => Box::new(EnvProvider::new(Some(SECRET_ENV_PREFIX.to_string()))),
    };

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => config::default_config_dir()?,
    };

    let options = LoadOptions::new(config_dir, cli.environment);
    let settings = Settings::load(&options, secrets.as_ref()).await?;

    let client = KeygenClient::new(settings.keygen_config())?;
    flow::run(&client, &settings).await
}

fn print_summary(report: &RunReport) {
    let mark = if report.valid {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!(
        "{} License {} ({})",
        mark,
        style(validity_label(report.valid)).bold(),
        report.code
    );
    match &report.machine_id {
        Some(id) => println!("  Activated this run: yes (machine {})", id),
        None => println!("  Activated this run: no"),
    }
}

fn report_failure(err: &Error) {
    match err {
        Error::Api {
            status,
            title,
            detail,
            code,
        } => error!(
            status,
            title = %title,
            detail = detail.as_deref().unwrap_or(""),
            code = code.as_deref().unwrap_or(""),
            "Licensing API error"
        ),
        other => error!(error = %other, "License check failed"),
    }
}
