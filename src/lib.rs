//! pushdeploy: publish a working copy to GitHub, trigger a Vercel
//! deployment of the pushed branch and refresh the StackBlitz project.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use error::{PushDeployError, Result};

use cli::Cli;
use config::Settings;
use services::run_pipeline;

/// Exit status when publishing failed
const EXIT_PUBLISH_FAILED: u8 = 1;
/// Exit status when settings are missing or invalid
const EXIT_CONFIG_ERROR: u8 = 2;

/// Parse arguments, run the pipeline and map the outcome to an exit status
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting pushdeploy {}", env!("CARGO_PKG_VERSION"));

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let config_error = e
                .downcast_ref::<PushDeployError>()
                .is_some_and(PushDeployError::is_config_error);
            if config_error {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load(&config::env_source(cli.env_file.as_deref()))?;
    cli.apply_overrides(&mut settings);

    let options = cli.run_options();
    if let Err(e) = services::publisher::set_transport_timeout(options.timeout) {
        tracing::warn!("Could not set git transport timeout: {}", e);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_pipeline(&settings, &options))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.render_lines() {
            println!("{}", line);
        }
    }

    if report.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PUBLISH_FAILED))
    }
}
