//! postd — coordinates a single in-flight "post new content" workflow
//! between a host surface and a posting-application surface.
//!
//! The daemon is driven over browser native-messaging frames on
//! stdin/stdout; a browser-side shim performs the actual tab and window
//! calls and reports surface activity back. Logs go to stderr — stdout
//! belongs to the wire.

mod broker;
mod config;
mod coordinator;
mod monitor;
mod protocol;
mod router;
mod runtime;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::runtime::stdio::NativeRuntime;

#[derive(Debug, Parser)]
#[command(
    name = "postd",
    version,
    about = "Single-flight posting-workflow coordinator"
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL for posting-application locations.
    #[arg(long, value_name = "URL")]
    app_base_url: Option<String>,

    /// Application opened when a trigger names none.
    #[arg(long, value_name = "NAME")]
    default_app: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::FAILURE;
        }
    };
    config.apply_overrides(cli.app_base_url, cli.default_app);
    info!(
        app_base_url = %config.app_base_url,
        default_app = %config.default_app,
        "postd starting"
    );

    let (native, channels) = NativeRuntime::spawn(tokio::io::stdin(), tokio::io::stdout());
    Coordinator::new(Arc::new(native), &config).run(channels).await;

    ExitCode::SUCCESS
}
