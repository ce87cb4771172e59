//! Decision Bouncer CLI
//!
//! A command-line tool for querying the decision API: one-shot lookups of a
//! single identity, and following the decision stream from a terminal.

mod commands;
mod output;

use anyhow::Result;
use bouncer_lib::transport::{self, AuthMode};
use bouncer_lib::ApiClient;
use clap::{Parser, Subcommand};
use commands::{check, watch};

const USER_AGENT: &str = concat!("dbc-cli/", env!("CARGO_PKG_VERSION"));

/// Decision Bouncer CLI
#[derive(Parser)]
#[command(name = "dbc")]
#[command(author, version, about = "CLI for the decision bouncer", long_about = None)]
pub struct Cli {
    /// Decision API URL (can also be set via DBC_API_URL env var)
    #[arg(long, env = "DBC_API_URL", default_value = "http://localhost:8080/")]
    pub api_url: String,

    /// API key for the decision API
    #[arg(long, env = "DBC_API_KEY")]
    pub api_key: String,

    /// Skip server certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up the decisions currently affecting an identity
    Check {
        /// Identity to look up (an IP address by default)
        value: String,

        /// Decision scope ("ip", "range", "username"...)
        #[arg(long)]
        scope: Option<String>,

        /// Remediation type to filter on ("ban", "captcha"...)
        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// Follow the decision stream and print each delta
    Watch {
        /// Polling interval (e.g. 10s, 1m)
        #[arg(long, default_value = "10s")]
        interval: String,

        /// Keep retrying the initial fetch instead of failing fast
        #[arg(long)]
        startup_retry: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let auth = AuthMode::resolve(Some(cli.api_key.as_str()), None, None)?;
    let mut api_url = cli.api_url.clone();
    if !api_url.ends_with('/') {
        api_url.push('/');
    }
    let http = transport::build_client(&auth, USER_AGENT, None, cli.insecure)?;
    let client = ApiClient::new(http, &api_url)?;

    match cli.command {
        Commands::Check { value, scope, kind } => {
            check::run(client, &value, scope, kind, cli.format).await?;
        }
        Commands::Watch {
            interval,
            startup_retry,
        } => {
            let interval = humantime::parse_duration(&interval)?;
            watch::run(client, interval, startup_retry, cli.format).await?;
        }
    }

    Ok(())
}
