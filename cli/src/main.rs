//! `bt` command-line host.
//!
//! Runs one chat command given as arguments, or replies to each line read
//! from stdin when no command is given. Settings come from an optional TOML
//! file with flag and env overrides layered on top.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use bt_core::{handle_command, read_config, ConfigError, PanelClient, PanelConfig, TokenMode};
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "bt_core=info,bt=info";

#[derive(Debug, Parser)]
#[command(name = "bt", about = "Query a BT Panel with chat-style commands", long_about = None)]
struct Cli {
    /// TOML file with base_url, api_key and optional settings
    #[arg(short, long, env = "BT_PANEL_CONFIG")]
    config: Option<PathBuf>,

    /// Panel address, e.g. https://1.2.3.4:8888
    #[arg(long, env = "BT_PANEL_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "BT_PANEL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// time+key or time+md5key
    #[arg(long)]
    token_mode: Option<TokenMode>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Command words, e.g. `bt status`. Reads stdin when empty.
    command: Vec<String>,
}

impl Cli {
    fn panel_config(&self) -> Result<PanelConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => PanelConfig::new("", ""),
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(mode) = self.token_mode {
            config.token_mode = mode;
        }
        if let Some(seconds) = self.timeout {
            config.timeout_seconds = seconds;
        }
        if self.insecure {
            config.verify_tls = false;
        }
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = match cli.panel_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(?config, "configuration loaded");
    let client = PanelClient::new(config);

    if !cli.command.is_empty() {
        println!("{}", handle_command(&client, &cli.command.join(" ")));
        return ExitCode::SUCCESS;
    }

    let stdout = io::stdout();
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("failed to read stdin: {e}");
                return ExitCode::FAILURE;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let mut out = stdout.lock();
        if writeln!(out, "{}\n", handle_command(&client, &line)).is_err() {
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
