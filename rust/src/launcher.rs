use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use crate::config_store::ConfigStore;
use crate::gemini::GeminiConnector;
use crate::generation::GenerationClient;
use crate::key_gate::KeyGate;
use crate::key_host::{HostKeyStore, KeyCapability};
use crate::logging;
use crate::path_utils::{get_base_dir, resolve_config_path};
use crate::server::{AppServer, AppState};
use crate::studio::LogoStudio;

#[derive(Debug, Default)]
pub struct Args {
    pub config: Option<String>,
}

pub fn parse_args() -> Args {
    parse_args_from(env::args().skip(1))
}

fn parse_args_from(args: impl IntoIterator<Item = String>) -> Args {
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(value) = args.next() {
                config = Some(value);
            }
        } else if let Some(value) = arg.strip_prefix("--config=") {
            config = Some(value.to_string());
        }
    }

    Args { config }
}

pub struct Launch {
    pub state: Arc<AppState>,
    pub server: AppServer,
}

/// Loads config, installs logging, wires the studio, and starts the server.
pub fn start(args: Args) -> Result<Launch> {
    let base_dir = get_base_dir();
    let config_path = resolve_config_path(args.config, &base_dir);

    let config = ConfigStore::new(config_path.clone())
        .with_context(|| format!("config error: {}", config_path.display()))?;

    if let Err(err) = logging::init(&config.log_level()) {
        eprintln!("{err}");
    }
    tracing::info!(config = %config_path.display(), "configuration loaded");

    let host = HostKeyStore::new(config.api_key_env(), config.api_key_file());
    if let Some(path) = host.key_file() {
        tracing::debug!(key_file = %path.display(), "API key file location");
    }
    let capability: Arc<dyn KeyCapability> = Arc::new(host);

    let gate = KeyGate::new(Some(capability.clone()));
    let client = GenerationClient::new(
        Some(capability),
        Arc::new(GeminiConnector::new(config.gemini_settings())),
        config.image_size(),
    );

    let state = Arc::new(AppState::new(LogoStudio::new(gate, client)));
    let server = AppServer::start(state.clone(), config.server_port())
        .context("failed to start the local web server")?;

    Ok(Launch { state, server })
}

/// Serves the page until Ctrl-C.
pub fn run_headless(args: Args) -> Result<()> {
    let Launch { mut server, .. } = start(args)?;

    println!("Logo Studio is running at {}", server.url());
    println!("Press Ctrl-C to stop.");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("failed to listen for Ctrl-C")?;

    tracing::info!("shutting down");
    server.stop();
    Ok(())
}
