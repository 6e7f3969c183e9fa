use anyhow::{bail, Context};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use vro_driver::client_manager::ClientManager;
use vro_driver::{DriverConfig, DriverError, LifecycleController, StateStore, TcpReadinessProbe};

const USAGE: &str = "usage: vro-driver <create|destroy|status>";

fn load_config() -> anyhow::Result<DriverConfig> {
    match std::env::var("VRO_CONFIG_FILE") {
        Ok(path) if !path.trim().is_empty() => DriverConfig::from_file(&path)
            .with_context(|| format!("Failed to load config file {}", path)),
        _ => DriverConfig::from_env().context("Failed to load config from environment"),
    }
}

fn readiness_probe() -> anyhow::Result<TcpReadinessProbe> {
    let mut probe = TcpReadinessProbe::default();
    if let Ok(port) = std::env::var("READINESS_PORT") {
        probe.port = port
            .trim()
            .parse()
            .context("READINESS_PORT must be a port number")?;
    }
    if let Ok(secs) = std::env::var("READINESS_TIMEOUT") {
        let secs: u64 = secs
            .trim()
            .parse()
            .context("READINESS_TIMEOUT must be a number of seconds")?;
        probe.max_wait = Duration::from_secs(secs);
    }
    Ok(probe)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let command = std::env::args().nth(1).unwrap_or_default();
    let store = StateStore::from_env();
    let mut state = store
        .load()
        .with_context(|| format!("Failed to read state file {}", store.path().display()))?;

    if command == "status" {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }
    if command != "create" && command != "destroy" {
        bail!(USAGE);
    }

    let config = load_config()?;
    let backend = ClientManager::current_backend_name();
    let Some(client) = ClientManager::get_client(&backend, &config)
        .with_context(|| format!("Failed to set up the {} workflow backend", backend))?
    else {
        bail!("Unknown or unavailable workflow backend '{}'", backend);
    };
    info!("Using {} workflow backend", backend);

    let controller =
        LifecycleController::new(config, Arc::from(client), Arc::new(readiness_probe()?));

    let result = if command == "create" {
        controller.create(&mut state).await
    } else {
        controller.destroy(&mut state).await
    };

    // Persist even on failure so a half-created server can still be destroyed.
    store
        .save(&state)
        .with_context(|| format!("Failed to write state file {}", store.path().display()))?;

    if let Err(DriverError::Readiness {
        compensation: Some(cleanup),
        ..
    }) = &result
    {
        error!("Cleanup after readiness failure also failed: {}", cleanup);
    }
    result.with_context(|| format!("vro-driver {} failed", command))?;
    Ok(())
}
