use anyhow::{anyhow, Result};
use hostcrab::host_store::{DynHostStore, HostStore};
use hostcrab::{Config, Shared};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("hostcrab".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let host_store = host_store_init(&config).await?;
    let diagnostics = tracing::dispatcher::get_default(Clone::clone);

    let dns_server =
        hostcrab::dns::new(config.clone(), host_store.clone(), diagnostics.clone()).await?;
    tracing::info!(
        "DNS listening on UDP {} and TCP {}",
        dns_server.udp_local_addr()?,
        dns_server.tcp_local_addr()?
    );
    let dns_handle = tokio::spawn(dns_server.run());

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = hostcrab::api::new(config.clone(), host_store.clone(), diagnostics);
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(dns_res) = dns_handle => {
            if let Err(err) = dns_res {
                return Err(err.into())
            }
        }
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostcrab=info".into()),
        )
        .init();
}

async fn host_store_init(config: &Config) -> Result<DynHostStore> {
    let host_store = config.host_store().await?;
    let count = host_store.read().await.hosts().await?.len();
    match &config.host_store_state_path {
        Some(path) => tracing::info!("serving {count} hosts, persisted to {path}"),
        None => tracing::info!("serving {count} hosts from memory, changes are lost on exit"),
    }
    Ok(host_store)
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}
