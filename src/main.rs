use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use shoplist::cli::args::Cli;
use shoplist::cli::commands;
use shoplist::config::{ColorSetting, Config, Paths};
use shoplist::connectivity::{Connectivity, ConnectivityMonitor, ConnectivityProbe, TcpProbe};
use shoplist::remote::{HttpStore, MemoryStore, RemoteStore};
use shoplist::session::{SessionOptions, ShoppingSession};
use shoplist::storage::Database;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(e) = result {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shoplist={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn apply_color(setting: ColorSetting) {
    match setting {
        ColorSetting::Auto => {},
        ColorSetting::Always => colored::control::set_override(true),
        ColorSetting::Never => colored::control::set_override(false),
    }
}

/// The backend client and a probe for it. Without a configured backend the
/// session runs offline and keeps every change queued.
fn connect(config: &Config) -> Result<(Arc<dyn RemoteStore>, Option<TcpProbe>)> {
    let Some(url) = config.sync.backend_url.as_deref() else {
        debug!("No backend configured, working offline");
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        return Ok((store, None));
    };

    let timeout = Duration::from_millis(config.sync.connect_timeout_ms);
    let request_timeout = Duration::from_millis(config.sync.request_timeout_ms);
    let store: Arc<dyn RemoteStore> = Arc::new(HttpStore::new(url, timeout, request_timeout)?);
    let probe = TcpProbe::for_url(url, timeout);
    if probe.is_none() {
        info!(%url, "Backend url has no host, working offline");
    }
    Ok((store, probe))
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(cli.home.clone())?;
    paths.ensure_dirs()?;
    let config = Config::load_from_path(&paths.config_file)?;
    apply_color(config.general.color);
    let format = cli.output.unwrap_or(config.general.default_output);

    let db = Arc::new(
        Database::open_at(&paths.database)
            .with_context(|| format!("Failed to open {}", paths.database.display()))?,
    );
    let (remote, probe) = connect(&config)?;

    let last = ShoppingSession::last_connectivity(&db)?.unwrap_or(Connectivity::Offline);
    let monitor = Arc::new(ConnectivityMonitor::new(last));
    let session = ShoppingSession::new(
        Arc::clone(&db),
        remote,
        monitor,
        SessionOptions::from(&config),
    )?;

    let online = match probe {
        Some(probe) if !cli.offline && !config.sync.force_offline => {
            tokio::task::spawn_blocking(move || probe.is_online())
                .await
                .context("Connectivity probe panicked")?
        },
        _ => false,
    };
    if let Some(outcome) = session.set_online(online).await? {
        if let Some(report) = outcome.report() {
            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                "Synced pending changes on reconnect"
            );
        }
    }

    let result = commands::run(&session, cli.command, format).await;
    session.persist()?;

    let output = result?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
