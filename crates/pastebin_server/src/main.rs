//! Headless API server entrypoint.

use pastebin_server::config::env_flag_enabled;
use pastebin_server::{
    open_store, resolve_bind_address, serve_router, spawn_sweep_task, AppState, Config, Pastebin,
    DEFAULT_PORT,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    sweep: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            "--sweep" => flags.sweep = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pastebin=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    let store = open_store(&config)?;

    if cli_flags.sweep {
        let pastebin = Pastebin::from_config(store, &config);
        let removed = tokio::task::spawn_blocking(move || pastebin.sweep_expired()).await??;
        println!("Removed {} expired paste(s)", removed);
        return Ok(());
    }

    let state = AppState::new(config.clone(), store);

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let sweeper = (config.sweep_interval_secs > 0).then(|| {
        tracing::info!(
            interval_secs = config.sweep_interval_secs,
            "Periodic expiry sweep enabled"
        );
        spawn_sweep_task(
            state.pastebin.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        )
    });

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!(
        backend = state.pastebin.store().backend_name(),
        "Pastebin running at http://{}",
        actual_addr
    );

    let serve_result = serve_router(listener, state, allow_public, shutdown_signal()).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("Server stopped");

    serve_result?;
    Ok(())
}

fn print_help() {
    println!("Pastebin Server\n");
    println!("Usage: pastebin [OPTIONS]\n");
    println!("Options:");
    println!("  --sweep           Remove expired pastes once and exit");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!("  DB_PATH           Database directory (default: ~/.cache/pastebin/db)");
    println!(
        "  PORT              Server port (default: {})",
        DEFAULT_PORT
    );
    println!("  MAX_PASTE_SIZE    Content bound in bytes; longer pastes are truncated (default: 100KB)");
    println!("  STORAGE_BACKEND   redb (default) or memory");
    println!("  SWEEP_INTERVAL_SECS  Seconds between expiry sweeps, 0 disables (default: 0)");
    println!("  MAX_ID_ATTEMPTS   Short id allocation attempts per paste (default: 20)");
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin");
    println!(
        "  BIND              Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
