use clap::Parser;
use snippet_exec::ExecutorConfig;
use snippet_exec_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// TOML file with timeouts and language wiring
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run step timeout in seconds, overrides the config file
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Compile step timeout in seconds, overrides the config file
    #[arg(long)]
    compile_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExecutorConfig::load(path).await?,
        None => ExecutorConfig::default(),
    };
    if let Some(secs) = args.run_timeout {
        config.run_timeout_secs = secs;
    }
    if let Some(secs) = args.compile_timeout {
        config.compile_timeout_secs = secs;
    }

    let app = create_app(&config)?;
    run_server(app, args.addr).await?;

    Ok(())
}
