use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, str::FromStr, sync::Arc};
use tracing::info;
use tripledice_execution::{AccountStore, GameRng, Memory, Remote, RetryPolicy};
use tripledice_simulator::{Api, Config, Simulator, StoreConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    port: Option<u16>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Load config, command line wins
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.json_logs |= args.json_logs;
    config.validate().context("invalid configuration")?;

    // Create logger
    let level = tracing::Level::from_str(&config.log_level)
        .with_context(|| format!("invalid log level: {}", config.log_level))?;
    let logger = tracing_subscriber::fmt().with_max_level(level);
    if config.json_logs {
        logger.json().init();
    } else {
        logger.init();
    }

    match config.store.clone() {
        StoreConfig::Memory => {
            let store = if config.seed_demo_accounts {
                Memory::with_demo_accounts()
            } else {
                Memory::new()
            };
            info!(accounts = store.len(), "using in-memory account store");
            serve(store, &config).await
        }
        StoreConfig::Remote { url, max_attempts } => {
            let store = Remote::new(&url)
                .with_context(|| format!("invalid store url: {url}"))?
                .with_retry_policy(RetryPolicy {
                    max_attempts,
                    ..RetryPolicy::default()
                });
            info!(url = %url, "using remote account store");
            serve(store, &config).await
        }
    }
}

async fn serve<S: AccountStore + 'static>(store: S, config: &Config) -> anyhow::Result<()> {
    let roller = match config.dice_seed {
        Some(seed) => GameRng::from_seed(seed),
        None => GameRng::from_entropy(),
    };
    let simulator = Arc::new(
        Simulator::new(store, roller, config.timing())
            .await
            .with_session_capacity(config.max_sessions),
    );
    let ticker = simulator.spawn_ticker(config.tick());

    let api = Api::new(simulator).with_rate_limit(config.rate_limit.clone());
    let app = api.router();

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        selecting_secs = config.selecting_secs,
        resolving_secs = config.resolving_secs,
        "Listening on {}",
        addr
    );
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("axum server error");
    ticker.abort();
    result
}
