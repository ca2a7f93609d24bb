use std::net::SocketAddr;
use std::sync::Arc;
use swap_campaign::{
    api, config::Config, db::init_db, Accumulator, CampaignService, InMemoryAccumulator,
    RedisAccumulator, Repository, SwapIngestor, SystemClock,
};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    let repo = Arc::new(Repository::new(pool));

    let accumulator: Arc<dyn Accumulator> = match config.redis_url.as_deref() {
        Some(url) => match RedisAccumulator::connect(url, config.redis_prefix.clone()).await {
            Ok(acc) => Arc::new(acc),
            Err(e) => {
                eprintln!("Failed to connect to Redis: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, live campaign state is kept in process memory");
            Arc::new(InMemoryAccumulator::new())
        }
    };

    let service = Arc::new(
        CampaignService::new(repo, accumulator, Arc::new(SystemClock))
            .with_settlement_interval(config.settlement_interval),
    );

    // Swap events flow through a bounded channel into a single ingestor
    let (swap_tx, swap_rx) = mpsc::channel(config.swap_channel_capacity);
    tokio::spawn(SwapIngestor::new(service.clone()).run(swap_rx));

    let app = api::create_router(api::AppState::new(service, swap_tx));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
