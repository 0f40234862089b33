use equiledger::broker::{CredentialProvider, FileTokenProvider, StaticTokenProvider};
use equiledger::normalizer::{FieldMap, Normalizer};
use equiledger::orchestration::EventProcessor;
use equiledger::stream::StreamSupervisor;
use equiledger::{config::Config, db::init_db, AccountId, Repository};
use std::sync::Arc;
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

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let normalizer = Arc::new(Normalizer::new(
        FieldMap::default(),
        AccountId::new(config.account_id.clone()),
    ));
    let credentials: Arc<dyn CredentialProvider> = match &config.access_token_path {
        Some(path) => Arc::new(FileTokenProvider::new(path)),
        None => match std::env::var("ACCESS_TOKEN") {
            Ok(token) => Arc::new(StaticTokenProvider::new(token)),
            Err(_) => {
                eprintln!("Either ACCESS_TOKEN_PATH or ACCESS_TOKEN must be set");
                std::process::exit(1);
            }
        },
    };

    let (events_tx, events_rx) = mpsc::channel(256);
    let processor = EventProcessor::new(repo, &config);
    let supervisor = StreamSupervisor::new(
        config.stream_config(),
        credentials,
        normalizer,
        events_tx,
    );

    let processor_task = tokio::spawn(async move { processor.run(events_rx).await });

    tracing::info!("ledger stream starting for account {}", config.account_id);

    if let Err(e) = supervisor.run().await {
        eprintln!("Stream supervisor error: {}", e);
        std::process::exit(1);
    }

    let _ = processor_task.await;
}
