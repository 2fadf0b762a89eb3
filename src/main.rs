use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use researcher_matching::db::{establish_connection_pool, run_migrations};
use researcher_matching::models::config::ServerConfig;
use researcher_matching::processing::MatchingMessage;
use researcher_matching::processing::embedding::FastEmbedder;
use researcher_matching::processing::index::{SharedIndex, build_researcher_index};
use researcher_matching::processing::matching::MatchingOrchestrator;
use researcher_matching::processing::process_matching_message;
use researcher_matching::repository::DieselRepository;

const RECV_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Pause before receiving again, or `None` when the socket can never recover.
fn recv_retry_delay(error: zmq::Error) -> Option<Duration> {
    match error {
        zmq::Error::ETERM | zmq::Error::ENOTSOCK => None,
        _ => Some(RECV_RETRY_DELAY),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config_path = env::var("MATCHER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = match ServerConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = run_migrations(&pool) {
        log::error!("Failed to prepare database schema: {e}");
        std::process::exit(1);
    }
    let repo = Arc::new(DieselRepository::new(pool));

    let embedder = match FastEmbedder::from_model_name(
        &config.embedding_model,
        config.model_cache_dir.as_ref().map(PathBuf::from),
    ) {
        Ok(embedder) => Arc::new(embedder),
        Err(e) => {
            log::error!("Failed to configure embedder: {e}");
            std::process::exit(1);
        }
    };

    let index = match build_researcher_index(repo.as_ref(), embedder.as_ref(), &config.matching) {
        Ok(index) => Arc::new(SharedIndex::new(index)),
        Err(e) => {
            log::error!("Failed to build researcher index: {e}");
            std::process::exit(1);
        }
    };

    let orchestrator = Arc::new(MatchingOrchestrator::new(
        embedder,
        index,
        Arc::clone(&repo),
        config.matching.clone(),
    ));
    if let Err(e) = orchestrator.warm_up().await {
        log::error!("Failed to load embedding model: {e}");
        std::process::exit(1);
    }

    let context = zmq::Context::new();
    let responder = match context.socket(zmq::PULL) {
        Ok(socket) => socket,
        Err(e) => {
            log::error!("Cannot create zmq socket: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = responder.bind(&config.zmq_address) {
        log::error!("Cannot bind to {}: {e}", config.zmq_address);
        std::process::exit(1);
    }
    log::info!("Listening for matching messages on {}", config.zmq_address);

    loop {
        let msg = match responder.recv_bytes(0) {
            Ok(msg) => msg,
            Err(e) => match recv_retry_delay(e) {
                Some(delay) => {
                    log::error!("Failed to receive message: {e}");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                None => {
                    log::error!("ZeroMQ context terminated, stopping worker: {e}");
                    std::process::exit(1);
                }
            },
        };
        match serde_json::from_slice::<MatchingMessage>(&msg) {
            Ok(parsed) => {
                let orchestrator = Arc::clone(&orchestrator);
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    process_matching_message(parsed, &orchestrator, repo.as_ref()).await
                });
            }
            Err(e) => log::error!("Failed to parse JSON: {e}"),
        }
    }
}
