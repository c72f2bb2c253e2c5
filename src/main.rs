use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use polls::config::Config;
use polls::error::ServerError;
use polls::store::{MemoryStore, PollStore};
use polls::web::{self, db};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polls=info,warp=info"));

    if env::var("POLLS_LOG_JSON").is_ok() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

async fn run() -> Result<(), ServerError> {
    let config = Config::load()?;

    let store: Arc<dyn PollStore> = match &config.database_url {
        Some(url) => Arc::new(db::PgStore::new(db::create_pool(url, config.pool_size)?)),
        None => {
            warn!("DATABASE_URL not set, questions and votes are kept in memory only");
            Arc::new(MemoryStore::new())
        },
    };

    web::serve(store, &config).await
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting polls server");

    if let Err(err) = run().await {
        error!(error = %err, "Server failed");
        std::process::exit(1);
    }
}
