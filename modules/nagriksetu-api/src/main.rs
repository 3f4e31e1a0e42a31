use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nagriksetu_api::{router, AppState};
use nagriksetu_common::{Config, LogFormat, StoreBackend};
use nagriksetu_intake::{DedupEngine, IngestionGateway};
use nagriksetu_store::{MemoryTicketStore, PgTicketStore, TicketStore};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn TicketStore>> {
    match config.store {
        StoreBackend::Postgres => {
            let db = config
                .database
                .as_ref()
                .context("database settings are required for the postgres store")?;
            let store =
                PgTicketStore::connect(db, config.db_max_connections, config.store_timeout)
                    .await
                    .context("failed to connect to database")?;
            store.migrate().await.context("failed to run migrations")?;
            info!("Database migrations applied");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory ticket store, tickets will not survive a restart");
            Ok(Arc::new(MemoryTicketStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    config.log_keys();

    let store = open_store(&config).await?;
    let engine = DedupEngine::new(store).with_timeout(config.store_timeout);
    let state = Arc::new(AppState {
        gateway: IngestionGateway::new(engine),
    });

    let app = router(state);

    let addr = config.bind_addr();
    info!("NagrikSetu API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
