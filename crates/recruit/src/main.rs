use std::sync::Arc;

use recruit_core::{config::Config, ports::UnitOfWork, storage::MemoryStore};

#[tokio::main]
async fn main() -> Result<(), recruit_core::Error> {
    recruit_core::logging::init("recruit")?;

    let cfg = Arc::new(Config::load()?);

    let store = match &cfg.store_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "using file-backed store");
            MemoryStore::open(path.clone()).await?
        }
        None => {
            tracing::warn!("STORE_FILE not set; applications are kept in memory only");
            MemoryStore::new()
        }
    };
    let uow: Arc<dyn UnitOfWork> = Arc::new(store);

    recruit_telegram::router::run_polling(cfg, uow)
        .await
        .map_err(|e| recruit_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
