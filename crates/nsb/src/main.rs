use std::sync::Arc;

use tracing::warn;

use nsb_core::{
    config::Config,
    store::{UserGateway, UserStore},
};
use nsb_store::SqlUserStore;

mod health;

#[tokio::main]
async fn main() -> Result<(), nsb_core::Error> {
    nsb_core::logging::init("nsb")?;

    let cfg = Arc::new(Config::load()?);

    // A failed database setup is not fatal: the gateway runs cache-only.
    let durable: Option<Arc<dyn UserStore>> = match nsb_store::connect(&cfg.database_url).await {
        Ok(pool) => match nsb_store::ensure_schema(&pool).await {
            Ok(()) => Some(Arc::new(SqlUserStore::new(pool))),
            Err(e) => {
                warn!("schema setup failed: {e}");
                None
            }
        },
        Err(e) => {
            warn!("database connection failed: {e}");
            None
        }
    };

    let gateway = Arc::new(UserGateway::new(durable));
    gateway.probe().await;

    if let Err(e) = health::spawn(cfg.port).await {
        warn!("health endpoint failed to start: {e}");
    }

    nsb_telegram::router::run_polling(cfg, gateway)
        .await
        .map_err(|e| nsb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
