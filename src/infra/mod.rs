pub mod http_client;
pub mod supabase_store;

use crate::app::ports::AlertStore;
use crate::config::{Config, StoreBackend};
use crate::error::{AlertError, Result};
use std::sync::Arc;

/// Builds the configured alerts table backend.
pub async fn build_store(config: &Config) -> Result<Arc<dyn AlertStore>> {
    match config.backend {
        StoreBackend::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .ok_or_else(|| AlertError::Config("Supabase settings missing".to_string()))?;
            Ok(Arc::new(supabase_store::SupabaseAlertStore::new(
                supabase,
                config.table.clone(),
            )))
        }
        StoreBackend::Libsql => libsql_store(config).await,
    }
}

#[cfg(feature = "db")]
async fn libsql_store(config: &Config) -> Result<Arc<dyn AlertStore>> {
    let libsql = config
        .libsql
        .as_ref()
        .ok_or_else(|| AlertError::Config("libSQL settings missing".to_string()))?;
    let store = crate::db::LibsqlAlertStore::connect(libsql, config.table.clone()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "db"))]
async fn libsql_store(_config: &Config) -> Result<Arc<dyn AlertStore>> {
    Err(AlertError::Config(
        "ALERTS_STORE=libsql requires building with the `db` feature".to_string(),
    ))
}
