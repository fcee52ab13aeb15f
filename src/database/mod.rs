pub mod models;
pub mod pg_store;
pub mod store;

#[cfg(test)]
pub mod memory;

use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use crate::config::DatabaseConfig;

pub use models::{NewRecord, RecordQuery, RecordView, ZoneId, ZoneSummary};
pub use pg_store::PgStore;
pub use store::ZoneStore;

pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let options = match &config.url {
        Some(url) => url.parse::<PgConnectOptions>()?,
        None => PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.name)
            .password(&config.resolve_password()?),
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect_with(options)
        .await?;

    info!("Connected to zone database");
    Ok(pool)
}
