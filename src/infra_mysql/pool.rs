use crate::settings::StorageSettings;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{Executor, MySqlPool};

const SERIALIZABLE: &str = "SET SESSION TRANSACTION ISOLATION LEVEL SERIALIZABLE";

pub async fn connect_pool(settings: &StorageSettings) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute(SERIALIZABLE).await?;
                Ok(())
            })
        })
        .connect(&settings.mysql_dsn)
        .await?;

    tracing::info!(
        max_connections = settings.max_connections,
        "mysql pool connected"
    );
    Ok(pool)
}
