//! Conexión a PostgreSQL
//!
//! Crea el pool y aplica las migraciones de `migrations/`.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::database::DatabaseConfig;

/// Crear el pool y dejar el esquema al día
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool> {
    info!("🔌 Connecting to {}", mask_database_url(database_url));

    let pool = DatabaseConfig::new(database_url)
        .create_pool()
        .await
        .context("Could not connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Could not run database migrations")?;

    info!("✅ Database ready");
    Ok(pool)
}

/// Función helper para enmascarar la URL de la base de datos en logs
fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
