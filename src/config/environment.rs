//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Los valores obligatorios ausentes se devuelven como error, nunca como panic.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Dónde viven los datos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("Unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub bcrypt_cost: u32,
    pub payment_webhook_secret: String,
    /// `None` desactiva el barrido de reservas pendientes
    pub pending_booking_ttl_hours: Option<u64>,
    pub pending_sweep_interval_secs: u64,
}

impl Default for EnvironmentConfig {
    /// Valores de desarrollo; los tests los usan tal cual
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            database_url: None,
            storage_backend: StorageBackend::Memory,
            jwt_secret: "development-secret-change-me".to_string(),
            jwt_expiration: 86_400,
            bcrypt_cost: 4,
            payment_webhook_secret: "development-webhook-secret".to_string(),
            pending_booking_ttl_hours: None,
            pending_sweep_interval_secs: 300,
        }
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} must be a valid value: {}", key, e)),
        Err(_) => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Cargar desde el entorno (tras `dotenvy::dotenv()`)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let storage_backend: StorageBackend = parsed_or("STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORAGE_BACKEND=postgres"));
        }

        let pending_booking_ttl_hours = match env::var("PENDING_BOOKING_TTL_HOURS") {
            Ok(raw) => Some(
                raw.trim()
                    .parse()
                    .context("PENDING_BOOKING_TTL_HOURS must be a valid number")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parsed_or("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            database_url,
            storage_backend,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration: parsed_or("JWT_EXPIRATION", defaults.jwt_expiration)?,
            bcrypt_cost: parsed_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            payment_webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
            pending_booking_ttl_hours,
            pending_sweep_interval_secs: parsed_or(
                "PENDING_SWEEP_INTERVAL_SECS",
                defaults.pending_sweep_interval_secs,
            )?,
        })
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pending_booking_ttl(&self) -> Option<chrono::Duration> {
        self.pending_booking_ttl_hours
            .map(|hours| chrono::Duration::hours(hours as i64))
    }

    pub fn pending_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.pending_sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "postgres".parse::<StorageBackend>().ok(),
            Some(StorageBackend::Postgres)
        );
        assert_eq!(
            "Memory".parse::<StorageBackend>().ok(),
            Some(StorageBackend::Memory)
        );
        assert!("mongodb".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_defaults_disable_sweep() {
        let config = EnvironmentConfig::default();
        assert!(config.pending_booking_ttl().is_none());
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert_eq!(config.environment, "development");
    }
}
