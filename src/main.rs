use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use boat_marketplace::config::environment::{EnvironmentConfig, StorageBackend};
use boat_marketplace::database::connect_and_migrate;
use boat_marketplace::services::pending_sweep::spawn_pending_sweep;
use boat_marketplace::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging (RUST_LOG manda; info por defecto)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("⛵ Boat Marketplace API");
    info!("================================================");

    let config = EnvironmentConfig::from_env().context("Invalid configuration")?;
    info!("🌍 Entorno: {} ({:?})", config.environment, config.storage_backend);

    let state = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .clone()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=postgres")?;
            let pool = match connect_and_migrate(&database_url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(e);
                }
            };
            AppState::with_postgres(config.clone(), pool)
        }
        StorageBackend::Memory => {
            warn!("⚠️ Almacén en memoria: los datos se pierden al reiniciar");
            AppState::in_memory(config.clone())
        }
    };

    let sweep = config.pending_booking_ttl().map(|ttl| {
        spawn_pending_sweep(
            state.booking_service.clone(),
            ttl,
            config.pending_sweep_interval(),
        )
    });

    let app = create_router(state);

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("Invalid HOST/PORT: {}", config.server_url()))?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("👤 Auth:");
    info!("   POST /api/auth/register - Registro");
    info!("   POST /api/auth/login - Login");
    info!("   GET  /api/auth/me - Usuario actual");
    info!("⛵ Barcos:");
    info!("   GET  /api/boats - Buscar barcos");
    info!("   POST /api/boats - Publicar barco");
    info!("   GET|PUT|DELETE /api/boats/:id - Ver / editar / retirar");
    info!("   POST /api/boats/:id/restore - Reactivar");
    info!("   POST|DELETE /api/boats/:id/blocked-periods - Bloquear / liberar fechas");
    info!("   GET  /api/boats/:id/availability - Disponibilidad y precio");
    info!("   GET  /api/boats/:id/availability/month - Disponibilidad mensual");
    info!("📅 Reservas:");
    info!("   POST /api/bookings - Reservar");
    info!("   GET  /api/bookings - Mis reservas (?as=renter|owner)");
    info!("   GET  /api/bookings/:id - Detalle");
    info!("   GET  /api/bookings/:id/cancellation-quote - Simular anulación");
    info!("   POST /api/bookings/:id/{{confirm,cancel,check-in,check-out,review}}");
    info!("💳 Pagos:");
    info!("   POST /api/payments/webhook - Callback del proveedor");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    if let Some(handle) = sweep {
        handle.abort();
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
