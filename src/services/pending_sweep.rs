//! Barrido periódico de reservas `pending` caducadas

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::services::booking_service::BookingService;

pub fn spawn_pending_sweep(
    service: Arc<BookingService>,
    ttl: chrono::Duration,
    every: Duration,
) -> JoinHandle<()> {
    info!(
        "🧹 Pending booking sweep enabled (ttl {}h, every {}s)",
        ttl.num_hours(),
        every.as_secs()
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - ttl;
            if let Err(e) = service.expire_stale_pending(cutoff).await {
                error!("❌ Pending booking sweep failed: {}", e);
            }
        }
    })
}
