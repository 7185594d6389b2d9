//! Repositorios
//!
//! Contratos de persistencia del core. `PgBoatRepository`,
//! `PgBookingRepository` y `PgUserRepository` los implementan sobre
//! PostgreSQL; `InMemoryStore` los implementa en memoria para tests y para
//! `STORAGE_BACKEND=memory`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::boat::{BlockReason, Boat, BoatFilters, UnavailablePeriod};
use crate::models::booking::{Booking, BookingStatus, Review};
use crate::models::user::User;
use crate::services::booking_state_machine::LedgerEffect;
use crate::utils::errors::AppResult;

pub mod boat_repository;
pub mod booking_repository;
pub mod memory_store;
pub mod user_repository;

pub use boat_repository::PgBoatRepository;
pub use booking_repository::PgBookingRepository;
pub use memory_store::InMemoryStore;
pub use user_repository::PgUserRepository;

/// Lado de la reserva: para listar o para elegir el hueco de reseña
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingParty {
    Renter,
    Owner,
}

#[async_trait]
pub trait BoatRepository: Send + Sync {
    /// Devuelve el barco con sus periodos bloqueados
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Boat>>;

    async fn list(&self, filters: &BoatFilters) -> AppResult<Vec<Boat>>;

    async fn insert(&self, boat: &Boat) -> AppResult<()>;

    /// Actualiza los campos del anuncio; no toca periodos ni estadísticas
    async fn update_listing(&self, boat: &Boat) -> AppResult<()>;

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Inserta un periodo no reservado (mantenimiento / bloqueo del propietario),
    /// rechazando con Conflict si pisa cualquier periodo existente.
    async fn add_blocked_period(&self, boat_id: Uuid, period: &UnavailablePeriod) -> AppResult<()>;

    /// Quita el bloqueo manual con inicio, fin y motivo exactos. Nunca
    /// toca un periodo `booked`; sin coincidencia no hace nada.
    async fn remove_blocked_period(
        &self,
        boat_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        reason: BlockReason,
    ) -> AppResult<usize>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>>;

    async fn list_for_user(&self, user_id: Uuid, party: BookingParty) -> AppResult<Vec<Booking>>;

    async fn list_for_boat(&self, boat_id: Uuid) -> AppResult<Vec<Booking>>;

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Booking>>;

    /// Comprobación de disponibilidad + inserción de la reserva + periodo
    /// "booked", todo en una sola operación atómica. Conflict si el rango ya
    /// no está libre.
    async fn create_with_reservation(&self, booking: &Booking) -> AppResult<()>;

    /// Guarda la reserva sólo si su estado persistido sigue siendo `expected`
    /// y aplica `effect` sobre el barco en la misma operación: o se escriben
    /// ambos o ninguno.
    async fn save_transition(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        effect: &LedgerEffect,
    ) -> AppResult<()>;

    /// Rellena la reseña de `party` si la reserva está `completed` y ese hueco
    /// sigue vacío (AlreadyReviewed si no). La reseña del locataire suma
    /// también a la valoración del barco y del propietario.
    async fn add_review(
        &self,
        booking_id: Uuid,
        party: BookingParty,
        review: &Review,
    ) -> AppResult<Booking>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn insert(&self, user: &User) -> AppResult<()>;
}

/// Mensaje común para rangos ocupados
pub(crate) fn dates_unavailable_message(
    boat_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    conflict: &UnavailablePeriod,
) -> String {
    format!(
        "Boat '{}' is not available from {} to {}: blocked from {} to {} ({})",
        boat_id, start, end, conflict.start_date, conflict.end_date, conflict.reason
    )
}

/// Violación de la restricción EXCLUDE sobre periodos solapados
pub(crate) fn is_overlap_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23P01"),
        _ => false,
    }
}

/// Reseña ya escrita para ese lado
pub(crate) fn already_reviewed_message(booking_id: Uuid, party: BookingParty) -> String {
    let side = match party {
        BookingParty::Renter => "renter",
        BookingParty::Owner => "owner",
    };
    format!("Booking '{}' already has a {} review", booking_id, side)
}

/// Violación de clave foránea (p. ej. borrar un barco con reservas)
pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.is_foreign_key_violation(),
        _ => false,
    }
}
