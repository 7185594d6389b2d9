//! Gestión de anuncios de barcos
//!
//! Alta, edición, borrado (duro o lógico), restauración y bloqueos manuales
//! del calendario por parte del propietario.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::boat::{
    BlockReason, Boat, BoatFilters, BoatPricing, BoatUpdate, NewBoat, UnavailablePeriod,
};
use crate::models::booking::BookingStatus;
use crate::models::user::{Actor, UserRole};
use crate::repositories::{BoatRepository, BookingRepository};
use crate::services::booking_service::BookingService;
use crate::services::booking_state_machine::BookingStateMachine;
use crate::utils::errors::{forbidden_error, not_found_error, validation_error, AppError, AppResult};

/// Resultado de `delete_boat`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum BoatRemoval {
    Deleted,
    Deactivated {
        #[serde(rename = "cancelledBookings")]
        cancelled_bookings: usize,
    },
}

pub struct BoatService {
    boats: Arc<dyn BoatRepository>,
    bookings: Arc<dyn BookingRepository>,
    booking_service: Arc<BookingService>,
}

impl BoatService {
    pub fn new(
        boats: Arc<dyn BoatRepository>,
        bookings: Arc<dyn BookingRepository>,
        booking_service: Arc<BookingService>,
    ) -> Self {
        Self {
            boats,
            bookings,
            booking_service,
        }
    }

    pub async fn create_boat(&self, actor: Actor, new_boat: NewBoat) -> AppResult<Boat> {
        if actor.role == UserRole::Renter {
            return Err(forbidden_error(
                "create boat",
                "requires the owner or admin role",
            ));
        }
        Self::validate_pricing(&new_boat.pricing)?;
        if new_boat.capacity.max_people < 1 {
            return Err(validation_error(
                "capacity.maxPeople",
                "A boat must carry at least one person",
            ));
        }

        let boat = new_boat.into_boat(actor.user_id);
        self.boats.insert(&boat).await?;

        info!("⛵ Boat {} '{}' listed by {}", boat.id, boat.name, actor.user_id);
        Ok(boat)
    }

    /// Los barcos desactivados sólo son visibles para su propietario y admins
    pub async fn get_boat(&self, actor: Option<Actor>, boat_id: Uuid) -> AppResult<Boat> {
        let boat = self.load_boat(boat_id).await?;
        if !boat.is_active && !actor.map_or(false, |a| Self::can_manage(&boat, a)) {
            return Err(not_found_error("Boat", boat_id));
        }
        Ok(boat)
    }

    pub async fn list_boats(
        &self,
        actor: Option<Actor>,
        mut filters: BoatFilters,
    ) -> AppResult<Vec<Boat>> {
        if let Some((start, end)) = filters.available_between {
            if end <= start {
                return Err(validation_error(
                    "availableTo",
                    "availableTo must be after availableFrom",
                ));
            }
        }

        // include_inactive sólo aplica a los barcos propios (o para admins)
        if filters.include_inactive {
            let allowed = match actor {
                Some(a) if a.is_admin() => true,
                Some(a) => filters.owner_id == Some(a.user_id),
                None => false,
            };
            filters.include_inactive = allowed;
        }

        self.boats.list(&filters).await
    }

    pub async fn update_boat(
        &self,
        actor: Actor,
        boat_id: Uuid,
        update: BoatUpdate,
    ) -> AppResult<Boat> {
        let mut boat = self.load_boat(boat_id).await?;
        self.ensure_can_manage(&boat, actor, "update boat")?;

        if let Some(pricing) = &update.pricing {
            Self::validate_pricing(pricing)?;
        }
        if update.max_people.map_or(false, |m| m < 1) {
            return Err(validation_error(
                "capacity.maxPeople",
                "A boat must carry at least one person",
            ));
        }

        update.apply_to(&mut boat);
        self.boats.update_listing(&boat).await?;

        info!("✏️ Boat {} updated by {}", boat.id, actor.user_id);
        Ok(boat)
    }

    /// Borra el barco si nunca tuvo reservas; si no, lo desactiva.
    ///
    /// Con `force` anula antes (sin gastos para el locataire) todas las
    /// reservas futuras que aún se pueden anular. Un alquiler en curso
    /// (`active`) impide el borrado.
    pub async fn delete_boat(
        &self,
        actor: Actor,
        boat_id: Uuid,
        force: bool,
    ) -> AppResult<BoatRemoval> {
        let boat = self.load_boat(boat_id).await?;
        self.ensure_can_manage(&boat, actor, "delete boat")?;

        let bookings = self.bookings.list_for_boat(boat_id).await?;
        if bookings.is_empty() {
            self.boats.delete(boat_id).await?;
            info!("🗑️ Boat {} deleted", boat_id);
            return Ok(BoatRemoval::Deleted);
        }

        let mut cancelled_bookings = 0;
        if force {
            if let Some(active) = bookings.iter().find(|b| b.status == BookingStatus::Active) {
                return Err(AppError::Conflict(format!(
                    "Boat '{}' has a rental in progress (booking {})",
                    boat_id, active.booking_number
                )));
            }

            let today = Utc::now().date_naive();
            for booking in bookings {
                let cancellable =
                    BookingStateMachine::can_transition(booking.status, BookingStatus::Cancelled);
                if cancellable && booking.end_date >= today {
                    self.booking_service
                        .cancel_for_boat_removal(actor, booking)
                        .await?;
                    cancelled_bookings += 1;
                }
            }
        }

        self.boats.set_active(boat_id, false).await?;
        info!(
            "📦 Boat {} deactivated ({} bookings cancelled)",
            boat_id, cancelled_bookings
        );
        Ok(BoatRemoval::Deactivated { cancelled_bookings })
    }

    pub async fn restore_boat(&self, actor: Actor, boat_id: Uuid) -> AppResult<Boat> {
        let boat = self.load_boat(boat_id).await?;
        self.ensure_can_manage(&boat, actor, "restore boat")?;

        if !boat.is_active {
            self.boats.set_active(boat_id, true).await?;
            info!("♻️ Boat {} restored", boat_id);
        }
        self.load_boat(boat_id).await
    }

    /// Bloqueo manual (mantenimiento o reserva del propietario)
    pub async fn add_blocked_period(
        &self,
        actor: Actor,
        boat_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        reason: BlockReason,
    ) -> AppResult<Boat> {
        if reason == BlockReason::Booked {
            return Err(validation_error(
                "reason",
                "Booked periods are created by bookings only",
            ));
        }
        if end < start {
            return Err(validation_error(
                "endDate",
                "endDate cannot be before startDate",
            ));
        }

        let boat = self.load_boat(boat_id).await?;
        self.ensure_can_manage(&boat, actor, "block dates")?;

        let period = UnavailablePeriod {
            start_date: start,
            end_date: end,
            reason,
            booking_id: None,
        };
        self.boats.add_blocked_period(boat_id, &period).await?;

        info!("🚧 Boat {} blocked {} → {} ({})", boat_id, start, end, reason);
        self.load_boat(boat_id).await
    }

    pub async fn remove_blocked_period(
        &self,
        actor: Actor,
        boat_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Boat> {
        let boat = self.load_boat(boat_id).await?;
        self.ensure_can_manage(&boat, actor, "unblock dates")?;

        let period_not_found = || {
            AppError::NotFound(format!(
                "No blocked period from {} to {} on boat '{}'",
                start, end, boat_id
            ))
        };
        let reason = boat
            .unavailable_periods
            .iter()
            .find(|p| p.start_date == start && p.end_date == end)
            .map(|p| p.reason)
            .ok_or_else(period_not_found)?;
        if reason == BlockReason::Booked {
            return Err(AppError::Conflict(format!(
                "Period {} → {} belongs to a booking; cancel the booking instead",
                start, end
            )));
        }

        // Se borra por motivo: un rango reservado entretanto no se toca
        let removed = self
            .boats
            .remove_blocked_period(boat_id, start, end, reason)
            .await?;
        if removed == 0 {
            return Err(period_not_found());
        }
        info!("🔓 Boat {} unblocked {} → {} ({})", boat_id, start, end, reason);
        self.load_boat(boat_id).await
    }

    async fn load_boat(&self, boat_id: Uuid) -> AppResult<Boat> {
        self.boats
            .find_by_id(boat_id)
            .await?
            .ok_or_else(|| not_found_error("Boat", boat_id))
    }

    fn can_manage(boat: &Boat, actor: Actor) -> bool {
        actor.is_admin() || boat.is_owned_by(actor.user_id)
    }

    fn ensure_can_manage(&self, boat: &Boat, actor: Actor, operation: &str) -> AppResult<()> {
        if Self::can_manage(boat, actor) {
            Ok(())
        } else {
            Err(forbidden_error(
                operation,
                "requires the boat owner or an admin",
            ))
        }
    }

    fn validate_pricing(pricing: &BoatPricing) -> AppResult<()> {
        if pricing.daily_rate <= Decimal::ZERO {
            return Err(validation_error(
                "pricing.dailyRate",
                "Daily rate must be greater than zero",
            ));
        }
        let optional_rates = [
            ("pricing.weeklyRate", pricing.weekly_rate),
            ("pricing.monthlyRate", pricing.monthly_rate),
        ];
        for (field, rate) in optional_rates {
            if rate.map_or(false, |r| r <= Decimal::ZERO) {
                return Err(validation_error(field, "Rate must be greater than zero"));
            }
        }
        if pricing.security_deposit < Decimal::ZERO || pricing.cleaning_fee < Decimal::ZERO {
            return Err(validation_error(
                "pricing",
                "Deposit and cleaning fee cannot be negative",
            ));
        }
        Ok(())
    }
}
