//! Servicio de reservas
//!
//! Orquesta precio, ledger de disponibilidad y máquina de estados sobre los
//! repositorios. Toda autorización del ciclo de vida se decide aquí.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::boat::Boat;
use crate::models::booking::{
    generate_booking_number, Booking, BookingStatus, CancelledBy, EmergencyContact,
    ExperienceLevel, Participants, PaymentInfo, Review, SelectedService,
};
use crate::models::user::{Actor, UserRole};
use crate::repositories::{BoatRepository, BookingParty, BookingRepository};
use crate::services::availability_service::{
    AvailabilityLedger, MonthAvailability, RangeAvailability,
};
use crate::services::booking_state_machine::{
    BookingStateMachine, BookingTransition, CheckInData, CheckOutData, LedgerEffect,
};
use crate::services::pricing_service::{CancellationQuote, PricingCalculator};
use crate::utils::errors::{
    forbidden_error, internal_error, not_found_error, validation_error, AppError, AppResult,
};
use crate::utils::validation::YearMonth;

/// Servicio elegido por el locataire; el precio sale del catálogo del barco
#[derive(Debug, Clone)]
pub struct ServiceSelection {
    pub name: String,
    pub quantity: i32,
}

/// Datos de entrada de `create_booking`
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub boat_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub participants: Participants,
    pub emergency_contact: Option<EmergencyContact>,
    pub renter_experience: Option<ExperienceLevel>,
    pub special_requests: Option<String>,
    pub skipper_requested: bool,
    pub services: Vec<ServiceSelection>,
}

pub struct BookingService {
    boats: Arc<dyn BoatRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl BookingService {
    pub fn new(boats: Arc<dyn BoatRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { boats, bookings }
    }

    /// Crea una reserva `pending` y bloquea sus fechas en una sola operación
    pub async fn create_booking(&self, actor: Actor, request: BookingRequest) -> AppResult<Booking> {
        PricingCalculator::validate_range(request.start_date, request.end_date)?;

        let today = Utc::now().date_naive();
        if request.start_date < today {
            return Err(validation_error(
                "startDate",
                format!("Start date {} is in the past", request.start_date),
            ));
        }
        if request.participants.adults < 1 {
            return Err(validation_error(
                "participants.adults",
                "At least one adult is required",
            ));
        }
        if request.participants.children < 0 {
            return Err(validation_error(
                "participants.children",
                "Children count cannot be negative",
            ));
        }

        let boat = self.load_boat(request.boat_id).await?;

        if boat.is_owned_by(actor.user_id) {
            return Err(forbidden_error(
                "create booking",
                "owners cannot book their own boat",
            ));
        }
        if !boat.is_active {
            return Err(AppError::Conflict(format!(
                "Boat '{}' is not accepting bookings",
                boat.id
            )));
        }

        let total = request.participants.total();
        if total > i64::from(boat.capacity.max_people) {
            return Err(validation_error(
                "participants",
                format!(
                    "{} participants exceed the boat capacity of {}",
                    total, boat.capacity.max_people
                ),
            ));
        }

        let services = Self::resolve_services(&boat, &request.services)?;
        let pricing = PricingCalculator::booking_pricing(
            &boat.pricing,
            request.start_date,
            request.end_date,
            request.skipper_requested,
            &services,
        )?;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            booking_number: generate_booking_number(now),
            boat_id: boat.id,
            renter_id: actor.user_id,
            owner_id: boat.owner_id,
            start_date: request.start_date,
            end_date: request.end_date,
            participants: request.participants,
            pricing,
            status: BookingStatus::Pending,
            status_history: Vec::new(),
            emergency_contact: request.emergency_contact,
            renter_experience: request.renter_experience,
            special_requests: request.special_requests,
            skipper_requested: request.skipper_requested,
            additional_services: services,
            payment: PaymentInfo::default(),
            cancellation: None,
            check_in: None,
            check_out: None,
            renter_review: None,
            owner_review: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.bookings.create_with_reservation(&booking).await {
            if matches!(e, AppError::Conflict(_)) {
                warn!(
                    "⚠️ Reservation conflict on boat {} for {} → {}",
                    booking.boat_id, booking.start_date, booking.end_date
                );
            }
            return Err(e);
        }

        info!(
            "✅ Booking {} created for boat {} ({} → {}, total {} {})",
            booking.booking_number,
            booking.boat_id,
            booking.start_date,
            booking.end_date,
            booking.pricing.total_amount,
            booking.pricing.currency
        );
        Ok(booking)
    }

    /// Sólo el locataire, el propietario o un admin pueden ver la reserva
    pub async fn get_booking(&self, actor: Actor, booking_id: Uuid) -> AppResult<Booking> {
        let booking = self.load_booking(booking_id).await?;
        if !Self::is_party(&booking, actor) {
            return Err(forbidden_error(
                "view booking",
                "only the renter, the owner or an admin can view it",
            ));
        }
        Ok(booking)
    }

    pub async fn list_bookings(&self, actor: Actor, party: BookingParty) -> AppResult<Vec<Booking>> {
        self.bookings.list_for_user(actor.user_id, party).await
    }

    pub async fn confirm_booking(&self, actor: Actor, booking_id: Uuid) -> AppResult<Booking> {
        let booking = self.load_booking(booking_id).await?;
        Self::ensure_owner(&booking, actor, "confirm booking")?;
        self.transition(booking, BookingTransition::Confirm, Some(actor.user_id))
            .await
    }

    /// Anula y devuelve el desglose de gastos congelado en la reserva
    pub async fn cancel_booking(
        &self,
        actor: Actor,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<(Booking, CancellationQuote)> {
        let booking = self.load_booking(booking_id).await?;

        let cancelled_by = if actor.is_admin() {
            CancelledBy::Admin
        } else if booking.is_renter(actor.user_id) {
            CancelledBy::Renter
        } else if booking.is_owner(actor.user_id) {
            CancelledBy::Owner
        } else {
            return Err(forbidden_error(
                "cancel booking",
                "only the renter, the owner or an admin can cancel",
            ));
        };

        let transition = BookingTransition::Cancel {
            cancelled_by,
            reason,
            today: Utc::now().date_naive(),
            waive_fee: false,
        };
        let booking = self
            .transition(booking, transition, Some(actor.user_id))
            .await?;

        let quote = booking
            .cancellation
            .as_ref()
            .map(|c| CancellationQuote {
                days_until_start: c.days_until_start,
                fee_percentage: c.fee_percentage,
                cancellation_fee: c.cancellation_fee,
                refund_amount: c.refund_amount,
            })
            .ok_or_else(|| internal_error("Cancellation data missing after cancel"))?;

        Ok((booking, quote))
    }

    /// Gastos que tendría anular hoy, sin escribir nada
    pub async fn cancellation_quote(
        &self,
        actor: Actor,
        booking_id: Uuid,
    ) -> AppResult<CancellationQuote> {
        let booking = self.get_booking(actor, booking_id).await?;
        BookingStateMachine::validate(booking.status, BookingStatus::Cancelled)?;
        Ok(BookingStateMachine::cancellation_quote(
            &booking,
            Utc::now().date_naive(),
        ))
    }

    pub async fn check_in(
        &self,
        actor: Actor,
        booking_id: Uuid,
        data: CheckInData,
    ) -> AppResult<Booking> {
        Self::validate_fuel_level(data.fuel_level)?;
        let booking = self.load_booking(booking_id).await?;
        Self::ensure_owner(&booking, actor, "check in")?;
        self.transition(booking, BookingTransition::CheckIn(data), Some(actor.user_id))
            .await
    }

    pub async fn check_out(
        &self,
        actor: Actor,
        booking_id: Uuid,
        data: CheckOutData,
    ) -> AppResult<Booking> {
        Self::validate_fuel_level(data.fuel_level)?;
        let booking = self.load_booking(booking_id).await?;
        Self::ensure_owner(&booking, actor, "check out")?;
        self.transition(booking, BookingTransition::CheckOut(data), Some(actor.user_id))
            .await
    }

    pub async fn add_review(
        &self,
        actor: Actor,
        booking_id: Uuid,
        rating: u8,
        comment: Option<String>,
    ) -> AppResult<Booking> {
        if !(1..=5).contains(&rating) {
            return Err(validation_error("rating", "Rating must be between 1 and 5"));
        }

        let booking = self.load_booking(booking_id).await?;
        let as_renter = booking.is_renter(actor.user_id);
        if !as_renter && !booking.is_owner(actor.user_id) {
            return Err(forbidden_error(
                "review booking",
                "only the renter or the owner can review",
            ));
        }
        let party = if as_renter {
            BookingParty::Renter
        } else {
            BookingParty::Owner
        };

        let review = Review {
            rating,
            comment,
            reviewed_by: actor.user_id,
            created_at: Utc::now(),
        };
        // Estado `completed` y hueco vacío se comprueban en la misma escritura
        let booking = self.bookings.add_review(booking_id, party, &review).await?;

        info!(
            "⭐ Review {}/5 added to booking {} by {}",
            rating,
            booking.booking_number,
            if as_renter { "renter" } else { "owner" }
        );
        Ok(booking)
    }

    /// Punto de entrada del proveedor de pago
    pub async fn record_payment(
        &self,
        booking_id: Uuid,
        provider_reference: Option<String>,
    ) -> AppResult<Booking> {
        let booking = self.load_booking(booking_id).await?;
        self.transition(
            booking,
            BookingTransition::MarkPaid { provider_reference },
            None,
        )
        .await
    }

    pub async fn record_refund(
        &self,
        booking_id: Uuid,
        amount: Option<Decimal>,
    ) -> AppResult<Booking> {
        if let Some(amount) = amount {
            if amount < Decimal::ZERO {
                return Err(validation_error("amount", "Refund amount cannot be negative"));
            }
        }
        let booking = self.load_booking(booking_id).await?;
        self.transition(booking, BookingTransition::Refund { amount }, None)
            .await
    }

    /// Modo detallado: rango + precio
    pub async fn check_availability(
        &self,
        boat_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<RangeAvailability> {
        let boat = self.load_boat(boat_id).await?;
        AvailabilityLedger::range_availability(&boat, start, end)
    }

    /// Modo mensual: sólo booleano
    pub async fn check_month_availability(
        &self,
        boat_id: Uuid,
        month: &YearMonth,
    ) -> AppResult<MonthAvailability> {
        let boat = self.load_boat(boat_id).await?;
        Ok(AvailabilityLedger::month_availability(&boat, month))
    }

    /// Anula como sistema (sin gastos) las reservas `pending` creadas antes de
    /// `cutoff`. Devuelve cuántas anuló.
    pub async fn expire_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let stale = self.bookings.list_pending_created_before(cutoff).await?;
        let mut expired = 0;

        for booking in stale {
            let number = booking.booking_number.clone();
            let transition = BookingTransition::Cancel {
                cancelled_by: CancelledBy::System,
                reason: Some("Pending booking expired".to_string()),
                today: Utc::now().date_naive(),
                waive_fee: true,
            };
            match self.transition(booking, transition, None).await {
                Ok(_) => expired += 1,
                // Otro proceso la movió mientras tanto
                Err(AppError::Conflict(_)) | Err(AppError::InvalidTransition { .. }) => {
                    debug!("Skipping stale booking {}: status changed", number);
                }
                Err(e) => return Err(e),
            }
        }

        if expired > 0 {
            info!("🧹 Expired {} stale pending bookings", expired);
        }
        Ok(expired)
    }

    /// Anula por el sistema de gestión de barcos (borrado forzado)
    pub(crate) async fn cancel_for_boat_removal(
        &self,
        actor: Actor,
        booking: Booking,
    ) -> AppResult<Booking> {
        let cancelled_by = if actor.is_admin() {
            CancelledBy::Admin
        } else {
            CancelledBy::Owner
        };
        let transition = BookingTransition::Cancel {
            cancelled_by,
            reason: Some("Boat removed from the marketplace".to_string()),
            today: Utc::now().date_naive(),
            waive_fee: true,
        };
        self.transition(booking, transition, Some(actor.user_id))
            .await
    }

    async fn transition(
        &self,
        mut booking: Booking,
        transition: BookingTransition,
        performed_by: Option<Uuid>,
    ) -> AppResult<Booking> {
        let expected = booking.status;
        let effect = BookingStateMachine::apply(&mut booking, transition, performed_by, Utc::now())
            .map_err(|e| {
                if let AppError::InvalidTransition { current, requested } = &e {
                    warn!(
                        "⚠️ Booking {}: transition {} → {} rejected",
                        booking.booking_number, current, requested
                    );
                }
                e
            })?;

        self.bookings
            .save_transition(&booking, expected, &effect)
            .await?;
        if effect != LedgerEffect::None {
            debug!("Booking {} ledger effect applied: {:?}", booking.booking_number, effect);
        }

        info!(
            "🔄 Booking {}: {} → {}",
            booking.booking_number, expected, booking.status
        );
        Ok(booking)
    }

    async fn load_booking(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| not_found_error("Booking", booking_id))
    }

    async fn load_boat(&self, boat_id: Uuid) -> AppResult<Boat> {
        self.boats
            .find_by_id(boat_id)
            .await?
            .ok_or_else(|| not_found_error("Boat", boat_id))
    }

    fn is_party(booking: &Booking, actor: Actor) -> bool {
        actor.role == UserRole::Admin
            || booking.is_renter(actor.user_id)
            || booking.is_owner(actor.user_id)
    }

    fn ensure_owner(booking: &Booking, actor: Actor, operation: &str) -> AppResult<()> {
        if booking.is_owner(actor.user_id) {
            Ok(())
        } else {
            Err(forbidden_error(operation, "only the boat owner can do this"))
        }
    }

    fn validate_fuel_level(fuel_level: u8) -> AppResult<()> {
        if fuel_level > 100 {
            return Err(validation_error(
                "fuelLevel",
                "Fuel level must be a percentage between 0 and 100",
            ));
        }
        Ok(())
    }

    fn resolve_services(
        boat: &Boat,
        selections: &[ServiceSelection],
    ) -> AppResult<Vec<SelectedService>> {
        selections
            .iter()
            .map(|selection| {
                if selection.quantity < 1 {
                    return Err(validation_error(
                        "additionalServices",
                        format!("Quantity for '{}' must be at least 1", selection.name),
                    ));
                }
                let offer = boat.find_service(&selection.name).ok_or_else(|| {
                    validation_error(
                        "additionalServices",
                        format!("Service '{}' is not offered by this boat", selection.name),
                    )
                })?;
                Ok(SelectedService {
                    name: offer.name.clone(),
                    unit_price: offer.price,
                    quantity: selection.quantity,
                })
            })
            .collect()
    }
}
