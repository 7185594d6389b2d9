//! Almacén en memoria
//!
//! Implementa los tres repositorios sobre un único `RwLock`. Cada operación
//! que toca varias entidades (reservar, transicionar, reseñar) lo hace bajo
//! un solo bloqueo de escritura.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::boat::{BlockReason, Boat, BoatFilters, UnavailablePeriod};
use crate::models::booking::{Booking, BookingStatus, Review};
use crate::models::user::User;
use crate::repositories::{
    already_reviewed_message, dates_unavailable_message, BoatRepository, BookingParty,
    BookingRepository, UserRepository,
};
use crate::services::availability_service::AvailabilityLedger;
use crate::services::booking_state_machine::LedgerEffect;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    boats: HashMap<Uuid, Boat>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl BoatRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Boat>> {
        Ok(self.state.read().await.boats.get(&id).cloned())
    }

    async fn list(&self, filters: &BoatFilters) -> AppResult<Vec<Boat>> {
        let state = self.state.read().await;
        let mut boats: Vec<Boat> = state
            .boats
            .values()
            .filter(|boat| filters.matches(boat))
            .cloned()
            .collect();
        newest_first(&mut boats, |b| b.created_at);

        let offset = filters.offset.unwrap_or(0).max(0) as usize;
        let limit = filters.limit.unwrap_or(i64::MAX).max(0) as usize;
        Ok(boats.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&self, boat: &Boat) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.boats.contains_key(&boat.id) {
            return Err(AppError::Conflict(format!("Boat '{}' already exists", boat.id)));
        }
        state.boats.insert(boat.id, boat.clone());
        Ok(())
    }

    async fn update_listing(&self, boat: &Boat) -> AppResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .boats
            .get_mut(&boat.id)
            .ok_or_else(|| not_found_error("Boat", boat.id))?;

        stored.name = boat.name.clone();
        stored.description = boat.description.clone();
        stored.boat_type = boat.boat_type;
        stored.location = boat.location.clone();
        stored.capacity = boat.capacity;
        stored.pricing = boat.pricing.clone();
        stored.additional_services = boat.additional_services.clone();
        stored.status = boat.status;
        stored.updated_at = boat.updated_at;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let boat = state
            .boats
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Boat", id))?;
        boat.is_active = is_active;
        boat.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.bookings.values().any(|b| b.boat_id == id) {
            return Err(AppError::Conflict(format!(
                "Boat '{}' is referenced by bookings and cannot be removed",
                id
            )));
        }
        state
            .boats
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("Boat", id))
    }

    async fn add_blocked_period(&self, boat_id: Uuid, period: &UnavailablePeriod) -> AppResult<()> {
        let mut state = self.state.write().await;
        let boat = state
            .boats
            .get_mut(&boat_id)
            .ok_or_else(|| not_found_error("Boat", boat_id))?;

        if let Some(conflict) = AvailabilityLedger::find_conflict(
            &boat.unavailable_periods,
            period.start_date,
            period.end_date,
        ) {
            return Err(AppError::Conflict(dates_unavailable_message(
                boat_id,
                period.start_date,
                period.end_date,
                conflict,
            )));
        }
        AvailabilityLedger::add_unavailable_period(&mut boat.unavailable_periods, period.clone());
        Ok(())
    }

    async fn remove_blocked_period(
        &self,
        boat_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        reason: BlockReason,
    ) -> AppResult<usize> {
        if reason == BlockReason::Booked {
            return Ok(0);
        }
        let mut state = self.state.write().await;
        Ok(match state.boats.get_mut(&boat_id) {
            Some(boat) => AvailabilityLedger::remove_period(
                &mut boat.unavailable_periods,
                start,
                end,
                reason,
            ),
            None => 0,
        })
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid, party: BookingParty) -> AppResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| match party {
                BookingParty::Renter => b.renter_id == user_id,
                BookingParty::Owner => b.owner_id == user_id,
            })
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| b.created_at);
        Ok(bookings)
    }

    async fn list_for_boat(&self, boat_id: Uuid) -> AppResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.boat_id == boat_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start_date);
        Ok(bookings)
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn create_with_reservation(&self, booking: &Booking) -> AppResult<()> {
        let mut state = self.state.write().await;
        let boat = state
            .boats
            .get_mut(&booking.boat_id)
            .ok_or_else(|| not_found_error("Boat", booking.boat_id))?;

        if let Some(conflict) = AvailabilityLedger::find_conflict(
            &boat.unavailable_periods,
            booking.start_date,
            booking.end_date,
        ) {
            return Err(AppError::Conflict(dates_unavailable_message(
                booking.boat_id,
                booking.start_date,
                booking.end_date,
                conflict,
            )));
        }

        AvailabilityLedger::add_unavailable_period(
            &mut boat.unavailable_periods,
            UnavailablePeriod::booked(booking.start_date, booking.end_date, booking.id),
        );
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn save_transition(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        effect: &LedgerEffect,
    ) -> AppResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let stored = state
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| not_found_error("Booking", booking.id))?;

        if stored.status != expected {
            return Err(AppError::Conflict(format!(
                "Booking '{}' changed concurrently: expected '{}', found '{}'",
                booking.id, expected, stored.status
            )));
        }

        match effect {
            LedgerEffect::None => {}
            LedgerEffect::ReleasePeriod {
                boat_id,
                booking_id,
                ..
            } => {
                if let Some(boat) = state.boats.get_mut(boat_id) {
                    AvailabilityLedger::release_booking(&mut boat.unavailable_periods, *booking_id);
                }
            }
            LedgerEffect::RecordRevenue {
                boat_id,
                amount,
                at,
            } => {
                let boat = state
                    .boats
                    .get_mut(boat_id)
                    .ok_or_else(|| not_found_error("Boat", *boat_id))?;
                boat.stats.record_rental(*amount, *at);
            }
        }

        *stored = booking.clone();
        Ok(())
    }

    async fn add_review(
        &self,
        booking_id: Uuid,
        party: BookingParty,
        review: &Review,
    ) -> AppResult<Booking> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| not_found_error("Booking", booking_id))?;

        if booking.status != BookingStatus::Completed {
            return Err(AppError::InvalidTransition {
                current: booking.status,
                requested: BookingStatus::Completed,
            });
        }
        let slot = match party {
            BookingParty::Renter => &mut booking.renter_review,
            BookingParty::Owner => &mut booking.owner_review,
        };
        if slot.is_some() {
            return Err(AppError::AlreadyReviewed(already_reviewed_message(booking_id, party)));
        }

        if party == BookingParty::Renter {
            let boat = state
                .boats
                .get_mut(&booking.boat_id)
                .ok_or_else(|| not_found_error("Boat", booking.boat_id))?;
            let owner = state
                .users
                .get_mut(&booking.owner_id)
                .ok_or_else(|| not_found_error("User", booking.owner_id))?;
            boat.rating = boat.rating.with_rating(review.rating);
            owner.rating = owner.rating.with_rating(review.rating);
        }

        *slot = Some(review.clone());
        booking.updated_at = review.created_at;
        Ok(booking.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                user.email
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }
}
