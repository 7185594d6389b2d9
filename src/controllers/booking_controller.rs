use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::booking_dto::{
    BookingListQuery, BookingResponse, CancelBookingRequest, CancellationResponse,
    CreateBookingRequest, InspectionRequest, ReviewRequest,
};
use crate::dto::ApiResponse;
use crate::models::booking::{BoatCondition, Damage, ExperienceLevel};
use crate::models::user::Actor;
use crate::repositories::BookingParty;
use crate::services::availability_service::{MonthAvailability, RangeAvailability};
use crate::services::booking_service::{BookingRequest, BookingService, ServiceSelection};
use crate::services::booking_state_machine::{CheckInData, CheckOutData};
use crate::services::pricing_service::CancellationQuote;
use crate::state::AppState;
use crate::utils::errors::{field_error, validation_error, AppResult};
use crate::utils::validation::{parse_date_field, YearMonth};

pub struct BookingController {
    service: Arc<BookingService>,
}

impl BookingController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.booking_service.clone(),
        }
    }

    pub async fn create(
        &self,
        actor: Actor,
        request: CreateBookingRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;
        for service in &request.additional_services {
            service.validate()?;
        }

        let renter_experience = match request.renter_experience.as_deref() {
            Some(label) => Some(ExperienceLevel::from_label(label).ok_or_else(|| {
                validation_error(
                    "renterExperience",
                    format!("Unknown experience level '{}'", label),
                )
            })?),
            None => None,
        };

        let booking_request = BookingRequest {
            boat_id: request.boat_id,
            start_date: parse_date_field("startDate", &request.start_date)?,
            end_date: parse_date_field("endDate", &request.end_date)?,
            participants: request.participants.into(),
            emergency_contact: request.emergency_contact.map(Into::into),
            renter_experience,
            special_requests: request.special_requests,
            skipper_requested: request.skipper_requested,
            services: request
                .additional_services
                .into_iter()
                .map(|s| ServiceSelection {
                    name: s.name,
                    quantity: s.quantity,
                })
                .collect(),
        };

        let booking = self.service.create_booking(actor, booking_request).await?;
        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking created, waiting for the owner's confirmation",
        ))
    }

    pub async fn list(
        &self,
        actor: Actor,
        query: BookingListQuery,
    ) -> AppResult<Vec<BookingResponse>> {
        let party = match query.as_party.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("renter") | Some("locataire") => BookingParty::Renter,
            Some("owner") | Some("propriétaire") | Some("proprietaire") => BookingParty::Owner,
            Some(other) => {
                return Err(validation_error(
                    "as",
                    format!("Unknown booking side '{}', expected renter or owner", other),
                ))
            }
        };

        let bookings = self.service.list_bookings(actor, party).await?;
        Ok(bookings.into_iter().map(BookingResponse::from).collect())
    }

    pub async fn get(&self, actor: Actor, booking_id: Uuid) -> AppResult<BookingResponse> {
        Ok(self.service.get_booking(actor, booking_id).await?.into())
    }

    pub async fn cancellation_quote(
        &self,
        actor: Actor,
        booking_id: Uuid,
    ) -> AppResult<CancellationQuote> {
        self.service.cancellation_quote(actor, booking_id).await
    }

    pub async fn confirm(
        &self,
        actor: Actor,
        booking_id: Uuid,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        let booking = self.service.confirm_booking(actor, booking_id).await?;
        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking confirmed",
        ))
    }

    pub async fn cancel(
        &self,
        actor: Actor,
        booking_id: Uuid,
        request: CancelBookingRequest,
    ) -> AppResult<ApiResponse<CancellationResponse>> {
        request.validate()?;
        let (booking, quote) = self
            .service
            .cancel_booking(actor, booking_id, request.reason)
            .await?;

        Ok(ApiResponse::success_with_message(
            CancellationResponse {
                booking: booking.into(),
                cancellation: quote,
            },
            "Booking cancelled",
        ))
    }

    pub async fn check_in(
        &self,
        actor: Actor,
        booking_id: Uuid,
        request: InspectionRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;
        let data = CheckInData {
            boat_condition: Self::parse_condition(&request.boat_condition)?,
            fuel_level: request.fuel_level,
            notes: request.notes,
        };

        let booking = self.service.check_in(actor, booking_id, data).await?;
        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Check-in recorded, rental in progress",
        ))
    }

    pub async fn check_out(
        &self,
        actor: Actor,
        booking_id: Uuid,
        request: InspectionRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;
        for damage in &request.damages {
            damage.validate()?;
        }

        let data = CheckOutData {
            boat_condition: Self::parse_condition(&request.boat_condition)?,
            fuel_level: request.fuel_level,
            damages: request
                .damages
                .into_iter()
                .map(|d| Damage {
                    description: d.description,
                    estimated_cost: d.estimated_cost,
                })
                .collect(),
            notes: request.notes,
        };

        let booking = self.service.check_out(actor, booking_id, data).await?;
        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Check-out recorded, rental completed",
        ))
    }

    pub async fn review(
        &self,
        actor: Actor,
        booking_id: Uuid,
        request: ReviewRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        request.validate()?;
        let booking = self
            .service
            .add_review(actor, booking_id, request.rating, request.comment)
            .await?;
        Ok(ApiResponse::success_with_message(booking.into(), "Review saved"))
    }

    pub async fn availability(
        &self,
        boat_id: Uuid,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<RangeAvailability> {
        let start = parse_date_field("startDate", start_date)?;
        let end = parse_date_field("endDate", end_date)?;
        self.service.check_availability(boat_id, start, end).await
    }

    pub async fn month_availability(
        &self,
        boat_id: Uuid,
        month: &str,
    ) -> AppResult<MonthAvailability> {
        let month = YearMonth::parse(month).map_err(|e| field_error("month", e))?;
        self.service.check_month_availability(boat_id, &month).await
    }

    fn parse_condition(label: &str) -> AppResult<BoatCondition> {
        BoatCondition::from_label(label).ok_or_else(|| {
            validation_error(
                "boatCondition",
                format!("Unknown boat condition '{}'", label),
            )
        })
    }
}
