use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::{Booking, BookingStatus, EmergencyContact, Participants};
use crate::services::booking_state_machine::BookingStateMachine;
use crate::services::pricing_service::CancellationQuote;
use crate::utils::validation::{validate_non_negative, validate_not_empty};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsDto {
    #[validate(range(min = 1, max = 500, message = "Adults must be between 1 and 500"))]
    pub adults: i32,
    #[serde(default)]
    #[validate(range(min = 0, max = 500))]
    pub children: i32,
}

impl From<ParticipantsDto> for Participants {
    fn from(dto: ParticipantsDto) -> Self {
        Participants {
            adults: dto.adults,
            children: dto.children,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContactDto {
    #[validate(custom = "validate_not_empty", length(max = 120))]
    pub name: String,
    #[validate(length(min = 6, max = 30))]
    pub phone: String,
    #[validate(length(max = 60))]
    pub relationship: Option<String>,
}

impl From<EmergencyContactDto> for EmergencyContact {
    fn from(dto: EmergencyContactDto) -> Self {
        EmergencyContact {
            name: dto.name,
            phone: dto.phone,
            relationship: dto.relationship,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSelectionDto {
    #[validate(custom = "validate_not_empty")]
    pub name: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100))]
    pub quantity: i32,
}

// Solicitud de reserva
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub boat_id: Uuid,
    pub start_date: String,
    pub end_date: String,
    #[validate]
    pub participants: ParticipantsDto,
    #[validate]
    pub emergency_contact: Option<EmergencyContactDto>,
    /// Valor interno o etiqueta francesa ("Débutant", "Confirmé"...)
    pub renter_experience: Option<String>,
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub skipper_requested: bool,
    /// Se valida elemento a elemento en el controlador
    #[serde(default)]
    pub additional_services: Vec<ServiceSelectionDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    /// "renter" (por defecto) u "owner"
    #[serde(rename = "as")]
    pub as_party: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DamageDto {
    #[validate(custom = "validate_not_empty", length(max = 1000))]
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    pub estimated_cost: Option<Decimal>,
}

// Datos de check-in / check-out
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRequest {
    /// "excellent" / "good" / "fair" / "poor" o etiqueta francesa
    pub boat_condition: String,
    #[validate(range(max = 100, message = "Fuel level must be between 0 and 100"))]
    pub fuel_level: u8,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Sólo en el check-out; se valida elemento a elemento en el controlador
    #[serde(default)]
    pub damages: Vec<DamageDto>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Reserva + acciones que el cliente puede ofrecer a continuación
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub status_label: &'static str,
    pub next_statuses: Vec<BookingStatus>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            status_label: booking.status.french_label(),
            next_statuses: BookingStateMachine::next_statuses(booking.status),
            booking,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResponse {
    pub booking: BookingResponse,
    pub cancellation: CancellationQuote,
}
