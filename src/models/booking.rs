//! Modelo de Booking
//!
//! Una reserva referencia un barco, un locataire y el propietario
//! (copiado de `boat.owner_id` al crearla). Las partes anidadas se
//! persisten como JSONB.

use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;
use uuid::Uuid;

use crate::services::pricing_service::RateTier;

/// Estado de la reserva - mapea al ENUM booking_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Active,
    Completed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Paid,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Etiqueta francesa mostrada en el frontend
    pub fn french_label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "En attente",
            BookingStatus::Confirmed => "Confirmée",
            BookingStatus::Paid => "Payée",
            BookingStatus::Active => "En cours",
            BookingStatus::Completed => "Terminée",
            BookingStatus::Cancelled => "Annulée",
            BookingStatus::Refunded => "Remboursée",
        }
    }

    /// Reservas que todavía ocupan su rango de fechas
    pub fn holds_dates(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending
                | BookingStatus::Confirmed
                | BookingStatus::Paid
                | BookingStatus::Active
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nivel de experiencia declarado por el locataire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ExperienceLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "beginner" | "débutant" | "debutant" => Some(ExperienceLevel::Beginner),
            "intermediate" | "intermédiaire" | "intermediaire" => {
                Some(ExperienceLevel::Intermediate)
            }
            "advanced" | "confirmé" | "confirme" | "avancé" | "avance" => {
                Some(ExperienceLevel::Advanced)
            }
            "expert" => Some(ExperienceLevel::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participants {
    pub adults: i32,
    pub children: i32,
}

impl Participants {
    /// Suma en i64: dos i32 válidos nunca desbordan
    pub fn total(&self) -> i64 {
        i64::from(self.adults) + i64::from(self.children)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: Option<String>,
}

/// Servicio seleccionado, con el precio unitario congelado al reservar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedService {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl SelectedService {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Desglose de precio congelado en la creación
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingPricing {
    pub daily_rate: Decimal,
    pub number_of_days: i64,
    pub rate_tier: RateTier,
    pub subtotal: Decimal,
    pub cleaning_fee: Decimal,
    pub security_deposit: Decimal,
    pub skipper_cost: Decimal,
    pub services_cost: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: BookingStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    Renter,
    Owner,
    Admin,
    System,
}

/// Desglose de la anulación; nunca se recalcula
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub cancelled_by: CancelledBy,
    pub cancelled_by_user: Option<Uuid>,
    pub cancelled_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub days_until_start: i64,
    pub fee_percentage: u32,
    pub cancellation_fee: Decimal,
    pub refund_amount: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BoatCondition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl BoatCondition {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "excellent" => Some(BoatCondition::Excellent),
            "good" | "bon" | "bon état" => Some(BoatCondition::Good),
            "fair" | "moyen" | "correct" => Some(BoatCondition::Fair),
            "poor" | "mauvais" | "mauvais état" => Some(BoatCondition::Poor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
    pub boat_condition: BoatCondition,
    /// Porcentaje de depósito 0..=100
    pub fuel_level: u8,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Damage {
    pub description: String,
    pub estimated_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckOut {
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
    pub boat_condition: BoatCondition,
    pub fuel_level: u8,
    pub damages: Vec<Damage>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: u8,
    pub comment: Option<String>,
    pub reviewed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub amount: Decimal,
    pub refunded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub provider_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refund: Option<Refund>,
}

/// Booking principal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub boat_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub participants: Participants,
    pub pricing: BookingPricing,
    pub status: BookingStatus,
    pub status_history: Vec<StatusChange>,
    pub emergency_contact: Option<EmergencyContact>,
    pub renter_experience: Option<ExperienceLevel>,
    pub special_requests: Option<String>,
    pub skipper_requested: bool,
    pub additional_services: Vec<SelectedService>,
    pub payment: PaymentInfo,
    pub cancellation: Option<Cancellation>,
    pub check_in: Option<CheckIn>,
    pub check_out: Option<CheckOut>,
    pub renter_review: Option<Review>,
    pub owner_review: Option<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_renter(&self, user_id: Uuid) -> bool {
        self.renter_id == user_id
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Número legible `BK-YYYYMMDD-XXXXXX`
pub fn generate_booking_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("BK-{}-{}", now.format("%Y%m%d"), suffix)
}
