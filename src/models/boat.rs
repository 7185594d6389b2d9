//! Modelo de Boat
//!
//! Este módulo contiene el struct Boat con su tabla de tarifas, capacidad,
//! estadísticas y los periodos bloqueados que alimentan el ledger de
//! disponibilidad.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;
use uuid::Uuid;

use crate::models::user::RatingSummary;

/// Tipo de barco - mapea al ENUM boat_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "boat_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BoatType {
    Sailboat,
    Motorboat,
    Catamaran,
    Yacht,
    Rib,
    Houseboat,
    Jetski,
}

impl BoatType {
    /// Etiquetas francesas del frontend → valores internos
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "sailboat" | "voilier" => Some(BoatType::Sailboat),
            "motorboat" | "bateau à moteur" | "bateau a moteur" | "vedette" => {
                Some(BoatType::Motorboat)
            }
            "catamaran" => Some(BoatType::Catamaran),
            "yacht" => Some(BoatType::Yacht),
            "rib" | "semi-rigide" | "semi rigide" => Some(BoatType::Rib),
            "houseboat" | "péniche" | "peniche" => Some(BoatType::Houseboat),
            "jetski" | "jet-ski" | "scooter des mers" => Some(BoatType::Jetski),
            _ => None,
        }
    }
}

/// Estado operativo del barco - mapea al ENUM boat_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "boat_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoatStatus {
    Available,
    Maintenance,
    Unavailable,
}

impl BoatStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "available" | "disponible" => Some(BoatStatus::Available),
            "maintenance" | "en maintenance" => Some(BoatStatus::Maintenance),
            "unavailable" | "indisponible" => Some(BoatStatus::Unavailable),
            _ => None,
        }
    }
}

/// Motivo de un periodo bloqueado - mapea al ENUM block_reason
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "block_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Booked,
    Maintenance,
    OwnerBlocked,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockReason::Booked => "booked",
            BlockReason::Maintenance => "maintenance",
            BlockReason::OwnerBlocked => "owner_blocked",
        };
        f.write_str(label)
    }
}

/// Tabla de tarifas del barco
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoatPricing {
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub security_deposit: Decimal,
    pub cleaning_fee: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoatCapacity {
    pub max_people: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoatLocation {
    pub city: String,
    pub port: Option<String>,
}

/// Servicio opcional que el propietario ofrece (skipper aparte)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOffer {
    pub name: String,
    pub price: Decimal,
}

/// Periodo en el que el barco no se puede reservar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnavailablePeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: BlockReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
}

impl UnavailablePeriod {
    pub fn booked(start_date: NaiveDate, end_date: NaiveDate, booking_id: Uuid) -> Self {
        Self {
            start_date,
            end_date,
            reason: BlockReason::Booked,
            booking_id: Some(booking_id),
        }
    }
}

/// Contadores agregados; sólo se modifican en el check-out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoatStats {
    pub total_bookings: i32,
    pub total_revenue: Decimal,
    pub last_booked: Option<DateTime<Utc>>,
}

impl BoatStats {
    pub fn record_rental(&mut self, amount: Decimal, at: DateTime<Utc>) {
        self.total_bookings += 1;
        self.total_revenue += amount;
        self.last_booked = Some(at);
    }
}

/// Boat principal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boat {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub boat_type: BoatType,
    pub location: BoatLocation,
    pub capacity: BoatCapacity,
    pub pricing: BoatPricing,
    pub additional_services: Vec<ServiceOffer>,
    pub status: BoatStatus,
    pub is_active: bool,
    pub unavailable_periods: Vec<UnavailablePeriod>,
    pub stats: BoatStats,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Boat {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Busca un servicio del catálogo por nombre (sin distinguir mayúsculas)
    pub fn find_service(&self, name: &str) -> Option<&ServiceOffer> {
        self.additional_services
            .iter()
            .find(|offer| offer.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Datos para crear un barco
#[derive(Debug, Clone)]
pub struct NewBoat {
    pub name: String,
    pub description: Option<String>,
    pub boat_type: BoatType,
    pub location: BoatLocation,
    pub capacity: BoatCapacity,
    pub pricing: BoatPricing,
    pub additional_services: Vec<ServiceOffer>,
}

impl NewBoat {
    pub fn into_boat(self, owner_id: Uuid) -> Boat {
        let now = Utc::now();
        Boat {
            id: Uuid::new_v4(),
            owner_id,
            name: self.name,
            description: self.description,
            boat_type: self.boat_type,
            location: self.location,
            capacity: self.capacity,
            pricing: self.pricing,
            additional_services: self.additional_services,
            status: BoatStatus::Available,
            is_active: true,
            unavailable_periods: Vec::new(),
            stats: BoatStats::default(),
            rating: RatingSummary::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Cambios parciales sobre el anuncio (nunca toca ledger ni estadísticas)
#[derive(Debug, Clone, Default)]
pub struct BoatUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub boat_type: Option<BoatType>,
    pub location: Option<BoatLocation>,
    pub max_people: Option<i32>,
    pub pricing: Option<BoatPricing>,
    pub additional_services: Option<Vec<ServiceOffer>>,
    pub status: Option<BoatStatus>,
}

impl BoatUpdate {
    pub fn apply_to(self, boat: &mut Boat) {
        if let Some(name) = self.name {
            boat.name = name;
        }
        if let Some(description) = self.description {
            boat.description = Some(description);
        }
        if let Some(boat_type) = self.boat_type {
            boat.boat_type = boat_type;
        }
        if let Some(location) = self.location {
            boat.location = location;
        }
        if let Some(max_people) = self.max_people {
            boat.capacity.max_people = max_people;
        }
        if let Some(pricing) = self.pricing {
            boat.pricing = pricing;
        }
        if let Some(services) = self.additional_services {
            boat.additional_services = services;
        }
        if let Some(status) = self.status {
            boat.status = status;
        }
        boat.updated_at = Utc::now();
    }
}

/// Filtros para búsqueda de barcos
#[derive(Debug, Clone, Default)]
pub struct BoatFilters {
    pub boat_type: Option<BoatType>,
    pub city: Option<String>,
    pub min_capacity: Option<i32>,
    pub max_daily_rate: Option<Decimal>,
    pub owner_id: Option<Uuid>,
    pub available_between: Option<(NaiveDate, NaiveDate)>,
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BoatFilters {
    /// Comprobación completa en memoria
    pub fn matches(&self, boat: &Boat) -> bool {
        self.matches_listing(boat) && self.matches_availability(boat)
    }

    pub fn matches_listing(&self, boat: &Boat) -> bool {
        if !self.include_inactive && !boat.is_active {
            return false;
        }
        if self.boat_type.map_or(false, |t| t != boat.boat_type) {
            return false;
        }
        if let Some(city) = &self.city {
            if !boat.location.city.eq_ignore_ascii_case(city.trim()) {
                return false;
            }
        }
        if self.min_capacity.map_or(false, |min| boat.capacity.max_people < min) {
            return false;
        }
        if self.max_daily_rate.map_or(false, |max| boat.pricing.daily_rate > max) {
            return false;
        }
        if self.owner_id.map_or(false, |owner| owner != boat.owner_id) {
            return false;
        }
        true
    }

    /// El filtro de fechas usa el ledger de disponibilidad
    pub fn matches_availability(&self, boat: &Boat) -> bool {
        match self.available_between {
            Some((start, end)) => {
                crate::services::availability_service::AvailabilityLedger::is_available(
                    &boat.unavailable_periods,
                    start,
                    end,
                )
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boat_type_labels() {
        assert_eq!(BoatType::from_label("Voilier"), Some(BoatType::Sailboat));
        assert_eq!(BoatType::from_label("péniche"), Some(BoatType::Houseboat));
        assert_eq!(BoatType::from_label("motorboat"), Some(BoatType::Motorboat));
        assert_eq!(BoatType::from_label("sous-marin"), None);
    }

    #[test]
    fn test_stats_only_grow() {
        let mut stats = BoatStats::default();
        let now = Utc::now();
        stats.record_rental(Decimal::new(1200, 0), now);
        stats.record_rental(Decimal::new(300, 0), now);
        assert_eq!(stats.total_bookings, 2);
        assert_eq!(stats.total_revenue, Decimal::new(1500, 0));
        assert_eq!(stats.last_booked, Some(now));
    }
}
