use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::boat::{BoatCapacity, BoatLocation, BoatPricing, ServiceOffer};
use crate::utils::validation::{
    validate_currency, validate_non_negative, validate_not_empty, validate_positive,
};

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    #[validate(custom = "validate_not_empty", length(max = 120))]
    pub city: String,
    #[validate(length(max = 120))]
    pub port: Option<String>,
}

impl From<LocationDto> for BoatLocation {
    fn from(dto: LocationDto) -> Self {
        BoatLocation {
            city: dto.city.trim().to_string(),
            port: dto.port,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CapacityDto {
    #[validate(range(min = 1, max = 500, message = "maxPeople must be between 1 and 500"))]
    pub max_people: i32,
}

impl From<CapacityDto> for BoatCapacity {
    fn from(dto: CapacityDto) -> Self {
        BoatCapacity {
            max_people: dto.max_people,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PricingDto {
    #[validate(custom = "validate_positive")]
    pub daily_rate: Decimal,
    #[validate(custom = "validate_positive")]
    pub weekly_rate: Option<Decimal>,
    #[validate(custom = "validate_positive")]
    pub monthly_rate: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub security_deposit: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub cleaning_fee: Decimal,
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub currency: String,
}

impl From<PricingDto> for BoatPricing {
    fn from(dto: PricingDto) -> Self {
        BoatPricing {
            daily_rate: dto.daily_rate,
            weekly_rate: dto.weekly_rate,
            monthly_rate: dto.monthly_rate,
            security_deposit: dto.security_deposit,
            cleaning_fee: dto.cleaning_fee,
            currency: dto.currency,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOfferDto {
    #[validate(custom = "validate_not_empty", length(max = 80))]
    pub name: String,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
}

impl From<ServiceOfferDto> for ServiceOffer {
    fn from(dto: ServiceOfferDto) -> Self {
        ServiceOffer {
            name: dto.name.trim().to_string(),
            price: dto.price,
        }
    }
}

// Alta de un barco
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoatRequest {
    #[validate(custom = "validate_not_empty", length(max = 120))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Valor interno o etiqueta francesa ("Voilier", "Péniche"...)
    pub boat_type: String,
    #[validate]
    pub location: LocationDto,
    #[validate]
    pub capacity: CapacityDto,
    #[validate]
    pub pricing: PricingDto,
    /// Se valida elemento a elemento en el controlador
    #[serde(default)]
    pub additional_services: Vec<ServiceOfferDto>,
}

// Edición parcial del anuncio
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBoatRequest {
    #[validate(custom = "validate_not_empty", length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub boat_type: Option<String>,
    #[validate]
    pub location: Option<LocationDto>,
    #[validate]
    pub capacity: Option<CapacityDto>,
    #[validate]
    pub pricing: Option<PricingDto>,
    /// Se valida elemento a elemento en el controlador
    pub additional_services: Option<Vec<ServiceOfferDto>>,
    pub status: Option<String>,
}

// Filtros de búsqueda (query string)
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BoatListQuery {
    pub boat_type: Option<String>,
    pub city: Option<String>,
    #[validate(range(min = 1))]
    pub min_capacity: Option<i32>,
    #[validate(custom = "validate_positive")]
    pub max_daily_rate: Option<Decimal>,
    pub available_from: Option<String>,
    pub available_to: Option<String>,
    pub owner_id: Option<Uuid>,
    pub include_inactive: Option<bool>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteBoatQuery {
    pub force: Option<bool>,
}

// Consulta detallada de disponibilidad
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start_date: String,
    pub end_date: String,
}

// Consulta mensual de disponibilidad
#[derive(Debug, Deserialize)]
pub struct MonthAvailabilityQuery {
    pub month: String,
}

// Bloqueo manual del calendario
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedPeriodRequest {
    pub start_date: String,
    pub end_date: String,
    /// "maintenance" u "owner_blocked"; por defecto owner_blocked
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBlockedPeriodRequest {
    pub start_date: String,
    pub end_date: String,
}
