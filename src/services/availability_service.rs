//! Ledger de disponibilidad
//!
//! Opera sobre `Boat::unavailable_periods`. Las fechas son días naturales
//! y el solapamiento es inclusivo: dos rangos chocan si
//! `inicio1 <= fin2 && inicio2 <= fin1`.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::boat::{BlockReason, Boat, BoatStatus, UnavailablePeriod};
use crate::services::pricing_service::{PricingBreakdown, PricingCalculator};
use crate::utils::errors::AppResult;
use crate::utils::validation::YearMonth;

/// Respuesta del modo mensual (sólo booleano)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthAvailability {
    pub boat_id: Uuid,
    pub month: String,
    pub available: bool,
}

/// Respuesta del modo detallado (rango + precio)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RangeAvailability {
    pub boat_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<UnavailablePeriod>,
    pub pricing: Option<PricingBreakdown>,
}

pub struct AvailabilityLedger;

impl AvailabilityLedger {
    pub fn ranges_overlap(
        start_a: NaiveDate,
        end_a: NaiveDate,
        start_b: NaiveDate,
        end_b: NaiveDate,
    ) -> bool {
        start_a <= end_b && start_b <= end_a
    }

    /// Primer periodo que choca con [start, end]
    pub fn find_conflict(
        periods: &[UnavailablePeriod],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<&UnavailablePeriod> {
        periods
            .iter()
            .find(|p| Self::ranges_overlap(p.start_date, p.end_date, start, end))
    }

    pub fn is_available(periods: &[UnavailablePeriod], start: NaiveDate, end: NaiveDate) -> bool {
        Self::find_conflict(periods, start, end).is_none()
    }

    /// Añade sin comprobar; quien llama debe consultar `is_available` antes
    pub fn add_unavailable_period(periods: &mut Vec<UnavailablePeriod>, period: UnavailablePeriod) {
        periods.push(period);
        periods.sort_by_key(|p| (p.start_date, p.end_date));
    }

    /// Elimina el rango con inicio, fin y motivo exactos. Devuelve cuántos
    /// quitó; sin coincidencia no hace nada.
    pub fn remove_period(
        periods: &mut Vec<UnavailablePeriod>,
        start: NaiveDate,
        end: NaiveDate,
        reason: BlockReason,
    ) -> usize {
        Self::remove_where(periods, |p| {
            p.start_date == start && p.end_date == end && p.reason == reason
        })
    }

    /// Quita el periodo `booked` de una reserva; los bloqueos manuales no se tocan
    pub fn release_booking(periods: &mut Vec<UnavailablePeriod>, booking_id: Uuid) -> usize {
        Self::remove_where(periods, |p| {
            p.reason == BlockReason::Booked && p.booking_id == Some(booking_id)
        })
    }

    fn remove_where<F>(periods: &mut Vec<UnavailablePeriod>, matches: F) -> usize
    where
        F: Fn(&UnavailablePeriod) -> bool,
    {
        let before = periods.len();
        periods.retain(|p| !matches(p));
        before - periods.len()
    }

    /// Modo mensual: sólo mira si el barco está activo y disponible
    pub fn month_availability(boat: &Boat, month: &YearMonth) -> MonthAvailability {
        MonthAvailability {
            boat_id: boat.id,
            month: month.to_string(),
            available: boat.is_active && boat.status == BoatStatus::Available,
        }
    }

    /// Modo detallado: ledger + desglose de precio si está libre
    pub fn range_availability(
        boat: &Boat,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<RangeAvailability> {
        let pricing = PricingCalculator::quote(&boat.pricing, start, end)?;
        let conflict = Self::find_conflict(&boat.unavailable_periods, start, end).cloned();
        let available = boat.is_active && conflict.is_none();

        Ok(RangeAvailability {
            boat_id: boat.id,
            start_date: start,
            end_date: end,
            available,
            conflict,
            pricing: available.then_some(pricing),
        })
    }
}
