//! Cálculo de precios
//!
//! Funciones puras: número de días, tarifa escalonada (mes / semana / día),
//! total con suplementos y baremo de gastos de anulación.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::boat::BoatPricing;
use crate::models::booking::{BookingPricing, SelectedService};
use crate::utils::errors::{validation_error, AppResult};

/// Tarifa diaria del skipper
pub const SKIPPER_DAILY_RATE: Decimal = Decimal::from_parts(150, 0, 0, false, 0);

const DAYS_PER_WEEK: i64 = 7;
const DAYS_PER_MONTH: i64 = 30;

/// Tramo de tarifa aplicado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RateTier {
    Daily,
    Weekly,
    Monthly,
}

/// Desglose devuelto por la consulta de disponibilidad detallada
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub number_of_days: i64,
    pub rate_tier: RateTier,
    pub daily_rate: Decimal,
    pub base_price: Decimal,
    pub cleaning_fee: Decimal,
    pub security_deposit: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// Resultado del baremo de anulación
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationQuote {
    pub days_until_start: i64,
    pub fee_percentage: u32,
    pub cancellation_fee: Decimal,
    pub refund_amount: Decimal,
}

pub struct PricingCalculator;

impl PricingCalculator {
    /// Días naturales entre las dos fechas
    pub fn number_of_days(start: NaiveDate, end: NaiveDate) -> i64 {
        (end - start).num_days()
    }

    /// Rechaza rangos vacíos o invertidos
    pub fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<i64> {
        let days = Self::number_of_days(start, end);
        if days < 1 {
            return Err(validation_error(
                "endDate",
                format!("endDate ({}) must be after startDate ({})", end, start),
            ));
        }
        Ok(days)
    }

    /// Precio base con prioridad estricta: mensual, semanal, diario
    pub fn base_price(pricing: &BoatPricing, days: i64) -> (Decimal, RateTier) {
        if days >= DAYS_PER_MONTH {
            if let Some(monthly_rate) = pricing.monthly_rate {
                let months = days / DAYS_PER_MONTH;
                let remainder = days % DAYS_PER_MONTH;
                let price = monthly_rate * Decimal::from(months)
                    + pricing.daily_rate * Decimal::from(remainder);
                return (price, RateTier::Monthly);
            }
        }

        if days >= DAYS_PER_WEEK {
            if let Some(weekly_rate) = pricing.weekly_rate {
                let weeks = days / DAYS_PER_WEEK;
                let remainder = days % DAYS_PER_WEEK;
                let price = weekly_rate * Decimal::from(weeks)
                    + pricing.daily_rate * Decimal::from(remainder);
                return (price, RateTier::Weekly);
            }
        }

        (pricing.daily_rate * Decimal::from(days), RateTier::Daily)
    }

    /// Precio base + limpieza; la fianza se informa aparte
    pub fn quote(
        pricing: &BoatPricing,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<PricingBreakdown> {
        let days = Self::validate_range(start, end)?;
        let (base_price, rate_tier) = Self::base_price(pricing, days);

        Ok(PricingBreakdown {
            number_of_days: days,
            rate_tier,
            daily_rate: pricing.daily_rate,
            base_price,
            cleaning_fee: pricing.cleaning_fee,
            security_deposit: pricing.security_deposit,
            total: base_price + pricing.cleaning_fee,
            currency: pricing.currency.clone(),
        })
    }

    /// Precio congelado en la reserva: quote + skipper + servicios
    pub fn booking_pricing(
        pricing: &BoatPricing,
        start: NaiveDate,
        end: NaiveDate,
        skipper_requested: bool,
        services: &[SelectedService],
    ) -> AppResult<BookingPricing> {
        let quote = Self::quote(pricing, start, end)?;

        let skipper_cost = if skipper_requested {
            SKIPPER_DAILY_RATE * Decimal::from(quote.number_of_days)
        } else {
            Decimal::ZERO
        };
        let services_cost: Decimal = services.iter().map(SelectedService::line_total).sum();

        Ok(BookingPricing {
            daily_rate: pricing.daily_rate,
            number_of_days: quote.number_of_days,
            rate_tier: quote.rate_tier,
            subtotal: quote.base_price,
            cleaning_fee: quote.cleaning_fee,
            security_deposit: quote.security_deposit,
            skipper_cost,
            services_cost,
            total_amount: quote.total + skipper_cost + services_cost,
            currency: quote.currency,
        })
    }

    /// Porcentaje según los días que faltan para el inicio
    pub fn cancellation_fee_percentage(days_until_start: i64) -> u32 {
        match days_until_start {
            d if d < 1 => 100,
            1..=6 => 50,
            7..=13 => 25,
            14..=29 => 10,
            _ => 0,
        }
    }

    /// Gastos y reembolso; función pura de (total, inicio, hoy)
    pub fn cancellation_quote(
        total_amount: Decimal,
        start_date: NaiveDate,
        today: NaiveDate,
    ) -> CancellationQuote {
        let days_until_start = (start_date - today).num_days();
        let fee_percentage = Self::cancellation_fee_percentage(days_until_start);
        let cancellation_fee =
            (total_amount * Decimal::from(fee_percentage) / Decimal::ONE_HUNDRED).round_dp(2);

        CancellationQuote {
            days_until_start,
            fee_percentage,
            cancellation_fee,
            refund_amount: total_amount - cancellation_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn tiered_pricing() -> BoatPricing {
        BoatPricing {
            daily_rate: Decimal::new(100, 0),
            weekly_rate: Some(Decimal::new(600, 0)),
            monthly_rate: Some(Decimal::new(2000, 0)),
            security_deposit: Decimal::new(500, 0),
            cleaning_fee: Decimal::new(50, 0),
            currency: "EUR".to_string(),
        }
    }

    #[test]
    fn test_number_of_days() {
        assert_eq!(PricingCalculator::number_of_days(date(2026, 7, 1), date(2026, 7, 11)), 10);
        assert_eq!(PricingCalculator::number_of_days(date(2026, 7, 31), date(2026, 8, 1)), 1);
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let same_day = PricingCalculator::validate_range(date(2026, 7, 1), date(2026, 7, 1));
        assert!(same_day.is_err());
        let inverted = PricingCalculator::validate_range(date(2026, 7, 5), date(2026, 7, 1));
        assert!(inverted.is_err());
    }

    #[test]
    fn test_ten_days_uses_weekly_tier() {
        let quote =
            PricingCalculator::quote(&tiered_pricing(), date(2026, 7, 1), date(2026, 7, 11))
                .expect("valid quote");
        assert_eq!(quote.rate_tier, RateTier::Weekly);
        // 1 × 600 + 3 × 100
        assert_eq!(quote.base_price, Decimal::new(900, 0));
        assert_eq!(quote.total, Decimal::new(950, 0));
        assert_eq!(quote.security_deposit, Decimal::new(500, 0));
    }

    #[test]
    fn test_monthly_tier_has_priority() {
        let (price, tier) = PricingCalculator::base_price(&tiered_pricing(), 45);
        assert_eq!(tier, RateTier::Monthly);
        // 1 × 2000 + 15 × 100; el resto se cobra por día, no por semana
        assert_eq!(price, Decimal::new(3500, 0));
    }

    #[test]
    fn test_falls_back_when_rates_missing() {
        let mut pricing = tiered_pricing();
        pricing.monthly_rate = None;
        let (price, tier) = PricingCalculator::base_price(&pricing, 30);
        assert_eq!(tier, RateTier::Weekly);
        assert_eq!(price, Decimal::new(4 * 600 + 2 * 100, 0));

        pricing.weekly_rate = None;
        let (price, tier) = PricingCalculator::base_price(&pricing, 10);
        assert_eq!(tier, RateTier::Daily);
        assert_eq!(price, Decimal::new(1000, 0));
    }

    #[test]
    fn test_short_stay_is_daily() {
        let (price, tier) = PricingCalculator::base_price(&tiered_pricing(), 6);
        assert_eq!(tier, RateTier::Daily);
        assert_eq!(price, Decimal::new(600, 0));
    }

    #[test]
    fn test_quote_is_idempotent() {
        let pricing = tiered_pricing();
        let a = PricingCalculator::quote(&pricing, date(2026, 5, 3), date(2026, 6, 20))
            .expect("valid quote");
        let b = PricingCalculator::quote(&pricing, date(2026, 5, 3), date(2026, 6, 20))
            .expect("valid quote");
        assert_eq!(a, b);
        assert!(a.number_of_days > 0);
    }

    #[test]
    fn test_booking_pricing_adds_skipper_and_services() {
        let services = vec![
            SelectedService {
                name: "Paddle".to_string(),
                unit_price: Decimal::new(20, 0),
                quantity: 2,
            },
            SelectedService {
                name: "Snorkeling kit".to_string(),
                unit_price: Decimal::new(1550, 2),
                quantity: 1,
            },
        ];
        let pricing = PricingCalculator::booking_pricing(
            &tiered_pricing(),
            date(2026, 7, 1),
            date(2026, 7, 4),
            true,
            &services,
        )
        .expect("valid pricing");

        assert_eq!(pricing.number_of_days, 3);
        assert_eq!(pricing.subtotal, Decimal::new(300, 0));
        assert_eq!(pricing.skipper_cost, Decimal::new(450, 0));
        assert_eq!(pricing.services_cost, Decimal::new(5550, 2));
        // 300 + 50 + 450 + 55.50
        assert_eq!(pricing.total_amount, Decimal::new(85550, 2));
        assert_eq!(pricing.daily_rate, Decimal::new(100, 0));
    }

    #[test]
    fn test_cancellation_schedule_boundaries() {
        let total = Decimal::new(1000, 0);
        let today = date(2026, 3, 1);
        let cases = [
            (30, 0, Decimal::ZERO),
            (29, 10, Decimal::new(100, 0)),
            (14, 10, Decimal::new(100, 0)),
            (13, 25, Decimal::new(250, 0)),
            (7, 25, Decimal::new(250, 0)),
            (6, 50, Decimal::new(500, 0)),
            (1, 50, Decimal::new(500, 0)),
            (0, 100, Decimal::new(1000, 0)),
            (-3, 100, Decimal::new(1000, 0)),
        ];

        for (days, percentage, fee) in cases {
            let start = today + Duration::days(days);
            let quote = PricingCalculator::cancellation_quote(total, start, today);
            assert_eq!(quote.days_until_start, days);
            assert_eq!(quote.fee_percentage, percentage, "days = {}", days);
            assert_eq!(quote.cancellation_fee, fee, "days = {}", days);
            assert_eq!(quote.refund_amount, total - fee);
        }
    }

    #[test]
    fn test_cancellation_fee_rounds_to_cents() {
        let today = date(2026, 3, 1);
        let quote = PricingCalculator::cancellation_quote(
            Decimal::new(33333, 2),
            today + Duration::days(10),
            today,
        );
        // 25 % de 333.33
        assert_eq!(quote.cancellation_fee, Decimal::new(8333, 2));
        assert_eq!(quote.refund_amount, Decimal::new(25000, 2));
    }
}
