//! Máquina de estados de la reserva
//!
//! | Desde                     | Hacia     | Disparador        |
//! |---------------------------|-----------|-------------------|
//! | pending                   | confirmed | confirm (owner)   |
//! | pending, confirmed        | paid      | pago confirmado   |
//! | paid                      | active    | check-in (owner)  |
//! | active                    | completed | check-out (owner) |
//! | pending, confirmed, paid  | cancelled | cancel            |
//! | cancelled, paid           | refunded  | reembolso         |
//!
//! `apply` valida antes de tocar nada: si la transición no existe la
//! reserva queda intacta. Si existe, cambia el estado, sella los datos de
//! la transición y añade exactamente una entrada al historial. Los efectos
//! sobre el barco se devuelven como `LedgerEffect` y el repositorio los
//! escribe en la misma operación que la reserva.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::booking::{
    BoatCondition, Booking, BookingStatus, Cancellation, CancelledBy, CheckIn, CheckOut, Damage,
    Refund, StatusChange,
};
use crate::services::pricing_service::{CancellationQuote, PricingCalculator};
use crate::utils::errors::{AppError, AppResult};

/// Datos capturados en el check-in
#[derive(Debug, Clone)]
pub struct CheckInData {
    pub boat_condition: BoatCondition,
    pub fuel_level: u8,
    pub notes: Option<String>,
}

/// Datos capturados en el check-out
#[derive(Debug, Clone)]
pub struct CheckOutData {
    pub boat_condition: BoatCondition,
    pub fuel_level: u8,
    pub damages: Vec<Damage>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub enum BookingTransition {
    Confirm,
    MarkPaid {
        provider_reference: Option<String>,
    },
    CheckIn(CheckInData),
    CheckOut(CheckOutData),
    Cancel {
        cancelled_by: CancelledBy,
        reason: Option<String>,
        today: NaiveDate,
        waive_fee: bool,
    },
    Refund {
        amount: Option<Decimal>,
    },
}

impl BookingTransition {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingTransition::Confirm => BookingStatus::Confirmed,
            BookingTransition::MarkPaid { .. } => BookingStatus::Paid,
            BookingTransition::CheckIn(_) => BookingStatus::Active,
            BookingTransition::CheckOut(_) => BookingStatus::Completed,
            BookingTransition::Cancel { .. } => BookingStatus::Cancelled,
            BookingTransition::Refund { .. } => BookingStatus::Refunded,
        }
    }
}

/// Efecto sobre el barco que se persiste junto con la reserva
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEffect {
    None,
    /// Libera el periodo `booked` de esa reserva y sólo ese
    ReleasePeriod {
        boat_id: Uuid,
        booking_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    RecordRevenue {
        boat_id: Uuid,
        amount: Decimal,
        at: DateTime<Utc>,
    },
}

pub struct BookingStateMachine;

impl BookingStateMachine {
    /// Estados desde los que se puede llegar a `target`
    pub fn allowed_sources(target: BookingStatus) -> &'static [BookingStatus] {
        match target {
            BookingStatus::Pending => &[],
            BookingStatus::Confirmed => &[BookingStatus::Pending],
            BookingStatus::Paid => &[BookingStatus::Pending, BookingStatus::Confirmed],
            BookingStatus::Active => &[BookingStatus::Paid],
            BookingStatus::Completed => &[BookingStatus::Active],
            BookingStatus::Cancelled => &[
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::Paid,
            ],
            BookingStatus::Refunded => &[BookingStatus::Cancelled, BookingStatus::Paid],
        }
    }

    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        Self::allowed_sources(to).contains(&from)
    }

    pub fn validate(from: BookingStatus, to: BookingStatus) -> AppResult<()> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(AppError::InvalidTransition {
                current: from,
                requested: to,
            })
        }
    }

    /// Estados alcanzables desde `from`, útil para exponer acciones al frontend
    pub fn next_statuses(from: BookingStatus) -> Vec<BookingStatus> {
        BookingStatus::ALL
            .into_iter()
            .filter(|to| Self::can_transition(from, *to))
            .collect()
    }

    /// Gastos de anulación que se aplicarían hoy, sin modificar la reserva
    pub fn cancellation_quote(booking: &Booking, today: NaiveDate) -> CancellationQuote {
        PricingCalculator::cancellation_quote(booking.pricing.total_amount, booking.start_date, today)
    }

    pub fn apply(
        booking: &mut Booking,
        transition: BookingTransition,
        performed_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<LedgerEffect> {
        let from = booking.status;
        let target = transition.target();
        Self::validate(from, target)?;

        let mut note = None;
        let effect = match transition {
            BookingTransition::Confirm => LedgerEffect::None,

            BookingTransition::MarkPaid { provider_reference } => {
                booking.payment.paid_at = Some(now);
                if provider_reference.is_some() {
                    booking.payment.provider_reference = provider_reference;
                }
                LedgerEffect::None
            }

            BookingTransition::CheckIn(data) => {
                let performed_by = Self::require_actor(performed_by, from, target)?;
                booking.check_in = Some(CheckIn {
                    performed_by,
                    performed_at: now,
                    boat_condition: data.boat_condition,
                    fuel_level: data.fuel_level,
                    notes: data.notes,
                });
                LedgerEffect::None
            }

            BookingTransition::CheckOut(data) => {
                let performed_by = Self::require_actor(performed_by, from, target)?;
                booking.check_out = Some(CheckOut {
                    performed_by,
                    performed_at: now,
                    boat_condition: data.boat_condition,
                    fuel_level: data.fuel_level,
                    damages: data.damages,
                    notes: data.notes,
                });
                LedgerEffect::RecordRevenue {
                    boat_id: booking.boat_id,
                    amount: booking.pricing.total_amount,
                    at: now,
                }
            }

            BookingTransition::Cancel {
                cancelled_by,
                reason,
                today,
                waive_fee,
            } => {
                let quote = Self::cancellation_quote(booking, today);
                let (fee_percentage, cancellation_fee, refund_amount) = if waive_fee {
                    (0, Decimal::ZERO, booking.pricing.total_amount)
                } else {
                    (quote.fee_percentage, quote.cancellation_fee, quote.refund_amount)
                };
                note = reason.clone();
                booking.cancellation = Some(Cancellation {
                    cancelled_by,
                    cancelled_by_user: performed_by,
                    cancelled_at: now,
                    reason,
                    days_until_start: quote.days_until_start,
                    fee_percentage,
                    cancellation_fee,
                    refund_amount,
                });
                Self::release(booking)
            }

            BookingTransition::Refund { amount } => {
                let default_amount = match (&booking.cancellation, from) {
                    (Some(cancellation), BookingStatus::Cancelled) => cancellation.refund_amount,
                    _ => booking.pricing.total_amount,
                };
                booking.payment.refund = Some(Refund {
                    amount: amount.unwrap_or(default_amount),
                    refunded_at: now,
                });
                // Una reserva pagada que se reembolsa directamente libera sus fechas;
                // si venía de cancelled ya se liberaron al anular.
                if from == BookingStatus::Paid {
                    Self::release(booking)
                } else {
                    LedgerEffect::None
                }
            }
        };

        booking.status = target;
        booking.updated_at = now;
        booking.status_history.push(StatusChange {
            status: target,
            changed_at: now,
            changed_by: performed_by,
            note,
        });

        Ok(effect)
    }

    fn release(booking: &Booking) -> LedgerEffect {
        LedgerEffect::ReleasePeriod {
            boat_id: booking.boat_id,
            booking_id: booking.id,
            start_date: booking.start_date,
            end_date: booking.end_date,
        }
    }

    fn require_actor(
        performed_by: Option<Uuid>,
        from: BookingStatus,
        to: BookingStatus,
    ) -> AppResult<Uuid> {
        performed_by.ok_or_else(|| {
            AppError::Internal(format!("transition {} -> {} requires an actor", from, to))
        })
    }
}
