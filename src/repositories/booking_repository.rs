use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::boat::{BlockReason, UnavailablePeriod};
use crate::models::booking::{
    Booking, BookingPricing, BookingStatus, Cancellation, CheckIn, CheckOut, EmergencyContact,
    ExperienceLevel, Participants, PaymentInfo, Review, SelectedService, StatusChange,
};
use crate::repositories::{
    already_reviewed_message, dates_unavailable_message, is_overlap_violation, BookingParty,
    BookingRepository,
};
use crate::services::booking_state_machine::LedgerEffect;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_number: String,
    boat_id: Uuid,
    renter_id: Uuid,
    owner_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    participants: Json<Participants>,
    pricing: Json<BookingPricing>,
    status: BookingStatus,
    status_history: Json<Vec<StatusChange>>,
    emergency_contact: Option<Json<EmergencyContact>>,
    renter_experience: Option<Json<ExperienceLevel>>,
    special_requests: Option<String>,
    skipper_requested: bool,
    additional_services: Json<Vec<SelectedService>>,
    payment: Json<PaymentInfo>,
    cancellation: Option<Json<Cancellation>>,
    check_in: Option<Json<CheckIn>>,
    check_out: Option<Json<CheckOut>>,
    renter_review: Option<Json<Review>>,
    owner_review: Option<Json<Review>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            booking_number: row.booking_number,
            boat_id: row.boat_id,
            renter_id: row.renter_id,
            owner_id: row.owner_id,
            start_date: row.start_date,
            end_date: row.end_date,
            participants: row.participants.0,
            pricing: row.pricing.0,
            status: row.status,
            status_history: row.status_history.0,
            emergency_contact: row.emergency_contact.map(|j| j.0),
            renter_experience: row.renter_experience.map(|j| j.0),
            special_requests: row.special_requests,
            skipper_requested: row.skipper_requested,
            additional_services: row.additional_services.0,
            payment: row.payment.0,
            cancellation: row.cancellation.map(|j| j.0),
            check_in: row.check_in.map(|j| j.0),
            check_out: row.check_out.map(|j| j.0),
            renter_review: row.renter_review.map(|j| j.0),
            owner_review: row.owner_review.map(|j| j.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConflictRow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: BlockReason,
    booking_id: Option<Uuid>,
}

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_status(&self, id: Uuid) -> AppResult<Option<BookingStatus>> {
        let row: Option<(BookingStatus,)> =
            sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(status,)| status))
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Booking::from))
    }

    async fn list_for_user(&self, user_id: Uuid, party: BookingParty) -> AppResult<Vec<Booking>> {
        let sql = match party {
            BookingParty::Renter => {
                "SELECT * FROM bookings WHERE renter_id = $1 ORDER BY created_at DESC"
            }
            BookingParty::Owner => {
                "SELECT * FROM bookings WHERE owner_id = $1 ORDER BY created_at DESC"
            }
        };

        let rows = sqlx::query_as::<_, BookingRow>(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn list_for_boat(&self, boat_id: Uuid) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE boat_id = $1 ORDER BY start_date",
        )
        .bind(boat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE status = 'pending' AND created_at < $1 ORDER BY created_at",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn create_with_reservation(&self, booking: &Booking) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Serializa las reservas concurrentes sobre el mismo barco
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM boats WHERE id = $1 FOR UPDATE")
            .bind(booking.boat_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(not_found_error("Boat", booking.boat_id));
        }

        let conflict = sqlx::query_as::<_, ConflictRow>(
            r#"
            SELECT start_date, end_date, reason, booking_id
            FROM boat_unavailable_periods
            WHERE boat_id = $1 AND start_date <= $3 AND $2 <= end_date
            ORDER BY start_date
            LIMIT 1
            "#,
        )
        .bind(booking.boat_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = conflict {
            let period = UnavailablePeriod {
                start_date: row.start_date,
                end_date: row.end_date,
                reason: row.reason,
                booking_id: row.booking_id,
            };
            return Err(AppError::Conflict(dates_unavailable_message(
                booking.boat_id,
                booking.start_date,
                booking.end_date,
                &period,
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, booking_number, boat_id, renter_id, owner_id, start_date, end_date,
                participants, pricing, total_amount, status, status_history, emergency_contact,
                renter_experience, special_requests, skipper_requested, additional_services,
                payment, cancellation, check_in, check_out, renter_review, owner_review,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_number)
        .bind(booking.boat_id)
        .bind(booking.renter_id)
        .bind(booking.owner_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(Json(&booking.participants))
        .bind(Json(&booking.pricing))
        .bind(booking.pricing.total_amount)
        .bind(booking.status)
        .bind(Json(&booking.status_history))
        .bind(booking.emergency_contact.as_ref().map(Json))
        .bind(booking.renter_experience.map(Json))
        .bind(&booking.special_requests)
        .bind(booking.skipper_requested)
        .bind(Json(&booking.additional_services))
        .bind(Json(&booking.payment))
        .bind(booking.cancellation.as_ref().map(Json))
        .bind(booking.check_in.as_ref().map(Json))
        .bind(booking.check_out.as_ref().map(Json))
        .bind(booking.renter_review.as_ref().map(Json))
        .bind(booking.owner_review.as_ref().map(Json))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO boat_unavailable_periods (boat_id, start_date, end_date, reason, booking_id)
            VALUES ($1, $2, $3, 'booked', $4)
            "#,
        )
        .bind(booking.boat_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.id)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_overlap_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "Boat '{}' is not available from {} to {}",
                    booking.boat_id, booking.start_date, booking.end_date
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        debug!("Booking {} reserved {} → {}", booking.booking_number, booking.start_date, booking.end_date);
        Ok(())
    }

    async fn save_transition(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        effect: &LedgerEffect,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3, status_history = $4, payment = $5, cancellation = $6,
                check_in = $7, check_out = $8, updated_at = $9
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(booking.id)
        .bind(expected)
        .bind(booking.status)
        .bind(Json(&booking.status_history))
        .bind(Json(&booking.payment))
        .bind(booking.cancellation.as_ref().map(Json))
        .bind(booking.check_in.as_ref().map(Json))
        .bind(booking.check_out.as_ref().map(Json))
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return match self.current_status(booking.id).await? {
                Some(current) => Err(AppError::Conflict(format!(
                    "Booking '{}' changed concurrently: expected '{}', found '{}'",
                    booking.id, expected, current
                ))),
                None => Err(not_found_error("Booking", booking.id)),
            };
        }

        match effect {
            LedgerEffect::None => {}
            LedgerEffect::ReleasePeriod {
                boat_id,
                booking_id,
                ..
            } => {
                let released = sqlx::query(
                    r#"
                    DELETE FROM boat_unavailable_periods
                    WHERE boat_id = $1 AND booking_id = $2 AND reason = 'booked'
                    "#,
                )
                .bind(boat_id)
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;
                debug!(
                    "Released {} period(s) of booking {} on boat {}",
                    released.rows_affected(),
                    booking_id,
                    boat_id
                );
            }
            LedgerEffect::RecordRevenue {
                boat_id,
                amount,
                at,
            } => {
                let updated = sqlx::query(
                    r#"
                    UPDATE boats
                    SET total_bookings = total_bookings + 1,
                        total_revenue = total_revenue + $2,
                        last_booked = $3
                    WHERE id = $1
                    "#,
                )
                .bind(boat_id)
                .bind(amount)
                .bind(at)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(not_found_error("Boat", *boat_id));
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_review(
        &self,
        booking_id: Uuid,
        party: BookingParty,
        review: &Review,
    ) -> AppResult<Booking> {
        let sql = match party {
            BookingParty::Renter => {
                r#"
                UPDATE bookings SET renter_review = $2, updated_at = $3
                WHERE id = $1 AND status = 'completed' AND renter_review IS NULL
                RETURNING *
                "#
            }
            BookingParty::Owner => {
                r#"
                UPDATE bookings SET owner_review = $2, updated_at = $3
                WHERE id = $1 AND status = 'completed' AND owner_review IS NULL
                RETURNING *
                "#
            }
        };

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookingRow>(sql)
            .bind(booking_id)
            .bind(Json(review))
            .bind(review.created_at)
            .fetch_optional(&mut *tx)
            .await?;

        let booking = match row {
            Some(row) => Booking::from(row),
            None => {
                return match self.current_status(booking_id).await? {
                    None => Err(not_found_error("Booking", booking_id)),
                    Some(BookingStatus::Completed) => Err(AppError::AlreadyReviewed(
                        already_reviewed_message(booking_id, party),
                    )),
                    Some(current) => Err(AppError::InvalidTransition {
                        current,
                        requested: BookingStatus::Completed,
                    }),
                };
            }
        };

        if party == BookingParty::Renter {
            let rating = i64::from(review.rating);
            sqlx::query(
                r#"
                UPDATE boats
                SET rating_total = rating_total + $2, rating_count = rating_count + 1
                WHERE id = $1
                "#,
            )
            .bind(booking.boat_id)
            .bind(rating)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE users
                SET rating_total = rating_total + $2, rating_count = rating_count + 1
                WHERE id = $1
                "#,
            )
            .bind(booking.owner_id)
            .bind(rating)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(booking)
    }
}
