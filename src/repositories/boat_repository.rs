use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::boat::{
    BlockReason, Boat, BoatCapacity, BoatFilters, BoatLocation, BoatPricing, BoatStats,
    BoatStatus, BoatType, ServiceOffer, UnavailablePeriod,
};
use crate::models::user::RatingSummary;
use crate::repositories::{
    dates_unavailable_message, is_foreign_key_violation, is_overlap_violation, BoatRepository,
};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct BoatRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    boat_type: BoatType,
    city: String,
    port: Option<String>,
    max_people: i32,
    daily_rate: Decimal,
    weekly_rate: Option<Decimal>,
    monthly_rate: Option<Decimal>,
    security_deposit: Decimal,
    cleaning_fee: Decimal,
    currency: String,
    additional_services: Json<Vec<ServiceOffer>>,
    status: BoatStatus,
    is_active: bool,
    total_bookings: i32,
    total_revenue: Decimal,
    last_booked: Option<DateTime<Utc>>,
    rating_total: i64,
    rating_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BoatRow {
    fn into_boat(self, unavailable_periods: Vec<UnavailablePeriod>) -> Boat {
        Boat {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            boat_type: self.boat_type,
            location: BoatLocation {
                city: self.city,
                port: self.port,
            },
            capacity: BoatCapacity {
                max_people: self.max_people,
            },
            pricing: BoatPricing {
                daily_rate: self.daily_rate,
                weekly_rate: self.weekly_rate,
                monthly_rate: self.monthly_rate,
                security_deposit: self.security_deposit,
                cleaning_fee: self.cleaning_fee,
                currency: self.currency.trim().to_string(),
            },
            additional_services: self.additional_services.0,
            status: self.status,
            is_active: self.is_active,
            unavailable_periods,
            stats: BoatStats {
                total_bookings: self.total_bookings,
                total_revenue: self.total_revenue,
                last_booked: self.last_booked,
            },
            rating: RatingSummary {
                total: self.rating_total,
                count: self.rating_count,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PeriodRow {
    boat_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: BlockReason,
    booking_id: Option<Uuid>,
}

impl From<PeriodRow> for UnavailablePeriod {
    fn from(row: PeriodRow) -> Self {
        UnavailablePeriod {
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            booking_id: row.booking_id,
        }
    }
}

pub struct PgBoatRepository {
    pool: PgPool,
}

impl PgBoatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_periods(&self, boat_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<UnavailablePeriod>>> {
        let rows = sqlx::query_as::<_, PeriodRow>(
            r#"
            SELECT boat_id, start_date, end_date, reason, booking_id
            FROM boat_unavailable_periods
            WHERE boat_id = ANY($1)
            ORDER BY start_date
            "#,
        )
        .bind(boat_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut periods: HashMap<Uuid, Vec<UnavailablePeriod>> = HashMap::new();
        for row in rows {
            periods.entry(row.boat_id).or_default().push(row.into());
        }
        Ok(periods)
    }

    async fn find_overlapping(
        &self,
        boat_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Option<UnavailablePeriod>> {
        let row = sqlx::query_as::<_, PeriodRow>(
            r#"
            SELECT boat_id, start_date, end_date, reason, booking_id
            FROM boat_unavailable_periods
            WHERE boat_id = $1 AND start_date <= $3 AND $2 <= end_date
            ORDER BY start_date
            LIMIT 1
            "#,
        )
        .bind(boat_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UnavailablePeriod::from))
    }
}

fn push_listing_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &BoatFilters) {
    builder.push(" WHERE 1 = 1");
    if !filters.include_inactive {
        builder.push(" AND is_active = TRUE");
    }
    if let Some(boat_type) = filters.boat_type {
        builder.push(" AND boat_type = ").push_bind(boat_type);
    }
    if let Some(city) = &filters.city {
        builder
            .push(" AND LOWER(city) = LOWER(")
            .push_bind(city.trim().to_string())
            .push(")");
    }
    if let Some(min_capacity) = filters.min_capacity {
        builder.push(" AND max_people >= ").push_bind(min_capacity);
    }
    if let Some(max_rate) = filters.max_daily_rate {
        builder.push(" AND daily_rate <= ").push_bind(max_rate);
    }
    if let Some(owner_id) = filters.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }
}

#[async_trait]
impl BoatRepository for PgBoatRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Boat>> {
        let row = sqlx::query_as::<_, BoatRow>("SELECT * FROM boats WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut periods = self.load_periods(&[row.id]).await?;
                let boat_periods = periods.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_boat(boat_periods)))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filters: &BoatFilters) -> AppResult<Vec<Boat>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM boats");
        push_listing_filters(&mut builder, filters);
        builder.push(" ORDER BY created_at DESC");

        // Con filtro de fechas la paginación se aplica después del ledger
        let paginate_in_sql = filters.available_between.is_none();
        if paginate_in_sql {
            if let Some(limit) = filters.limit {
                builder.push(" LIMIT ").push_bind(limit);
            }
            if let Some(offset) = filters.offset {
                builder.push(" OFFSET ").push_bind(offset);
            }
        }

        let rows = builder
            .build_query_as::<BoatRow>()
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut periods = self.load_periods(&ids).await?;

        let boats = rows.into_iter().map(|row| {
            let boat_periods = periods.remove(&row.id).unwrap_or_default();
            row.into_boat(boat_periods)
        });

        if paginate_in_sql {
            return Ok(boats.collect());
        }

        let offset = filters.offset.unwrap_or(0).max(0) as usize;
        let limit = filters.limit.unwrap_or(i64::MAX).max(0) as usize;
        Ok(boats
            .filter(|boat| filters.matches_availability(boat))
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn insert(&self, boat: &Boat) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO boats (
                id, owner_id, name, description, boat_type, city, port, max_people,
                daily_rate, weekly_rate, monthly_rate, security_deposit, cleaning_fee, currency,
                additional_services, status, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(boat.id)
        .bind(boat.owner_id)
        .bind(&boat.name)
        .bind(&boat.description)
        .bind(boat.boat_type)
        .bind(&boat.location.city)
        .bind(&boat.location.port)
        .bind(boat.capacity.max_people)
        .bind(boat.pricing.daily_rate)
        .bind(boat.pricing.weekly_rate)
        .bind(boat.pricing.monthly_rate)
        .bind(boat.pricing.security_deposit)
        .bind(boat.pricing.cleaning_fee)
        .bind(&boat.pricing.currency)
        .bind(Json(&boat.additional_services))
        .bind(boat.status)
        .bind(boat.is_active)
        .bind(boat.created_at)
        .bind(boat.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_listing(&self, boat: &Boat) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE boats
            SET name = $2, description = $3, boat_type = $4, city = $5, port = $6,
                max_people = $7, daily_rate = $8, weekly_rate = $9, monthly_rate = $10,
                security_deposit = $11, cleaning_fee = $12, currency = $13,
                additional_services = $14, status = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(boat.id)
        .bind(&boat.name)
        .bind(&boat.description)
        .bind(boat.boat_type)
        .bind(&boat.location.city)
        .bind(&boat.location.port)
        .bind(boat.capacity.max_people)
        .bind(boat.pricing.daily_rate)
        .bind(boat.pricing.weekly_rate)
        .bind(boat.pricing.monthly_rate)
        .bind(boat.pricing.security_deposit)
        .bind(boat.pricing.cleaning_fee)
        .bind(&boat.pricing.currency)
        .bind(Json(&boat.additional_services))
        .bind(boat.status)
        .bind(boat.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Boat", boat.id));
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE boats SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Boat", id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM boats WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(not_found_error("Boat", id)),
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(AppError::Conflict(format!(
                "Boat '{}' is referenced by bookings and cannot be removed",
                id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_blocked_period(&self, boat_id: Uuid, period: &UnavailablePeriod) -> AppResult<()> {
        if let Some(conflict) = self
            .find_overlapping(boat_id, period.start_date, period.end_date)
            .await?
        {
            return Err(AppError::Conflict(dates_unavailable_message(
                boat_id,
                period.start_date,
                period.end_date,
                &conflict,
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO boat_unavailable_periods (boat_id, start_date, end_date, reason, booking_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(boat_id)
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.reason)
        .bind(period.booking_id)
        .execute(&self.pool)
        .await;

        // Una inserción concurrente puede ganar entre la consulta y el INSERT
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_overlap_violation(&e) => Err(AppError::Conflict(format!(
                "Boat '{}' is not available from {} to {}",
                boat_id, period.start_date, period.end_date
            ))),
            Err(e) if is_foreign_key_violation(&e) => Err(not_found_error("Boat", boat_id)),
            Err(e) => Err(e.into()),
        }
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

        let result = sqlx::query(
            r#"
            DELETE FROM boat_unavailable_periods
            WHERE boat_id = $1 AND start_date = $2 AND end_date = $3 AND reason = $4
              AND booking_id IS NULL
            "#,
        )
        .bind(boat_id)
        .bind(start)
        .bind(end)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as usize)
    }
}
