use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::boat_dto::{
    BlockedPeriodRequest, BoatListQuery, CreateBoatRequest, RemoveBlockedPeriodRequest,
    UpdateBoatRequest,
};
use crate::dto::ApiResponse;
use crate::models::boat::{BlockReason, Boat, BoatFilters, BoatStatus, BoatType, BoatUpdate, NewBoat};
use crate::models::user::Actor;
use crate::services::boat_service::{BoatRemoval, BoatService};
use crate::state::AppState;
use crate::utils::errors::{validation_error, AppResult};
use crate::utils::validation::parse_date_field;

pub struct BoatController {
    service: Arc<BoatService>,
}

fn parse_boat_type(label: &str) -> AppResult<BoatType> {
    BoatType::from_label(label)
        .ok_or_else(|| validation_error("boatType", format!("Unknown boat type '{}'", label)))
}

fn parse_block_reason(label: Option<&str>) -> AppResult<BlockReason> {
    match label.map(|l| l.trim().to_lowercase()).as_deref() {
        None | Some("owner_blocked") | Some("owner") | Some("bloqué") | Some("bloque") => {
            Ok(BlockReason::OwnerBlocked)
        }
        Some("maintenance") | Some("entretien") => Ok(BlockReason::Maintenance),
        Some(other) => Err(validation_error(
            "reason",
            format!("Unknown block reason '{}'", other),
        )),
    }
}

impl BoatController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.boat_service.clone(),
        }
    }

    pub async fn create(
        &self,
        actor: Actor,
        request: CreateBoatRequest,
    ) -> AppResult<ApiResponse<Boat>> {
        request.validate()?;
        for offer in &request.additional_services {
            offer.validate()?;
        }

        let new_boat = NewBoat {
            boat_type: parse_boat_type(&request.boat_type)?,
            name: request.name.trim().to_string(),
            description: request.description,
            location: request.location.into(),
            capacity: request.capacity.into(),
            pricing: request.pricing.into(),
            additional_services: request
                .additional_services
                .into_iter()
                .map(Into::into)
                .collect(),
        };

        let boat = self.service.create_boat(actor, new_boat).await?;
        Ok(ApiResponse::success_with_message(boat, "Boat listed"))
    }

    pub async fn get(&self, actor: Option<Actor>, boat_id: Uuid) -> AppResult<Boat> {
        self.service.get_boat(actor, boat_id).await
    }

    pub async fn list(&self, actor: Option<Actor>, query: BoatListQuery) -> AppResult<Vec<Boat>> {
        query.validate()?;

        let available_between = match (&query.available_from, &query.available_to) {
            (Some(from), Some(to)) => Some((
                parse_date_field("availableFrom", from)?,
                parse_date_field("availableTo", to)?,
            )),
            (None, None) => None,
            _ => {
                return Err(validation_error(
                    "availableFrom",
                    "availableFrom and availableTo must be given together",
                ))
            }
        };

        let filters = BoatFilters {
            boat_type: query.boat_type.as_deref().map(parse_boat_type).transpose()?,
            city: query.city,
            min_capacity: query.min_capacity,
            max_daily_rate: query.max_daily_rate,
            owner_id: query.owner_id,
            available_between,
            include_inactive: query.include_inactive.unwrap_or(false),
            limit: Some(query.limit.unwrap_or(20)),
            offset: query.offset,
        };

        self.service.list_boats(actor, filters).await
    }

    pub async fn update(
        &self,
        actor: Actor,
        boat_id: Uuid,
        request: UpdateBoatRequest,
    ) -> AppResult<ApiResponse<Boat>> {
        request.validate()?;
        if let Some(services) = &request.additional_services {
            for offer in services {
                offer.validate()?;
            }
        }

        let status = match request.status.as_deref() {
            Some(label) => Some(BoatStatus::from_label(label).ok_or_else(|| {
                validation_error("status", format!("Unknown boat status '{}'", label))
            })?),
            None => None,
        };

        let update = BoatUpdate {
            name: request.name.map(|n| n.trim().to_string()),
            description: request.description,
            boat_type: request.boat_type.as_deref().map(parse_boat_type).transpose()?,
            location: request.location.map(Into::into),
            max_people: request.capacity.map(|c| c.max_people),
            pricing: request.pricing.map(Into::into),
            additional_services: request
                .additional_services
                .map(|services| services.into_iter().map(Into::into).collect()),
            status,
        };

        let boat = self.service.update_boat(actor, boat_id, update).await?;
        Ok(ApiResponse::success_with_message(boat, "Boat updated"))
    }

    pub async fn delete(
        &self,
        actor: Actor,
        boat_id: Uuid,
        force: bool,
    ) -> AppResult<ApiResponse<BoatRemoval>> {
        let outcome = self.service.delete_boat(actor, boat_id, force).await?;
        let message = match &outcome {
            BoatRemoval::Deleted => "Boat deleted",
            BoatRemoval::Deactivated { .. } => "Boat has bookings and was deactivated",
        };
        Ok(ApiResponse::success_with_message(outcome, message))
    }

    pub async fn restore(&self, actor: Actor, boat_id: Uuid) -> AppResult<ApiResponse<Boat>> {
        let boat = self.service.restore_boat(actor, boat_id).await?;
        Ok(ApiResponse::success_with_message(boat, "Boat restored"))
    }

    pub async fn block_period(
        &self,
        actor: Actor,
        boat_id: Uuid,
        request: BlockedPeriodRequest,
    ) -> AppResult<ApiResponse<Boat>> {
        let start = parse_date_field("startDate", &request.start_date)?;
        let end = parse_date_field("endDate", &request.end_date)?;
        let reason = parse_block_reason(request.reason.as_deref())?;

        let boat = self
            .service
            .add_blocked_period(actor, boat_id, start, end, reason)
            .await?;
        Ok(ApiResponse::success_with_message(boat, "Dates blocked"))
    }

    pub async fn unblock_period(
        &self,
        actor: Actor,
        boat_id: Uuid,
        request: RemoveBlockedPeriodRequest,
    ) -> AppResult<ApiResponse<Boat>> {
        let start = parse_date_field("startDate", &request.start_date)?;
        let end = parse_date_field("endDate", &request.end_date)?;

        let boat = self
            .service
            .remove_blocked_period(actor, boat_id, start, end)
            .await?;
        Ok(ApiResponse::success_with_message(boat, "Dates released"))
    }
}
