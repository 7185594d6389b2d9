use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::boat_controller::BoatController;
use crate::controllers::booking_controller::BookingController;
use crate::dto::boat_dto::{
    AvailabilityQuery, BlockedPeriodRequest, BoatListQuery, CreateBoatRequest, DeleteBoatQuery,
    MonthAvailabilityQuery, RemoveBlockedPeriodRequest, UpdateBoatRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, optional_auth_middleware, AuthenticatedUser};
use crate::models::boat::Boat;
use crate::services::availability_service::{MonthAvailability, RangeAvailability};
use crate::services::boat_service::BoatRemoval;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_boat_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_boats))
        .route("/:id", get(get_boat))
        .route("/:id/availability", get(get_availability))
        .route("/:id/availability/month", get(get_month_availability))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected = Router::new()
        .route("/", post(create_boat))
        .route("/:id", axum::routing::put(update_boat).delete(delete_boat))
        .route("/:id/restore", post(restore_boat))
        .route(
            "/:id/blocked-periods",
            post(block_period).delete(unblock_period),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

async fn create_boat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateBoatRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Boat>>), AppError> {
    let controller = BoatController::new(&state);
    let response = controller.create(user.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_boats(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    Query(query): Query<BoatListQuery>,
) -> Result<Json<Vec<Boat>>, AppError> {
    let controller = BoatController::new(&state);
    let actor = user.map(|Extension(u)| u.actor());
    let response = controller.list(actor, query).await?;
    Ok(Json(response))
}

async fn get_boat(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Boat>, AppError> {
    let controller = BoatController::new(&state);
    let actor = user.map(|Extension(u)| u.actor());
    let response = controller.get(actor, id).await?;
    Ok(Json(response))
}

async fn update_boat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBoatRequest>,
) -> Result<Json<ApiResponse<Boat>>, AppError> {
    let controller = BoatController::new(&state);
    let response = controller.update(user.actor(), id, request).await?;
    Ok(Json(response))
}

async fn delete_boat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteBoatQuery>,
) -> Result<Json<ApiResponse<BoatRemoval>>, AppError> {
    let controller = BoatController::new(&state);
    let response = controller
        .delete(user.actor(), id, query.force.unwrap_or(false))
        .await?;
    Ok(Json(response))
}

async fn restore_boat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Boat>>, AppError> {
    let controller = BoatController::new(&state);
    let response = controller.restore(user.actor(), id).await?;
    Ok(Json(response))
}

async fn block_period(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<BlockedPeriodRequest>,
) -> Result<Json<ApiResponse<Boat>>, AppError> {
    let controller = BoatController::new(&state);
    let response = controller.block_period(user.actor(), id, request).await?;
    Ok(Json(response))
}

async fn unblock_period(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<RemoveBlockedPeriodRequest>,
) -> Result<Json<ApiResponse<Boat>>, AppError> {
    let controller = BoatController::new(&state);
    let response = controller.unblock_period(user.actor(), id, request).await?;
    Ok(Json(response))
}

// La disponibilidad es pública; la calcula el servicio de reservas
async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<RangeAvailability>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller
        .availability(id, &query.start_date, &query.end_date)
        .await?;
    Ok(Json(response))
}

async fn get_month_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MonthAvailabilityQuery>,
) -> Result<Json<MonthAvailability>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.month_availability(id, &query.month).await?;
    Ok(Json(response))
}
