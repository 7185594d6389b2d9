use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::booking_controller::BookingController;
use crate::dto::booking_dto::{
    BookingListQuery, BookingResponse, CancelBookingRequest, CancellationResponse,
    CreateBookingRequest, InspectionRequest, ReviewRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::services::pricing_service::CancellationQuote;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_booking_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
        .route("/:id/cancellation-quote", get(get_cancellation_quote))
        .route("/:id/confirm", post(confirm_booking))
        .route("/:id/cancel", post(cancel_booking))
        .route("/:id/check-in", post(check_in))
        .route("/:id/check-out", post(check_out))
        .route("/:id/review", post(add_review))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingResponse>>), AppError> {
    let controller = BookingController::new(&state);
    let response = controller.create(user.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.list(user.actor(), query).await?;
    Ok(Json(response))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.get(user.actor(), id).await?;
    Ok(Json(response))
}

async fn get_cancellation_quote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancellationQuote>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.cancellation_quote(user.actor(), id).await?;
    Ok(Json(response))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.confirm(user.actor(), id).await?;
    Ok(Json(response))
}

// El cuerpo es opcional: sin motivo se anula igual
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelBookingRequest>>,
) -> Result<Json<ApiResponse<CancellationResponse>>, AppError> {
    let controller = BookingController::new(&state);
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let response = controller.cancel(user.actor(), id, request).await?;
    Ok(Json(response))
}

async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<InspectionRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.check_in(user.actor(), id, request).await?;
    Ok(Json(response))
}

async fn check_out(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<InspectionRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.check_out(user.actor(), id, request).await?;
    Ok(Json(response))
}

async fn add_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let controller = BookingController::new(&state);
    let response = controller.review(user.actor(), id, request).await?;
    Ok(Json(response))
}
