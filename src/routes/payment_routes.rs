use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};

use crate::controllers::payment_controller::PaymentController;
use crate::dto::booking_dto::BookingResponse;
use crate::dto::payment_dto::{PaymentWebhookRequest, WEBHOOK_SECRET_HEADER};
use crate::dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Callbacks del proveedor de pago (sin JWT, autenticados por secreto)
pub fn create_payment_router() -> Router<AppState> {
    Router::new().route("/webhook", post(payment_webhook))
}

async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PaymentWebhookRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let controller = PaymentController::new(&state);
    let response = controller.handle_webhook(secret, request).await?;
    Ok(Json(response))
}
