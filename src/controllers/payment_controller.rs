use std::sync::Arc;
use validator::Validate;

use crate::dto::booking_dto::BookingResponse;
use crate::dto::payment_dto::{PaymentEventType, PaymentWebhookRequest};
use crate::dto::ApiResponse;
use crate::services::booking_service::BookingService;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct PaymentController {
    service: Arc<BookingService>,
    webhook_secret: String,
}

/// Comparación en tiempo constante respecto al contenido
fn secrets_match(expected: &str, provided: &str) -> bool {
    constant_time_eq::constant_time_eq(expected.as_bytes(), provided.as_bytes())
}

impl PaymentController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.booking_service.clone(),
            webhook_secret: state.config.payment_webhook_secret.clone(),
        }
    }

    pub async fn handle_webhook(
        &self,
        provided_secret: Option<&str>,
        request: PaymentWebhookRequest,
    ) -> AppResult<ApiResponse<BookingResponse>> {
        match provided_secret {
            Some(secret) if secrets_match(&self.webhook_secret, secret) => {}
            _ => {
                return Err(AppError::Unauthorized(
                    "Invalid payment webhook secret".to_string(),
                ))
            }
        }

        request.validate()?;

        let (booking, message) = match request.event_type {
            PaymentEventType::PaymentSucceeded => (
                self.service
                    .record_payment(request.booking_id, request.provider_reference)
                    .await?,
                "Payment recorded",
            ),
            PaymentEventType::RefundSucceeded => (
                self.service
                    .record_refund(request.booking_id, request.amount)
                    .await?,
                "Refund recorded",
            ),
        };

        Ok(ApiResponse::success_with_message(booking.into(), message))
    }
}
