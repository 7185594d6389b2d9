use http::HeaderName;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_non_negative;

/// Cabecera con el secreto compartido del proveedor de pago
pub const WEBHOOK_SECRET_HEADER: HeaderName = HeaderName::from_static("x-payment-webhook-secret");

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventType {
    PaymentSucceeded,
    RefundSucceeded,
}

// Callback del proveedor de pago
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookRequest {
    #[serde(rename = "type")]
    pub event_type: PaymentEventType,
    pub booking_id: Uuid,
    #[validate(length(max = 255))]
    pub provider_reference: Option<String>,
    /// Sólo para reembolsos; sin importe se usa el calculado en la reserva
    #[validate(custom = "validate_non_negative")]
    pub amount: Option<Decimal>,
}
