//! DTOs de la API
//!
//! Cuerpos JSON en camelCase; la validación de formato vive aquí y la de
//! negocio en los servicios.

use serde::Serialize;

pub mod auth_dto;
pub mod boat_dto;
pub mod booking_dto;
pub mod payment_dto;

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}
