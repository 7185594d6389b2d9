use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::auth_dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::dto::ApiResponse;
use crate::models::user::UserRole;
use crate::services::auth_service::{AuthService, Registration};
use crate::state::AppState;
use crate::utils::errors::{validation_error, AppResult};

pub struct AuthController {
    service: Arc<AuthService>,
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: state.auth_service.clone(),
        }
    }

    /// Registro: renter por defecto
    pub async fn register(&self, request: RegisterRequest) -> AppResult<ApiResponse<AuthResponse>> {
        request.validate()?;

        let role = match request.role.as_deref() {
            Some(label) => UserRole::from_label(label)
                .ok_or_else(|| validation_error("role", format!("Unknown role '{}'", label)))?,
            None => UserRole::Renter,
        };

        let (user, token) = self
            .service
            .register(Registration {
                email: request.email,
                password: request.password,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                role,
            })
            .await?;

        Ok(ApiResponse::success_with_message(
            AuthResponse {
                token,
                user: user.into(),
            },
            "Account created",
        ))
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<ApiResponse<AuthResponse>> {
        request.validate()?;

        let (user, token) = self
            .service
            .login(&request.email, &request.password)
            .await?;

        Ok(ApiResponse::success(AuthResponse {
            token,
            user: user.into(),
        }))
    }

    pub async fn me(&self, user_id: Uuid) -> AppResult<UserResponse> {
        Ok(self.service.current_user(user_id).await?.into())
    }
}
