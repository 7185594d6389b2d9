//! Servicio de autenticación
//!
//! Registro y login con hashes bcrypt; emite JWT HS256.

use bcrypt::{hash, verify};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::user::{User, UserRole};
use crate::repositories::UserRepository;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig};

/// Datos de alta de un usuario
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtConfig,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtConfig, bcrypt_cost: u32) -> Self {
        Self {
            users,
            jwt,
            bcrypt_cost,
        }
    }

    /// El rol admin no se puede auto-asignar
    pub async fn register(&self, registration: Registration) -> AppResult<(User, String)> {
        if registration.role == UserRole::Admin {
            return Err(AppError::Forbidden(
                "Cannot register: the admin role is assigned by an administrator".to_string(),
            ));
        }
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                registration.email.trim().to_lowercase()
            )));
        }

        let password_hash = self.hash_password(registration.password).await?;
        let user = User::new(
            registration.email,
            password_hash,
            registration.first_name,
            registration.last_name,
            registration.role,
        );
        self.users.insert(&user).await?;

        let token = generate_token(user.id, user.role, &self.jwt)?;
        info!("👤 User {} registered as {}", user.email, user.role);
        Ok((user, token))
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                warn!("🔐 Login attempt for unknown email {}", email);
                return Err(invalid());
            }
        };

        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify(password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(|e| AppError::Hash(e.to_string()))?;

        if !matches {
            warn!("🔐 Wrong password for {}", user.email);
            return Err(invalid());
        }

        let token = generate_token(user.id, user.role, &self.jwt)?;
        info!("🔓 User {} logged in", user.email);
        Ok((user, token))
    }

    pub async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found_error("User", user_id))
    }

    async fn hash_password(&self, password: String) -> AppResult<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hash task failed: {}", e)))?
            .map_err(|e| AppError::Hash(e.to_string()))
    }
}
