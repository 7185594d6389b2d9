//! Middleware de autenticación JWT
//!
//! Este módulo maneja la extracción y verificación del token bearer y la
//! carga del usuario autenticado.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    models::user::{Actor, UserRole},
    state::AppState,
    utils::errors::AppError,
    utils::jwt::{extract_token_from_header, verify_token},
};

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Sólo recibe las cabeceras: el cuerpo de la request no es `Sync`
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, &state.jwt)?;
    let user_id = claims.user_id()?;

    // El rol se toma de la base de datos, no del token
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    Ok(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    })
}

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware opcional de autenticación (rutas públicas que cambian con sesión)
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.headers().contains_key(header::AUTHORIZATION) {
        if let Ok(user) = authenticate(&state, request.headers()).await {
            request.extensions_mut().insert(user);
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environment::EnvironmentConfig;
    use crate::models::user::User;
    use crate::utils::jwt::generate_token;
    use axum::http::HeaderValue;

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_middleware_futures_are_send() {
        let state = AppState::in_memory(EnvironmentConfig::default());
        let headers = HeaderMap::new();
        let future = authenticate(&state, &headers);
        assert_send(&future);
        assert!(future.await.is_err());
    }

    #[tokio::test]
    async fn test_authenticate_loads_role_from_store() {
        let state = AppState::in_memory(EnvironmentConfig::default());
        let user = User::new(
            "captain@example.com".to_string(),
            "hash".to_string(),
            "Marie".to_string(),
            "Curie".to_string(),
            UserRole::Owner,
        );
        state.users.insert(&user).await.expect("insert");

        // Token emitido con otro rol: manda el almacén
        let token = generate_token(user.id, UserRole::Renter, &state.jwt).expect("token");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).expect("header"),
        );

        let authenticated = authenticate(&state, &headers).await.expect("authenticated");
        assert_eq!(authenticated.user_id, user.id);
        assert_eq!(authenticated.role, UserRole::Owner);
    }
}
