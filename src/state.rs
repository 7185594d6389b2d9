//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. No hay estado mutable fuera de aquí.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::{
    BoatRepository, BookingRepository, InMemoryStore, PgBoatRepository, PgBookingRepository,
    PgUserRepository, UserRepository,
};
use crate::services::{AuthService, BoatService, BookingService};
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub jwt: JwtConfig,
    pub users: Arc<dyn UserRepository>,
    pub auth_service: Arc<AuthService>,
    pub boat_service: Arc<BoatService>,
    pub booking_service: Arc<BookingService>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        boats: Arc<dyn BoatRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let jwt = JwtConfig::from(&config);
        let booking_service = Arc::new(BookingService::new(boats.clone(), bookings.clone()));
        let boat_service = Arc::new(BoatService::new(
            boats,
            bookings,
            booking_service.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(
            users.clone(),
            jwt.clone(),
            config.bcrypt_cost,
        ));

        Self {
            config,
            jwt,
            users,
            auth_service,
            boat_service,
            booking_service,
        }
    }

    pub fn with_postgres(config: EnvironmentConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgBoatRepository::new(pool.clone())),
            Arc::new(PgBookingRepository::new(pool.clone())),
            Arc::new(PgUserRepository::new(pool)),
        )
    }

    /// Un único almacén en memoria detrás de los tres repositorios
    pub fn in_memory(config: EnvironmentConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(config, store.clone(), store.clone(), store)
    }
}
