//! Boat rental marketplace backend
//!
//! Anuncios de barcos, calendario de disponibilidad y ciclo de vida de las
//! reservas con su precio, sobre PostgreSQL o un almacén en memoria.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
