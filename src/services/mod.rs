//! Services module
//!
//! Este módulo contiene la lógica de negocio: precio, ledger de
//! disponibilidad, máquina de estados y los servicios que los orquestan
//! sobre los repositorios.

pub mod auth_service;
pub mod availability_service;
pub mod boat_service;
pub mod booking_service;
pub mod booking_state_machine;
pub mod pending_sweep;
pub mod pricing_service;

pub use auth_service::AuthService;
pub use boat_service::BoatService;
pub use booking_service::BookingService;
