//! Controladores
//!
//! Traducen DTOs a tipos de dominio y delegan en los servicios.

pub mod auth_controller;
pub mod boat_controller;
pub mod booking_controller;
pub mod payment_controller;
