//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio; las filas SQL viven en los
//! repositorios y se convierten a estos tipos.

pub mod boat;
pub mod booking;
pub mod user;
