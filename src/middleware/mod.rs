//! Middleware del sistema
//!
//! Este módulo contiene el middleware de autenticación.

pub mod auth;

pub use auth::*;
