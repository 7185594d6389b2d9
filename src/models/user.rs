//! Modelo de User
//!
//! Usuarios de la plataforma: locataires, propriétaires y administradores.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;
use uuid::Uuid;

/// Rol del usuario - mapea al ENUM user_role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Renter,
    Owner,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Renter => "renter",
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
        }
    }

    /// Acepta tanto el valor inglés como la etiqueta francesa del frontend
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "renter" | "locataire" | "user" | "utilisateur" => Some(UserRole::Renter),
            "owner" | "propriétaire" | "proprietaire" => Some(UserRole::Owner),
            "admin" | "administrateur" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valoraciones acumuladas (barco o usuario). Se guarda la suma de notas;
/// la media sólo se redondea al leerla.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(into = "RatingView", from = "RatingView")]
pub struct RatingSummary {
    pub total: i64,
    pub count: i32,
}

impl RatingSummary {
    pub fn with_rating(self, rating: u8) -> Self {
        Self {
            total: self.total + i64::from(rating),
            count: self.count + 1,
        }
    }

    /// Media con dos decimales; 0 sin valoraciones
    pub fn average(&self) -> Decimal {
        if self.count <= 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.total) / Decimal::from(self.count)).round_dp(2)
    }
}

/// Forma JSON de `RatingSummary`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingView {
    #[serde(default)]
    average: Decimal,
    #[serde(default)]
    total: i64,
    #[serde(default)]
    count: i32,
}

impl From<RatingSummary> for RatingView {
    fn from(summary: RatingSummary) -> Self {
        Self {
            average: summary.average(),
            total: summary.total,
            count: summary.count,
        }
    }
}

impl From<RatingView> for RatingSummary {
    fn from(view: RatingView) -> Self {
        Self {
            total: view.total,
            count: view.count,
        }
    }
}

/// Usuario principal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        role: UserRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            password_hash,
            first_name,
            last_name,
            role,
            rating: RatingSummary::default(),
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Quién ejecuta una operación del core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
