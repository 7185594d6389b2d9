//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos en la frontera HTTP.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::fmt;
use validator::ValidationError;

use crate::utils::errors::{field_error, AppResult};

/// Validar y convertir string a fecha (YYYY-MM-DD)
pub fn validate_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let mut error = ValidationError::new("date");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"YYYY-MM-DD".to_string());
        error
    })
}

/// Fecha de un campo de la request; el error queda asociado al campo
pub fn parse_date_field(field: &'static str, value: &str) -> AppResult<NaiveDate> {
    validate_date(value).map_err(|e| field_error(field, e))
}

/// Validar que un importe no sea negativo
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("actual".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un importe sea estrictamente positivo
pub fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if value <= &Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.add_param("actual".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar código de divisa ISO 4217 (tres letras)
pub fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        let mut error = ValidationError::new("currency");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Mes de calendario usado por la consulta de disponibilidad mensual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Acepta exactamente `YYYY-MM`
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || {
            let mut error = ValidationError::new("month");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"YYYY-MM".to_string());
            error
        };

        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;

        Ok(Self { year, month })
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
