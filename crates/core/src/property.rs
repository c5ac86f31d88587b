//! Property and unit field validation.
//!
//! Area values arrive from clients as floats (the frontend computes them
//! from dimensions) and are stored as whole square units.

use chrono::Datelike;

use crate::error::CoreError;
use crate::workflow::validate_code;

/// Largest accepted area, in square units.
pub const MAX_AREA: f64 = 10_000_000.0;

/// Maximum property name length.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum unit number length.
pub const MAX_UNIT_NUMBER_LENGTH: usize = 32;

/// Earliest accepted construction year.
pub const MIN_YEAR_BUILT: i32 = 1800;

pub const PROPERTY_TYPES: &[&str] = &["residential", "commercial", "industrial", "mixed_use"];

pub const PROPERTY_STATUSES: &[&str] = &["ACTIVE", "INACTIVE", "UNDER_MAINTENANCE"];

pub const UNIT_STATUSES: &[&str] = &["VACANT", "OCCUPIED", "MAINTENANCE"];

/// Round a client-supplied area to the nearest whole number.
///
/// Halves round away from zero (`12.5 -> 13`). `None` passes through so the
/// same helper serves partial updates.
pub fn round_area(area: Option<f64>) -> Result<Option<i32>, CoreError> {
    let Some(value) = area else {
        return Ok(None);
    };
    if !value.is_finite() {
        return Err(CoreError::Validation("Area must be a finite number".into()));
    }
    if value < 0.0 {
        return Err(CoreError::Validation("Area must not be negative".into()));
    }
    if value > MAX_AREA {
        return Err(CoreError::Validation(format!(
            "Area must not exceed {MAX_AREA}"
        )));
    }
    Ok(Some(value.round() as i32))
}

/// Validate a non-empty, bounded property name. Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Property name is required".into()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Property name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate the required address parts.
pub fn validate_address(line1: &str, city: &str, country: &str) -> Result<(), CoreError> {
    for (field, value) in [("address_line1", line1), ("city", city), ("country", country)] {
        if value.trim().is_empty() {
            return Err(CoreError::Validation(format!("{field} is required")));
        }
    }
    Ok(())
}

pub fn validate_property_type(value: &str) -> Result<(), CoreError> {
    validate_code("property type", value, PROPERTY_TYPES)
}

pub fn validate_property_status(value: &str) -> Result<(), CoreError> {
    validate_code("property status", value, PROPERTY_STATUSES)
}

pub fn validate_unit_status(value: &str) -> Result<(), CoreError> {
    validate_code("unit status", value, UNIT_STATUSES)
}

/// Construction year must lie between 1800 and five years from now.
pub fn validate_year_built(year: Option<i32>) -> Result<(), CoreError> {
    let Some(year) = year else {
        return Ok(());
    };
    let max = chrono::Utc::now().year() + 5;
    if !(MIN_YEAR_BUILT..=max).contains(&year) {
        return Err(CoreError::Validation(format!(
            "year_built must be between {MIN_YEAR_BUILT} and {max}"
        )));
    }
    Ok(())
}

/// Validated unit attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitFigures {
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<f64>,
    pub rent_cents: Option<i64>,
}

/// Validate unit number plus room counts and rent.
///
/// Bathrooms come in half steps (a "1.5 bath" unit).
pub fn validate_unit(
    unit_number: Option<&str>,
    figures: UnitFigures,
) -> Result<Option<String>, CoreError> {
    let number = match unit_number {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(CoreError::Validation("unit_number is required".into()));
            }
            if trimmed.chars().count() > MAX_UNIT_NUMBER_LENGTH {
                return Err(CoreError::Validation(format!(
                    "unit_number must be at most {MAX_UNIT_NUMBER_LENGTH} characters"
                )));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    if let Some(bedrooms) = figures.bedrooms {
        if !(0..=50).contains(&bedrooms) {
            return Err(CoreError::Validation("bedrooms must be between 0 and 50".into()));
        }
    }
    if let Some(bathrooms) = figures.bathrooms {
        if !bathrooms.is_finite() || !(0.0..=50.0).contains(&bathrooms) {
            return Err(CoreError::Validation("bathrooms must be between 0 and 50".into()));
        }
        if (bathrooms * 2.0).fract() != 0.0 {
            return Err(CoreError::Validation(
                "bathrooms must be a multiple of 0.5".into(),
            ));
        }
    }
    if let Some(rent) = figures.rent_cents {
        if rent < 0 {
            return Err(CoreError::Validation("rent_cents must not be negative".into()));
        }
    }
    Ok(number)
}

/// Fraction of occupied units in `[0, 1]`; `0.0` when there are no units.
pub fn occupancy_rate(occupied: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        (occupied as f64 / total as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_rounds_to_nearest_integer() {
        assert_eq!(round_area(Some(1234.4)).unwrap(), Some(1234));
        assert_eq!(round_area(Some(1234.6)).unwrap(), Some(1235));
        assert_eq!(round_area(Some(12.5)).unwrap(), Some(13));
        assert_eq!(round_area(Some(0.0)).unwrap(), Some(0));
    }

    #[test]
    fn missing_area_passes_through() {
        assert_eq!(round_area(None).unwrap(), None);
    }

    #[test]
    fn bad_areas_are_rejected() {
        assert!(round_area(Some(-1.0)).is_err());
        assert!(round_area(Some(f64::NAN)).is_err());
        assert!(round_area(Some(f64::INFINITY)).is_err());
        assert!(round_area(Some(MAX_AREA + 1.0)).is_err());
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(validate_name("  Maple Court ").unwrap(), "Maple Court");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn address_requires_line_city_country() {
        assert!(validate_address("1 Main St", "Springfield", "US").is_ok());
        let err = validate_address("1 Main St", " ", "US").unwrap_err();
        assert!(err.to_string().contains("city"));
    }

    #[test]
    fn year_built_bounds() {
        assert!(validate_year_built(None).is_ok());
        assert!(validate_year_built(Some(1999)).is_ok());
        assert!(validate_year_built(Some(1700)).is_err());
        assert!(validate_year_built(Some(3000)).is_err());
    }

    #[test]
    fn unit_validation() {
        let ok = UnitFigures {
            bedrooms: Some(2),
            bathrooms: Some(1.5),
            rent_cents: Some(150_000),
        };
        assert_eq!(validate_unit(Some(" 4B "), ok).unwrap().as_deref(), Some("4B"));

        let bad_bath = UnitFigures {
            bathrooms: Some(1.25),
            ..ok
        };
        assert!(validate_unit(Some("4B"), bad_bath).is_err());

        let bad_rent = UnitFigures {
            rent_cents: Some(-1),
            ..ok
        };
        assert!(validate_unit(None, bad_rent).is_err());
        assert!(validate_unit(Some(""), ok).is_err());
    }

    #[test]
    fn occupancy_rate_handles_empty() {
        assert_eq!(occupancy_rate(0, 0), 0.0);
        assert_eq!(occupancy_rate(3, 4), 0.75);
    }

    #[test]
    fn type_and_status_lists() {
        assert!(validate_property_type("mixed_use").is_ok());
        assert!(validate_property_type("castle").is_err());
        assert!(validate_property_status("UNDER_MAINTENANCE").is_ok());
        assert!(validate_unit_status("VACANT").is_ok());
        assert!(validate_unit_status("vacant").is_err());
    }
}
