//! Entities persisted by the shop store and the raw drafts operators fill in

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShopError};

/// Earliest model year accepted for a car
pub const MIN_CAR_YEAR: i32 = 1886;

/// A shop customer. The id is supplied by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl std::fmt::Display for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.full_name(), self.phone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanic {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Years of experience
    pub experience: u32,
}

/// A car, keyed by its VIN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: i32,
}

impl std::fmt::Display for Car {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} [{}]", self.year, self.make, self.model, self.vin)
    }
}

/// Junction row linking a customer to a car they own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub id: i64,
    pub customer_id: i64,
    pub car_vin: String,
}

/// An open repair request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: i64,
    pub customer_id: i64,
    pub car_vin: String,
    pub created_at: DateTime<Utc>,
    pub odometer: u32,
    pub complaint: String,
}

/// A service request before an id and creation time are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceRequest {
    pub customer_id: i64,
    pub car_vin: String,
    pub odometer: u32,
    pub complaint: String,
}

// =========================================================================
// Operator drafts
// =========================================================================

/// Customer fields exactly as typed by the operator
#[derive(Debug, Clone, Default)]
pub struct CustomerDraft {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

impl CustomerDraft {
    pub fn validate(&self) -> Result<Customer> {
        Ok(Customer {
            id: parse_id("customer id", &self.id)?,
            first_name: required("first name", &self.first_name)?,
            last_name: required("last name", &self.last_name)?,
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MechanicDraft {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub experience: String,
}

impl MechanicDraft {
    pub fn validate(&self) -> Result<Mechanic> {
        Ok(Mechanic {
            id: parse_id("mechanic id", &self.id)?,
            first_name: required("first name", &self.first_name)?,
            last_name: required("last name", &self.last_name)?,
            experience: parse_non_negative("experience", &self.experience)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CarDraft {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: String,
}

impl CarDraft {
    pub fn validate(&self) -> Result<Car> {
        Ok(Car {
            vin: required("VIN", &self.vin)?,
            make: required("make", &self.make)?,
            model: required("model", &self.model)?,
            year: parse_year(&self.year)?,
        })
    }
}

// =========================================================================
// Field parsing
// =========================================================================

fn required(field: &str, raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ShopError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

/// Parses an operator-supplied numeric identifier
pub fn parse_id(field: &str, raw: &str) -> Result<i64> {
    let value = raw.trim();
    let id: i64 = value
        .parse()
        .map_err(|_| ShopError::validation(format!("{field} '{value}' is not a number")))?;
    if id < 0 {
        return Err(ShopError::validation(format!("{field} cannot be negative")));
    }
    Ok(id)
}

fn parse_non_negative(field: &str, raw: &str) -> Result<u32> {
    let value = raw.trim();
    let number: i64 = value
        .parse()
        .map_err(|_| ShopError::validation(format!("{field} '{value}' is not a number")))?;
    if number < 0 {
        return Err(ShopError::validation(format!("{field} cannot be negative")));
    }
    u32::try_from(number)
        .map_err(|_| ShopError::validation(format!("{field} {number} is too large")))
}

/// Odometer readings are non-negative whole numbers
pub fn parse_odometer(raw: &str) -> Result<u32> {
    parse_non_negative("odometer", raw)
}

pub fn parse_complaint(raw: &str) -> Result<String> {
    required("complaint", raw)
}

pub fn parse_year(raw: &str) -> Result<i32> {
    let value = raw.trim();
    let year: i32 = value
        .parse()
        .map_err(|_| ShopError::validation(format!("year '{value}' is not a number")))?;
    let latest = Utc::now().year() + 1;
    if !(MIN_CAR_YEAR..=latest).contains(&year) {
        return Err(ShopError::validation(format!(
            "year must be between {MIN_CAR_YEAR} and {latest}"
        )));
    }
    Ok(year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odometer_rejects_negative_and_garbage() {
        assert!(parse_odometer("-5").unwrap_err().is_validation());
        assert!(parse_odometer("lots").unwrap_err().is_validation());
        assert!(parse_odometer("").unwrap_err().is_validation());
        assert!(parse_odometer("99999999999").unwrap_err().is_validation());
        assert_eq!(parse_odometer(" 42000 ").unwrap(), 42000);
        assert_eq!(parse_odometer("0").unwrap(), 0);
    }

    #[test]
    fn test_car_draft_validation() {
        let draft = CarDraft {
            vin: " 9Z ".to_string(),
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            year: "2020".to_string(),
        };
        let car = draft.validate().unwrap();
        assert_eq!(car.vin, "9Z");
        assert_eq!(car.year, 2020);

        let mut bad = draft.clone();
        bad.vin = "   ".to_string();
        assert!(bad.validate().unwrap_err().is_validation());

        let mut bad = draft;
        bad.year = "1700".to_string();
        assert!(bad.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_customer_draft_trims_names() {
        let draft = CustomerDraft {
            id: "12".to_string(),
            first_name: " Ada ".to_string(),
            last_name: "Smith ".to_string(),
            phone: "(555)123-4567".to_string(),
            address: "1 Main St".to_string(),
        };
        let customer = draft.validate().unwrap();
        assert_eq!(customer.id, 12);
        assert_eq!(customer.first_name, "Ada");
        assert_eq!(customer.last_name, "Smith");
    }

    #[test]
    fn test_mechanic_draft_requires_numeric_experience() {
        let draft = MechanicDraft {
            id: "3".to_string(),
            first_name: "Lin".to_string(),
            last_name: "Park".to_string(),
            experience: "ten".to_string(),
        };
        assert!(draft.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_complaint_must_not_be_blank() {
        assert_eq!(parse_complaint(" brakes squeal ").unwrap(), "brakes squeal");
        assert!(parse_complaint("  ").unwrap_err().is_validation());
    }
}
