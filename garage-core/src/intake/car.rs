use crate::db::ShopStore;
use crate::error::{Result, ShopError};
use crate::models::{Car, CarDraft, Ownership};

/// What the operator picked from a customer's car list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarChoice {
    Existing(Car),
    RegisterNew,
}

/// A customer's cars in display order (by VIN)
///
/// Positions are 1-based and only meaningful for this list; a choice is
/// bound to the car itself as soon as it is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCars {
    cars: Vec<Car>,
}

impl OwnedCars {
    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Cars paired with their display positions
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &Car)> {
        self.cars.iter().enumerate().map(|(i, car)| (i + 1, car))
    }

    /// Maps a typed position to a choice; `0` registers a new car
    pub fn select(&self, raw_position: &str) -> Result<CarChoice> {
        let value = raw_position.trim();
        let position: usize = value
            .parse()
            .map_err(|_| ShopError::validation(format!("'{value}' is not a list position")))?;

        if position == 0 {
            return Ok(CarChoice::RegisterNew);
        }
        self.cars
            .get(position - 1)
            .cloned()
            .map(CarChoice::Existing)
            .ok_or_else(|| {
                if self.cars.is_empty() {
                    ShopError::validation("customer has no cars on file; enter 0 to add one")
                } else {
                    ShopError::validation(format!(
                        "position must be between 0 and {}",
                        self.cars.len()
                    ))
                }
            })
    }
}

/// Lists a customer's cars and registers new ones
pub struct CarResolver<'a, S: ShopStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ShopStore + ?Sized> CarResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn owned_cars(&self, customer_id: i64) -> Result<OwnedCars> {
        let cars = self.store.find_cars_owned_by(customer_id)?;
        Ok(OwnedCars { cars })
    }

    /// Validates the draft, then creates the car and its ownership link together
    pub fn register(&self, customer_id: i64, draft: &CarDraft) -> Result<(Car, Ownership)> {
        let car = draft.validate()?;
        let ownership = self.store.register_car(customer_id, &car)?;
        Ok((car, ownership))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::models::Customer;

    fn car(vin: &str) -> Car {
        Car {
            vin: vin.to_string(),
            make: "Ford".to_string(),
            model: "Focus".to_string(),
            year: 2011,
        }
    }

    fn store_with_fleet() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_customer(&Customer {
                id: 12,
                first_name: "Ada".to_string(),
                last_name: "Smith".to_string(),
                phone: String::new(),
                address: String::new(),
            })
            .unwrap();
        for vin in ["2B", "3C", "1A"] {
            store.register_car(12, &car(vin)).unwrap();
        }
        store
    }

    #[test]
    fn test_select_by_position() {
        let store = store_with_fleet();
        let cars = CarResolver::new(&store).owned_cars(12).unwrap();

        assert_eq!(cars.select("2").unwrap(), CarChoice::Existing(car("2B")));
        assert_eq!(cars.select("0").unwrap(), CarChoice::RegisterNew);
        assert!(cars.select("4").unwrap_err().is_validation());
        assert!(cars.select("-1").unwrap_err().is_validation());
        assert!(cars.select("two").unwrap_err().is_validation());
    }

    #[test]
    fn test_empty_list_only_accepts_zero() {
        let store = store_with_fleet();
        let cars = CarResolver::new(&store).owned_cars(99).unwrap();
        assert!(cars.is_empty());
        assert!(cars.select("1").unwrap_err().is_validation());
        assert_eq!(cars.select("0").unwrap(), CarChoice::RegisterNew);
    }

    #[test]
    fn test_numbered_positions_start_at_one() {
        let store = store_with_fleet();
        let cars = CarResolver::new(&store).owned_cars(12).unwrap();
        let listed: Vec<(usize, &str)> = cars
            .numbered()
            .map(|(n, c)| (n, c.vin.as_str()))
            .collect();
        assert_eq!(listed, vec![(1, "1A"), (2, "2B"), (3, "3C")]);
    }

    #[test]
    fn test_register_invalid_draft_inserts_nothing() {
        let store = store_with_fleet();
        let resolver = CarResolver::new(&store);
        let draft = CarDraft {
            vin: "9Z".to_string(),
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            year: "soon".to_string(),
        };
        assert!(resolver.register(12, &draft).unwrap_err().is_validation());
        assert_eq!(store.get_car("9Z").unwrap(), None);
    }
}
