use crate::db::ShopStore;
use crate::error::{Result, ShopError};
use crate::models::{parse_id, Customer, CustomerDraft};

/// Result of searching customers by last name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerResolution {
    /// One or more customers share the last name, ordered by id
    Found(Vec<Customer>),
    NotFound,
}

impl CustomerResolution {
    /// Picks the candidate whose id the operator typed
    pub fn select(&self, raw_id: &str) -> Result<Customer> {
        let candidates = match self {
            CustomerResolution::Found(candidates) => candidates,
            CustomerResolution::NotFound => {
                return Err(ShopError::validation("there are no customers to choose from"))
            }
        };
        let id = parse_id("customer id", raw_id)?;
        candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| {
                ShopError::validation(format!("customer {id} is not one of the listed customers"))
            })
    }
}

/// Looks customers up by last name and creates them when asked
///
/// Names are matched exactly and case-sensitively after trimming
/// surrounding whitespace.
pub struct CustomerResolver<'a, S: ShopStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ShopStore + ?Sized> CustomerResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn resolve(&self, last_name: &str) -> Result<CustomerResolution> {
        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(ShopError::validation("last name must not be empty"));
        }

        let candidates = self.store.find_customers_by_last_name(last_name)?;
        tracing::debug!(last_name, matches = candidates.len(), "customer lookup");
        if candidates.is_empty() {
            Ok(CustomerResolution::NotFound)
        } else {
            Ok(CustomerResolution::Found(candidates))
        }
    }

    /// Validates and inserts a new customer
    pub fn create(&self, draft: &CustomerDraft) -> Result<Customer> {
        let customer = draft.validate()?;
        self.store.insert_customer(&customer)?;
        Ok(customer)
    }
}
