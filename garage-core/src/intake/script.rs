use std::collections::VecDeque;

use super::{Operator, OwnedCars, Step};
use crate::error::{Result, ShopError};
use crate::models::{CarDraft, Customer, CustomerDraft};

/// Answer to the car selection prompt
#[derive(Debug, Clone)]
pub enum CarAnswer {
    /// A display position typed by the operator
    Position(String),
    /// Register this car (the same as answering `0` and filling in the details)
    New(CarDraft),
}

/// Operator whose answers are queued up front
///
/// Used for non-interactive intake from command-line arguments. Each prompt
/// consumes the next queued answer for that prompt; when none is left the
/// prompt is cancelled.
#[derive(Debug, Clone, Default)]
pub struct IntakeScript {
    last_names: VecDeque<String>,
    new_customers: VecDeque<CustomerDraft>,
    customers: VecDeque<String>,
    cars: VecDeque<CarAnswer>,
    new_cars: VecDeque<CarDraft>,
    odometers: VecDeque<String>,
    complaints: VecDeque<String>,
    rejections: Vec<Step>,
}

impl IntakeScript {
    pub fn new(last_name: impl Into<String>) -> Self {
        Self::default().with_last_name(last_name)
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_names.push_back(last_name.into());
        self
    }

    /// Answers "yes" to creating a customer when the search finds nobody
    ///
    /// An empty last name in the draft is filled from the search.
    pub fn with_new_customer(mut self, draft: CustomerDraft) -> Self {
        self.new_customers.push_back(draft);
        self
    }

    pub fn with_customer(mut self, id: impl Into<String>) -> Self {
        self.customers.push_back(id.into());
        self
    }

    pub fn with_car(mut self, answer: CarAnswer) -> Self {
        self.cars.push_back(answer);
        self
    }

    pub fn with_odometer(mut self, reading: impl Into<String>) -> Self {
        self.odometers.push_back(reading.into());
        self
    }

    pub fn with_complaint(mut self, text: impl Into<String>) -> Self {
        self.complaints.push_back(text.into());
        self
    }

    /// Steps whose answers were rejected, in order
    pub fn rejections(&self) -> &[Step] {
        &self.rejections
    }
}

fn next<T>(queue: &mut VecDeque<T>) -> Result<T> {
    queue.pop_front().ok_or(ShopError::Cancelled)
}

impl Operator for IntakeScript {
    fn last_name(&mut self) -> Result<String> {
        next(&mut self.last_names)
    }

    fn confirm_new_customer(&mut self, _last_name: &str) -> Result<bool> {
        Ok(!self.new_customers.is_empty())
    }

    fn new_customer(&mut self, last_name: &str) -> Result<CustomerDraft> {
        let mut draft = next(&mut self.new_customers)?;
        if draft.last_name.trim().is_empty() {
            draft.last_name = last_name.to_string();
        }
        Ok(draft)
    }

    fn choose_customer(&mut self, _candidates: &[Customer]) -> Result<String> {
        next(&mut self.customers)
    }

    fn choose_car(&mut self, _customer: &Customer, _cars: &OwnedCars) -> Result<String> {
        match next(&mut self.cars)? {
            CarAnswer::Position(position) => Ok(position),
            CarAnswer::New(draft) => {
                self.new_cars.push_back(draft);
                Ok("0".to_string())
            }
        }
    }

    fn new_car(&mut self) -> Result<CarDraft> {
        next(&mut self.new_cars)
    }

    fn odometer(&mut self) -> Result<String> {
        next(&mut self.odometers)
    }

    fn complaint(&mut self) -> Result<String> {
        next(&mut self.complaints)
    }

    fn rejected(&mut self, step: Step, _error: &ShopError) {
        self.rejections.push(step);
    }
}
