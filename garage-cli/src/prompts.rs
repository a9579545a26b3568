use anyhow::Result;
use colored::Colorize;
use inquire::{Confirm, InquireError, Text};

use garage_core::{
    CarDraft, Customer, CustomerDraft, MechanicDraft, Operator, OwnedCars, ShopError, Step,
};

/// Maps Esc/Ctrl-C to a cancelled step and any other prompt failure to an input error
fn answer<T>(result: std::result::Result<T, InquireError>) -> garage_core::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
            Err(ShopError::Cancelled)
        }
        Err(err) => Err(ShopError::Input(err.to_string())),
    }
}

fn ask(label: &str) -> garage_core::Result<String> {
    answer(Text::new(label).prompt())
}

/// Prints customers the way the add/search commands list them
pub fn print_customers(customers: &[Customer]) {
    println!(
        "{:<8} | {:<20} | {:<20} | {:<16} | {:<30}",
        "ID", "First", "Last", "Phone", "Address"
    );
    println!("{}", "-".repeat(104));
    for customer in customers {
        println!(
            "{:<8} | {:<20} | {:<20} | {:<16} | {:<30}",
            customer.id, customer.first_name, customer.last_name, customer.phone, customer.address
        );
    }
}

/// Prints cars numbered from 1, with 0 reserved for a new car
pub fn print_numbered_cars(cars: &OwnedCars) {
    println!("{:>4} | {:<20} | {:<15} | {:<15} | {:<6}", "#", "VIN", "Make", "Model", "Year");
    println!("{}", "-".repeat(70));
    println!("{:>4} | {}", 0, "Register a new car".cyan());
    for (position, car) in cars.numbered() {
        println!(
            "{:>4} | {:<20} | {:<15} | {:<15} | {:<6}",
            position, car.vin, car.make, car.model, car.year
        );
    }
    if cars.is_empty() {
        println!("{}", "No cars on file for this customer.".yellow());
    }
}

/// Operator backed by terminal prompts
#[derive(Debug, Default)]
pub struct InquireOperator;

impl Operator for InquireOperator {
    fn last_name(&mut self) -> garage_core::Result<String> {
        ask("Customer last name:")
    }

    fn confirm_new_customer(&mut self, last_name: &str) -> garage_core::Result<bool> {
        println!("{}", format!("No customer with last name '{}' found.", last_name).yellow());
        answer(Confirm::new("Add a new customer?").with_default(true).prompt())
    }

    fn new_customer(&mut self, last_name: &str) -> garage_core::Result<CustomerDraft> {
        Ok(CustomerDraft {
            id: ask("Customer id:")?,
            first_name: ask("First name:")?,
            last_name: answer(Text::new("Last name:").with_default(last_name).prompt())?,
            phone: ask("Phone:")?,
            address: ask("Address:")?,
        })
    }

    fn choose_customer(&mut self, candidates: &[Customer]) -> garage_core::Result<String> {
        print_customers(candidates);
        ask("Customer id:")
    }

    fn choose_car(&mut self, customer: &Customer, cars: &OwnedCars) -> garage_core::Result<String> {
        println!("\nCars owned by {}:", customer.full_name().green());
        print_numbered_cars(cars);
        ask("Car number:")
    }

    fn new_car(&mut self) -> garage_core::Result<CarDraft> {
        prompt_car_draft()
    }

    fn odometer(&mut self) -> garage_core::Result<String> {
        ask("Odometer reading:")
    }

    fn complaint(&mut self) -> garage_core::Result<String> {
        ask("Complaint:")
    }

    fn rejected(&mut self, step: Step, error: &ShopError) {
        eprintln!("{}", format!("{}: {}", step, error).red());
    }
}

pub fn prompt_car_draft() -> garage_core::Result<CarDraft> {
    Ok(CarDraft {
        vin: ask("VIN:")?,
        make: ask("Make:")?,
        model: ask("Model:")?,
        year: ask("Year:")?,
    })
}

/// Prompts for a customer, keeping any field already given on the command line
pub fn prompt_customer_draft(seed: CustomerDraft) -> Result<CustomerDraft> {
    Ok(CustomerDraft {
        id: prompt_with_default("Customer id:", &seed.id)?,
        first_name: prompt_with_default("First name:", &seed.first_name)?,
        last_name: prompt_with_default("Last name:", &seed.last_name)?,
        phone: prompt_with_default("Phone:", &seed.phone)?,
        address: prompt_with_default("Address:", &seed.address)?,
    })
}

pub fn prompt_mechanic_draft(seed: MechanicDraft) -> Result<MechanicDraft> {
    Ok(MechanicDraft {
        id: prompt_with_default("Mechanic id:", &seed.id)?,
        first_name: prompt_with_default("First name:", &seed.first_name)?,
        last_name: prompt_with_default("Last name:", &seed.last_name)?,
        experience: prompt_with_default("Years of experience:", &seed.experience)?,
    })
}

pub fn prompt_new_car(seed: CarDraft) -> Result<CarDraft> {
    Ok(CarDraft {
        vin: prompt_with_default("VIN:", &seed.vin)?,
        make: prompt_with_default("Make:", &seed.make)?,
        model: prompt_with_default("Model:", &seed.model)?,
        year: prompt_with_default("Year:", &seed.year)?,
    })
}

fn prompt_with_default(label: &str, current: &str) -> Result<String> {
    let mut text = Text::new(label);
    if !current.is_empty() {
        text = text.with_default(current);
    }
    Ok(text.prompt()?)
}

/// Asks whether to try again after a rejected entry
pub fn confirm_retry() -> Result<bool> {
    Ok(Confirm::new("Try again?").with_default(true).prompt()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_and_interrupt_cancel_the_step() {
        let escaped = answer::<String>(Err(InquireError::OperationCanceled)).unwrap_err();
        assert!(matches!(escaped, ShopError::Cancelled));
        let interrupted = answer::<String>(Err(InquireError::OperationInterrupted)).unwrap_err();
        assert!(matches!(interrupted, ShopError::Cancelled));
    }

    #[test]
    fn test_missing_terminal_is_an_input_error() {
        let err = answer::<String>(Err(InquireError::NotTTY)).unwrap_err();
        assert!(matches!(err, ShopError::Input(_)), "{err:?}");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_answer_passes_values_through() {
        assert!(answer(Ok(true)).unwrap());
        assert_eq!(answer(Ok("Smith".to_string())).unwrap(), "Smith");
    }
}
