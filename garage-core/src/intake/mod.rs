//! Service-request intake
//!
//! The intake workflow identifies (or creates) a customer, identifies (or
//! registers) the car being serviced, collects the odometer reading and the
//! complaint, then opens a service request. Operator answers arrive through
//! the [`Operator`] trait so the same workflow drives interactive prompts,
//! command-line arguments and tests.

mod car;
mod customer;
mod script;
mod workflow;

pub use car::{CarChoice, CarResolver, OwnedCars};
pub use customer::{CustomerResolution, CustomerResolver};
pub use script::{CarAnswer, IntakeScript};
pub use workflow::{ServiceRequestWorkflow, WorkflowError, WorkflowOutcome};

use crate::error::{Result, ShopError};
use crate::models::{CarDraft, Customer, CustomerDraft};

/// Steps of the intake workflow, used to report where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveCustomer,
    CreateCustomer,
    ResolveCar,
    CreateCarAndOwnership,
    CollectDetails,
    CreateServiceRequest,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::ResolveCustomer => write!(f, "resolve customer"),
            Step::CreateCustomer => write!(f, "create customer"),
            Step::ResolveCar => write!(f, "resolve car"),
            Step::CreateCarAndOwnership => write!(f, "register car"),
            Step::CollectDetails => write!(f, "collect request details"),
            Step::CreateServiceRequest => write!(f, "create service request"),
        }
    }
}

/// How the workflow reacts to invalid operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Ask again at the same step
    Interactive,
    /// Return the validation error to the caller
    Batch,
}

/// Source of operator answers
///
/// Every method returns the raw answer; validation happens in the workflow.
/// Returning `ShopError::Cancelled` abandons the workflow at that step.
pub trait Operator {
    /// Last name to search customers by
    fn last_name(&mut self) -> Result<String>;

    /// Whether to create a customer after a search found nobody
    fn confirm_new_customer(&mut self, last_name: &str) -> Result<bool>;

    /// Details of the customer to create
    fn new_customer(&mut self, last_name: &str) -> Result<CustomerDraft>;

    /// Id of the chosen customer among `candidates`
    fn choose_customer(&mut self, candidates: &[Customer]) -> Result<String>;

    /// 1-based position of the chosen car in `cars`, or `0` for a new car
    fn choose_car(&mut self, customer: &Customer, cars: &OwnedCars) -> Result<String>;

    /// Details of the car to register
    fn new_car(&mut self) -> Result<CarDraft>;

    fn odometer(&mut self) -> Result<String>;

    fn complaint(&mut self) -> Result<String>;

    /// Called when an answer was rejected and the step is about to ask again
    fn rejected(&mut self, _step: Step, _error: &ShopError) {}
}
