use thiserror::Error;

use super::car::{CarChoice, CarResolver};
use super::customer::{CustomerResolution, CustomerResolver};
use super::{Interaction, Operator, Step};
use crate::db::ShopStore;
use crate::error::{Result, ShopError};
use crate::models::{
    parse_complaint, parse_odometer, Car, Customer, NewServiceRequest, ServiceRequest,
};

/// A workflow run that stopped on an error, tagged with the failing step
#[derive(Error, Debug)]
#[error("{step} failed: {error}")]
pub struct WorkflowError {
    pub step: Step,
    #[source]
    pub error: ShopError,
}

/// How a workflow run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// A service request was opened
    Created(ServiceRequest),
    /// Nobody matched the last name, so a customer was added instead of a request
    CustomerAdded(Customer),
    /// The operator stopped before a request was created
    Abandoned { step: Step },
}

impl WorkflowOutcome {
    pub fn request_id(&self) -> Option<i64> {
        match self {
            WorkflowOutcome::Created(request) => Some(request.id),
            _ => None,
        }
    }
}

/// Drives one intake from last-name search to an opened service request
pub struct ServiceRequestWorkflow<'a, S: ShopStore + ?Sized> {
    store: &'a S,
    interaction: Interaction,
}

impl<'a, S: ShopStore + ?Sized> ServiceRequestWorkflow<'a, S> {
    pub fn new(store: &'a S, interaction: Interaction) -> Self {
        Self { store, interaction }
    }

    pub fn run<O: Operator + ?Sized>(
        &self,
        operator: &mut O,
    ) -> std::result::Result<WorkflowOutcome, WorkflowError> {
        match self.drive(operator) {
            Err(WorkflowError {
                step,
                error: ShopError::Cancelled,
            }) => {
                tracing::info!(%step, "intake abandoned by operator");
                Ok(WorkflowOutcome::Abandoned { step })
            }
            Err(err) => {
                tracing::warn!(step = %err.step, error = %err.error, "intake aborted");
                Err(err)
            }
            ok => ok,
        }
    }

    fn drive<O: Operator + ?Sized>(
        &self,
        operator: &mut O,
    ) -> std::result::Result<WorkflowOutcome, WorkflowError> {
        let customers = CustomerResolver::new(self.store);

        let resolution = self.ask(operator, Step::ResolveCustomer, |op| {
            let last_name = op.last_name()?;
            Ok((customers.resolve(&last_name)?, last_name.trim().to_string()))
        })?;

        let customer = match resolution {
            (CustomerResolution::NotFound, last_name) => {
                let create = operator
                    .confirm_new_customer(&last_name)
                    .map_err(at(Step::ResolveCustomer))?;
                if !create {
                    return Ok(WorkflowOutcome::Abandoned {
                        step: Step::ResolveCustomer,
                    });
                }
                let draft = self.ask(operator, Step::CreateCustomer, |op| {
                    let draft = op.new_customer(&last_name)?;
                    draft.validate()?;
                    Ok(draft)
                })?;
                let customer = customers.create(&draft).map_err(at(Step::CreateCustomer))?;
                return Ok(WorkflowOutcome::CustomerAdded(customer));
            }
            (found, _) => self.ask(operator, Step::ResolveCustomer, |op| {
                let candidates: &[Customer] = match &found {
                    CustomerResolution::Found(candidates) => candidates.as_slice(),
                    CustomerResolution::NotFound => &[],
                };
                found.select(&op.choose_customer(candidates)?)
            })?,
        };

        let car = self.resolve_car(operator, &customer)?;

        let odometer = self.ask(operator, Step::CollectDetails, |op| {
            parse_odometer(&op.odometer()?)
        })?;
        let complaint = self.ask(operator, Step::CollectDetails, |op| {
            parse_complaint(&op.complaint()?)
        })?;

        let request = self
            .store
            .open_service_request(&NewServiceRequest {
                customer_id: customer.id,
                car_vin: car.vin,
                odometer,
                complaint,
            })
            .map_err(at(Step::CreateServiceRequest))?;

        Ok(WorkflowOutcome::Created(request))
    }

    fn resolve_car<O: Operator + ?Sized>(
        &self,
        operator: &mut O,
        customer: &Customer,
    ) -> std::result::Result<Car, WorkflowError> {
        let resolver = CarResolver::new(self.store);
        let cars = resolver.owned_cars(customer.id).map_err(at(Step::ResolveCar))?;

        let choice = self.ask(operator, Step::ResolveCar, |op| {
            cars.select(&op.choose_car(customer, &cars)?)
        })?;

        match choice {
            CarChoice::Existing(car) => Ok(car),
            CarChoice::RegisterNew => {
                let draft = self.ask(operator, Step::CreateCarAndOwnership, |op| {
                    let draft = op.new_car()?;
                    draft.validate()?;
                    Ok(draft)
                })?;
                let (car, _ownership) = resolver
                    .register(customer.id, &draft)
                    .map_err(at(Step::CreateCarAndOwnership))?;
                Ok(car)
            }
        }
    }

    /// Runs one prompt step, asking again on invalid input when interactive
    fn ask<O, T>(
        &self,
        operator: &mut O,
        step: Step,
        mut attempt: impl FnMut(&mut O) -> Result<T>,
    ) -> std::result::Result<T, WorkflowError>
    where
        O: Operator + ?Sized,
    {
        loop {
            match attempt(operator) {
                Ok(value) => return Ok(value),
                Err(error)
                    if error.is_validation() && self.interaction == Interaction::Interactive =>
                {
                    tracing::debug!(%step, %error, "answer rejected");
                    operator.rejected(step, &error);
                }
                Err(error) => return Err(WorkflowError { step, error }),
            }
        }
    }
}

fn at(step: Step) -> impl FnOnce(ShopError) -> WorkflowError {
    move |error| WorkflowError { step, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::intake::{CarAnswer, IntakeScript, OwnedCars};
    use crate::models::{CarDraft, CustomerDraft};

    fn smith_store() -> SqliteStore {
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
        for vin in ["1A", "2B", "3C"] {
            store
                .register_car(
                    12,
                    &Car {
                        vin: vin.to_string(),
                        make: "Ford".to_string(),
                        model: "Focus".to_string(),
                        year: 2011,
                    },
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_existing_car_request() {
        let store = smith_store();
        let mut script = IntakeScript::new("Smith")
            .with_customer("12")
            .with_car(CarAnswer::Position("2".to_string()))
            .with_odometer("42000")
            .with_complaint("grinding noise");

        let outcome = ServiceRequestWorkflow::new(&store, Interaction::Batch)
            .run(&mut script)
            .unwrap();

        let request = match outcome {
            WorkflowOutcome::Created(request) => request,
            other => panic!("expected a request, got {other:?}"),
        };
        assert_eq!(request.id, 1);
        assert_eq!(request.car_vin, "2B");
        assert_eq!(request.odometer, 42000);
        assert_eq!(store.stats().unwrap().ownership_count, 3);
    }

    #[test]
    fn test_batch_mode_returns_validation_error_with_step() {
        let store = smith_store();
        let mut script = IntakeScript::new("Smith")
            .with_customer("12")
            .with_car(CarAnswer::Position("1".to_string()))
            .with_odometer("-5")
            .with_complaint("noise");

        let err = ServiceRequestWorkflow::new(&store, Interaction::Batch)
            .run(&mut script)
            .unwrap_err();
        assert_eq!(err.step, Step::CollectDetails);
        assert!(err.error.is_validation());
        assert_eq!(store.stats().unwrap().service_request_count, 0);
    }

    #[test]
    fn test_interactive_mode_reprompts_same_step() {
        let store = smith_store();
        let mut script = IntakeScript::new("Smith")
            .with_customer("99")
            .with_customer("12")
            .with_car(CarAnswer::Position("7".to_string()))
            .with_car(CarAnswer::Position("3".to_string()))
            .with_odometer("-5")
            .with_odometer("42000")
            .with_complaint("noise");

        let outcome = ServiceRequestWorkflow::new(&store, Interaction::Interactive)
            .run(&mut script)
            .unwrap();
        let request = match outcome {
            WorkflowOutcome::Created(request) => request,
            other => panic!("expected a request, got {other:?}"),
        };
        assert_eq!(request.car_vin, "3C");
        assert_eq!(request.odometer, 42000);
        assert_eq!(
            script.rejections(),
            &[Step::ResolveCustomer, Step::ResolveCar, Step::CollectDetails]
        );
    }

    #[test]
    fn test_new_customer_ends_without_request() {
        let store = smith_store();
        let mut script = IntakeScript::new("Nguyen").with_new_customer(CustomerDraft {
            id: "40".to_string(),
            first_name: "Linh".to_string(),
            last_name: "Nguyen".to_string(),
            phone: "(555)111-2222".to_string(),
            address: "9 Elm St".to_string(),
        });

        let outcome = ServiceRequestWorkflow::new(&store, Interaction::Batch)
            .run(&mut script)
            .unwrap();
        assert!(matches!(outcome, WorkflowOutcome::CustomerAdded(ref c) if c.id == 40));
        assert_eq!(outcome.request_id(), None);
        assert!(store.get_customer(40).unwrap().is_some());
        assert_eq!(store.stats().unwrap().service_request_count, 0);
    }

    #[test]
    fn test_duplicate_vin_aborts_at_register_step() {
        let store = smith_store();
        let mut script = IntakeScript::new("Smith")
            .with_customer("12")
            .with_car(CarAnswer::New(CarDraft {
                vin: "1A".to_string(),
                make: "Honda".to_string(),
                model: "Civic".to_string(),
                year: "2020".to_string(),
            }))
            .with_odometer("10")
            .with_complaint("noise");

        let err = ServiceRequestWorkflow::new(&store, Interaction::Interactive)
            .run(&mut script)
            .unwrap_err();
        assert_eq!(err.step, Step::CreateCarAndOwnership);
        assert!(matches!(err.error, ShopError::Conflict(_)));
        assert!(err.to_string().starts_with("register car failed"));
        let stats = store.stats().unwrap();
        assert_eq!(
            (stats.car_count, stats.ownership_count, stats.service_request_count),
            (3, 3, 0)
        );
    }

    #[test]
    fn test_running_out_of_answers_abandons() {
        let store = smith_store();
        let mut script = IntakeScript::new("Smith").with_customer("12");

        let outcome = ServiceRequestWorkflow::new(&store, Interaction::Interactive)
            .run(&mut script)
            .unwrap();
        assert_eq!(outcome, WorkflowOutcome::Abandoned { step: Step::ResolveCar });
    }

    /// Answers from a script until the terminal goes away at the odometer prompt
    struct ClosedInput(IntakeScript);

    impl Operator for ClosedInput {
        fn last_name(&mut self) -> Result<String> {
            self.0.last_name()
        }

        fn confirm_new_customer(&mut self, last_name: &str) -> Result<bool> {
            self.0.confirm_new_customer(last_name)
        }

        fn new_customer(&mut self, last_name: &str) -> Result<CustomerDraft> {
            self.0.new_customer(last_name)
        }

        fn choose_customer(&mut self, candidates: &[Customer]) -> Result<String> {
            self.0.choose_customer(candidates)
        }

        fn choose_car(&mut self, customer: &Customer, cars: &OwnedCars) -> Result<String> {
            self.0.choose_car(customer, cars)
        }

        fn new_car(&mut self) -> Result<CarDraft> {
            self.0.new_car()
        }

        fn odometer(&mut self) -> Result<String> {
            Err(ShopError::Input("The input device is not a TTY".to_string()))
        }

        fn complaint(&mut self) -> Result<String> {
            self.0.complaint()
        }
    }

    #[test]
    fn test_input_failure_is_an_error_not_an_abandon() {
        let store = smith_store();
        let mut operator = ClosedInput(
            IntakeScript::new("Smith")
                .with_customer("12")
                .with_car(CarAnswer::Position("1".to_string())),
        );

        let err = ServiceRequestWorkflow::new(&store, Interaction::Interactive)
            .run(&mut operator)
            .unwrap_err();
        assert_eq!(err.step, Step::CollectDetails);
        assert!(matches!(err.error, ShopError::Input(_)), "{:?}", err.error);
        assert!(err.to_string().starts_with("collect request details failed"));
    }
}
