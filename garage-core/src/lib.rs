pub mod config;
pub mod db;
pub mod error;
pub mod intake;
pub mod models;

// Re-export commonly used types
pub use config::{get_config_path, ShopConfig};
pub use db::{
    open_or_create, CustomerBillRow, FleetOwnerRow, IdTable, LowBillRow, ServiceCountRow,
    ShopStore, SqliteStore, StoreConfig, StoreStats, VintageCarRow,
};
pub use error::{Result, ShopError};
pub use intake::{
    CarAnswer, CarChoice, CarResolver, CustomerResolution, CustomerResolver, IntakeScript,
    Interaction, Operator, OwnedCars, ServiceRequestWorkflow, Step, WorkflowError,
    WorkflowOutcome,
};
pub use models::{
    Car, CarDraft, Customer, CustomerDraft, Mechanic, MechanicDraft, NewServiceRequest, Ownership,
    ServiceRequest,
};
