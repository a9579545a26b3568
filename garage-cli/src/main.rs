use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use inquire::{CustomType, InquireError, Select};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use garage_core::{
    get_config_path, open_or_create, CarAnswer, CarDraft, CustomerDraft, IntakeScript,
    Interaction, MechanicDraft, ServiceRequestWorkflow, ShopConfig, ShopError, ShopStore,
    SqliteStore, WorkflowError, WorkflowOutcome,
};

mod cli;
mod prompts;

use cli::{
    CarCommand, Cli, Command, ConfigCommand, CustomerCommand, MechanicCommand, ReportCommand,
    RequestArgs,
};
use prompts::InquireOperator;

/// Environment variable holding the log filter, e.g. `GARAGE_LOG=garage_core=debug`
const LOG_ENV: &str = "GARAGE_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = get_config_path()?;
    let config = ShopConfig::load_or_default(&config_path)?;
    tracing::debug!(config = %config_path.display(), "loaded config");

    let open_store = || -> Result<SqliteStore> {
        let store_config = config.store_config(cli.db.as_deref());
        open_or_create(&store_config)
            .with_context(|| format!("Failed to open shop database {:?}", store_config.path))
    };

    match &cli.command {
        Some(Command::Config(cmd)) => {
            handle_config_command(cmd, &config_path, &config, cli.db.as_deref())
        }
        None | Some(Command::Menu) => run_menu(&open_store()?, &config),
        Some(Command::Customer(CustomerCommand::Add {
            id,
            first_name,
            last_name,
            phone,
            address,
            interactive,
        })) => {
            let seed = CustomerDraft {
                id: id.clone().unwrap_or_default(),
                first_name: first_name.clone().unwrap_or_default(),
                last_name: last_name.clone().unwrap_or_default(),
                phone: phone.clone().unwrap_or_default(),
                address: address.clone().unwrap_or_default(),
            };
            let prompt = *interactive
                || (id.is_none()
                    && first_name.is_none()
                    && last_name.is_none()
                    && phone.is_none()
                    && address.is_none());
            add_customer(&open_store()?, seed, prompt)
        }
        Some(Command::Mechanic(MechanicCommand::Add {
            id,
            first_name,
            last_name,
            experience,
            interactive,
        })) => {
            let seed = MechanicDraft {
                id: id.clone().unwrap_or_default(),
                first_name: first_name.clone().unwrap_or_default(),
                last_name: last_name.clone().unwrap_or_default(),
                experience: experience.clone().unwrap_or_default(),
            };
            let prompt = *interactive
                || (id.is_none()
                    && first_name.is_none()
                    && last_name.is_none()
                    && experience.is_none());
            add_mechanic(&open_store()?, seed, prompt)
        }
        Some(Command::Car(CarCommand::Add {
            vin,
            make,
            model,
            year,
            interactive,
        })) => {
            let seed = CarDraft {
                vin: vin.clone().unwrap_or_default(),
                make: make.clone().unwrap_or_default(),
                model: model.clone().unwrap_or_default(),
                year: year.clone().unwrap_or_default(),
            };
            let prompt = *interactive
                || (vin.is_none() && make.is_none() && model.is_none() && year.is_none());
            add_car(&open_store()?, seed, prompt)
        }
        Some(Command::Request(args)) => handle_request(&open_store()?, args),
        Some(Command::Report { json, report }) => {
            run_report(&open_store()?, &config, report, *json)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// =========================================================================
// Main menu
// =========================================================================

#[derive(Debug, Clone, Copy)]
enum MenuEntry {
    AddCustomer,
    AddMechanic,
    AddCar,
    NewServiceRequest,
    LowBills,
    FleetOwners,
    VintageCars,
    TopServiced,
    TotalBills,
    Exit,
}

impl MenuEntry {
    const ALL: [MenuEntry; 10] = [
        MenuEntry::AddCustomer,
        MenuEntry::AddMechanic,
        MenuEntry::AddCar,
        MenuEntry::NewServiceRequest,
        MenuEntry::LowBills,
        MenuEntry::FleetOwners,
        MenuEntry::VintageCars,
        MenuEntry::TopServiced,
        MenuEntry::TotalBills,
        MenuEntry::Exit,
    ];
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuEntry::AddCustomer => "Add customer",
            MenuEntry::AddMechanic => "Add mechanic",
            MenuEntry::AddCar => "Add car",
            MenuEntry::NewServiceRequest => "Open service request",
            MenuEntry::LowBills => "Customers with a bill under 100",
            MenuEntry::FleetOwners => "Customers with more than 20 cars",
            MenuEntry::VintageCars => "Cars before 1995 with under 50000 miles",
            MenuEntry::TopServiced => "Cars with the most service requests",
            MenuEntry::TotalBills => "Customers by total bill",
            MenuEntry::Exit => "Exit",
        };
        write!(f, "{}", label)
    }
}

fn run_menu(store: &SqliteStore, config: &ShopConfig) -> Result<()> {
    println!("{}", "Repair shop".green().bold());
    println!("Database: {}", store.path().display());

    loop {
        let entry = match Select::new("What would you like to do?", MenuEntry::ALL.to_vec())
            .with_page_size(MenuEntry::ALL.len())
            .prompt()
        {
            Ok(entry) => entry,
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        let result = match entry {
            MenuEntry::AddCustomer => add_customer(store, CustomerDraft::default(), true),
            MenuEntry::AddMechanic => add_mechanic(store, MechanicDraft::default(), true),
            MenuEntry::AddCar => add_car(store, CarDraft::default(), true),
            MenuEntry::NewServiceRequest => report_outcome(
                ServiceRequestWorkflow::new(store, Interaction::Interactive)
                    .run(&mut InquireOperator),
                false,
            ),
            MenuEntry::LowBills => {
                run_report(store, config, &ReportCommand::LowBills { below: 100 }, false)
            }
            MenuEntry::FleetOwners => run_report(
                store,
                config,
                &ReportCommand::FleetOwners { more_than: 20 },
                false,
            ),
            MenuEntry::VintageCars => run_report(
                store,
                config,
                &ReportCommand::VintageCars {
                    before: 1995,
                    under: 50000,
                },
                false,
            ),
            MenuEntry::TopServiced => CustomType::<usize>::new("How many cars?")
                .with_default(config.report_limit)
                .prompt()
                .map_err(anyhow::Error::from)
                .and_then(|k| {
                    run_report(store, config, &ReportCommand::TopServiced { limit: Some(k) }, false)
                }),
            MenuEntry::TotalBills => run_report(store, config, &ReportCommand::TotalBills, false),
            MenuEntry::Exit => break,
        };

        // A failed entry never ends the session
        if let Err(err) = result {
            eprintln!("{} {:#}", "Error:".red(), err);
        }
        println!();
    }

    Ok(())
}

// =========================================================================
// Adding records
// =========================================================================

/// Validates and saves a draft, re-prompting on rejected input when interactive
fn save_draft<D, T>(
    mut draft: D,
    interactive: bool,
    prompt: fn(D) -> Result<D>,
    save: impl Fn(&D) -> garage_core::Result<T>,
) -> Result<Option<T>> {
    loop {
        if interactive {
            draft = prompt(draft)?;
        }
        match save(&draft) {
            Ok(saved) => return Ok(Some(saved)),
            Err(err @ (ShopError::Validation(_) | ShopError::Conflict(_))) if interactive => {
                eprintln!("{}", err.to_string().red());
                if !prompts::confirm_retry()? {
                    return Ok(None);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn add_customer(store: &SqliteStore, seed: CustomerDraft, interactive: bool) -> Result<()> {
    let saved = save_draft(seed, interactive, prompts::prompt_customer_draft, |draft| {
        let customer = draft.validate()?;
        store.insert_customer(&customer)?;
        Ok(customer)
    })?;

    if let Some(customer) = saved {
        println!("{}", "Customer added successfully!".green());
        println!("ID: {}", customer.id.to_string().green());
    }
    Ok(())
}

fn add_mechanic(store: &SqliteStore, seed: MechanicDraft, interactive: bool) -> Result<()> {
    let saved = save_draft(seed, interactive, prompts::prompt_mechanic_draft, |draft| {
        let mechanic = draft.validate()?;
        store.insert_mechanic(&mechanic)?;
        Ok(mechanic)
    })?;

    if let Some(mechanic) = saved {
        println!("{}", "Mechanic added successfully!".green());
        println!("ID: {}", mechanic.id.to_string().green());
    }
    Ok(())
}

fn add_car(store: &SqliteStore, seed: CarDraft, interactive: bool) -> Result<()> {
    let saved = save_draft(seed, interactive, prompts::prompt_new_car, |draft| {
        let car = draft.validate()?;
        store.insert_car(&car)?;
        Ok(car)
    })?;

    if let Some(car) = saved {
        println!("{}", "Car added successfully!".green());
        println!("VIN: {}", car.vin.green());
    }
    Ok(())
}

// =========================================================================
// Service requests
// =========================================================================

fn handle_request(store: &SqliteStore, args: &RequestArgs) -> Result<()> {
    let scripted = args.last_name.is_some() && !args.interactive;

    if scripted {
        let mut script = script_from_args(args);
        let outcome = ServiceRequestWorkflow::new(store, Interaction::Batch).run(&mut script);
        report_outcome(outcome, true)
    } else {
        let outcome =
            ServiceRequestWorkflow::new(store, Interaction::Interactive).run(&mut InquireOperator);
        report_outcome(outcome, false)
    }
}

fn script_from_args(args: &RequestArgs) -> IntakeScript {
    let mut script = IntakeScript::new(args.last_name.clone().unwrap_or_default());

    if let Some(id) = &args.new_customer_id {
        script = script.with_new_customer(CustomerDraft {
            id: id.clone(),
            first_name: args.first_name.clone().unwrap_or_default(),
            last_name: String::new(),
            phone: args.phone.clone().unwrap_or_default(),
            address: args.address.clone().unwrap_or_default(),
        });
    }
    if let Some(customer) = &args.customer {
        script = script.with_customer(customer.clone());
    }

    if let Some(vin) = &args.vin {
        script = script.with_car(CarAnswer::New(CarDraft {
            vin: vin.clone(),
            make: args.make.clone().unwrap_or_default(),
            model: args.model.clone().unwrap_or_default(),
            year: args.year.clone().unwrap_or_default(),
        }));
    } else if let Some(position) = &args.car {
        script = script.with_car(CarAnswer::Position(position.clone()));
    }

    if let Some(odometer) = &args.odometer {
        script = script.with_odometer(odometer.clone());
    }
    if let Some(complaint) = &args.complaint {
        script = script.with_complaint(complaint.clone());
    }
    script
}

fn report_outcome(
    outcome: std::result::Result<WorkflowOutcome, WorkflowError>,
    scripted: bool,
) -> Result<()> {
    match outcome? {
        WorkflowOutcome::Created(request) => {
            println!("{}", "Service request opened!".green());
            println!("Your service request id is: {}", request.id.to_string().green());
            println!("{}: {}", "Customer".blue(), request.customer_id);
            println!("{}: {}", "Car".blue(), request.car_vin);
            println!("{}: {}", "Opened".blue(), request.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("{}: {}", "Odometer".blue(), request.odometer);
            println!("{}: {}", "Complaint".blue(), request.complaint);
        }
        WorkflowOutcome::CustomerAdded(customer) => {
            println!("{}", "Customer added successfully!".green());
            println!("ID: {}", customer.id.to_string().green());
            println!("Open the service request again to continue with {}.", customer.full_name());
        }
        WorkflowOutcome::Abandoned { step } => {
            println!("{}", format!("No service request created (stopped at {}).", step).yellow());
            if scripted {
                println!("Supply the remaining options or use --interactive.");
            }
        }
    }
    Ok(())
}

// =========================================================================
// Reports
// =========================================================================

fn run_report(
    store: &SqliteStore,
    config: &ShopConfig,
    report: &ReportCommand,
    json: bool,
) -> Result<()> {
    match report {
        ReportCommand::LowBills { below } => {
            let rows = store.customers_with_bill_below(*below)?;
            if json {
                return print_json(&rows);
            }
            println!(
                "{:<20} | {:<20} | {:>8} | {:<20} | {:<40}",
                "First", "Last", "Bill", "Date", "Comment"
            );
            println!("{}", "-".repeat(118));
            for row in &rows {
                println!(
                    "{:<20} | {:<20} | {:>8} | {:<20} | {:<40}",
                    row.first_name, row.last_name, row.bill, row.request_date, row.comment
                );
            }
            print_total(rows.len());
        }
        ReportCommand::FleetOwners { more_than } => {
            let rows = store.customers_with_more_cars_than(*more_than)?;
            if json {
                return print_json(&rows);
            }
            println!("{:<20} | {:<20} | {:>6}", "First", "Last", "Cars");
            println!("{}", "-".repeat(52));
            for row in &rows {
                println!("{:<20} | {:<20} | {:>6}", row.first_name, row.last_name, row.car_count);
            }
            print_total(rows.len());
        }
        ReportCommand::VintageCars { before, under } => {
            let rows = store.cars_before_year_under_odometer(*before, *under)?;
            if json {
                return print_json(&rows);
            }
            println!("{:<15} | {:<15} | {:<6} | {:>10}", "Make", "Model", "Year", "Odometer");
            println!("{}", "-".repeat(55));
            for row in &rows {
                println!(
                    "{:<15} | {:<15} | {:<6} | {:>10}",
                    row.make, row.model, row.year, row.odometer
                );
            }
            print_total(rows.len());
        }
        ReportCommand::TopServiced { limit } => {
            let rows = store.cars_with_most_services(limit.unwrap_or(config.report_limit))?;
            if json {
                return print_json(&rows);
            }
            println!("{:<15} | {:<15} | {:>8}", "Make", "Model", "Services");
            println!("{}", "-".repeat(44));
            for row in &rows {
                println!("{:<15} | {:<15} | {:>8}", row.make, row.model, row.service_count);
            }
            print_total(rows.len());
        }
        ReportCommand::TotalBills => {
            let rows = store.customers_by_total_bill()?;
            if json {
                return print_json(&rows);
            }
            println!("{:<20} | {:<20} | {:>10}", "First", "Last", "Total");
            println!("{}", "-".repeat(56));
            for row in &rows {
                println!("{:<20} | {:<20} | {:>10}", row.first_name, row.last_name, row.total_bill);
            }
            print_total(rows.len());
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(rows: &[T]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

fn print_total(count: usize) {
    if count == 0 {
        println!("{}", "No rows found.".yellow());
    } else {
        println!("total row(s): {}", count);
    }
}

// =========================================================================
// Config
// =========================================================================

fn handle_config_command(
    cmd: &ConfigCommand,
    config_path: &Path,
    config: &ShopConfig,
    explicit_db: Option<&Path>,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let exists = if config_path.exists() { "" } else { " (not created)" };
            println!("{}: {}{}", "Config file".blue(), config_path.display(), exists);
            println!(
                "{}: {}",
                "Database".blue(),
                config.resolve_database_path(explicit_db).display()
            );
            println!("{}: {} ms", "Busy timeout".blue(), config.busy_timeout_ms);
            println!("{}: {}", "WAL mode".blue(), config.wal_mode);
            println!("{}: {}", "Report limit".blue(), config.report_limit);
        }
        ConfigCommand::Init => {
            if config_path.exists() {
                let message = format!("Config already exists at {}", config_path.display());
                println!("{}", message.yellow());
            } else {
                ShopConfig::create_default(config_path)?;
                println!("{}", "Config file created successfully!".green());
                println!("Path: {}", config_path.display());
            }
        }
    }
    Ok(())
}
