use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Repair shop intake and reporting")]
pub struct Cli {
    /// Path to the shop database (overrides GARAGE_DB and the config file)
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log debug output to stderr
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Runs the interactive menu when omitted
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive main menu
    Menu,

    /// Manage customers
    #[clap(subcommand)]
    Customer(CustomerCommand),

    /// Manage mechanics
    #[clap(subcommand)]
    Mechanic(MechanicCommand),

    /// Manage cars
    #[clap(subcommand)]
    Car(CarCommand),

    /// Open a service request
    Request(RequestArgs),

    /// Run one of the fixed reports
    Report {
        /// Print rows as JSON instead of a table
        #[clap(long)]
        json: bool,

        #[clap(subcommand)]
        report: ReportCommand,
    },

    /// Show or create the config file
    #[clap(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// Add a new customer
    Add {
        /// Unique customer id
        #[clap(long)]
        id: Option<String>,

        #[clap(long)]
        first_name: Option<String>,

        #[clap(long)]
        last_name: Option<String>,

        /// Phone number, e.g. (555)123-4567
        #[clap(long)]
        phone: Option<String>,

        #[clap(long)]
        address: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum MechanicCommand {
    /// Add a new mechanic
    Add {
        /// Unique mechanic id
        #[clap(long)]
        id: Option<String>,

        #[clap(long)]
        first_name: Option<String>,

        #[clap(long)]
        last_name: Option<String>,

        /// Years of experience
        #[clap(long)]
        experience: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CarCommand {
    /// Add a car without linking it to a customer
    Add {
        #[clap(long)]
        vin: Option<String>,

        #[clap(long)]
        make: Option<String>,

        #[clap(long)]
        model: Option<String>,

        #[clap(long)]
        year: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },
}

/// Answers for a non-interactive intake; prompts are used when none are given
#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// Last name to search customers by
    #[clap(long)]
    pub last_name: Option<String>,

    /// Id of the matching customer to use
    #[clap(long)]
    pub customer: Option<String>,

    /// Position of the customer's car in VIN order, or 0 to register a new car
    #[clap(long)]
    pub car: Option<String>,

    /// VIN of a new car to register (implies --car 0)
    #[clap(long)]
    pub vin: Option<String>,

    #[clap(long)]
    pub make: Option<String>,

    #[clap(long)]
    pub model: Option<String>,

    #[clap(long)]
    pub year: Option<String>,

    /// Current odometer reading
    #[clap(long)]
    pub odometer: Option<String>,

    /// The customer's complaint
    #[clap(long)]
    pub complaint: Option<String>,

    /// Create a customer with this id when the last name is not found
    #[clap(long)]
    pub new_customer_id: Option<String>,

    #[clap(long)]
    pub first_name: Option<String>,

    #[clap(long)]
    pub phone: Option<String>,

    #[clap(long)]
    pub address: Option<String>,

    /// Use interactive mode (prompts)
    #[clap(long)]
    pub interactive: bool,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Customers with a closed request billed below a limit
    LowBills {
        #[clap(long, default_value_t = 100)]
        below: i64,
    },

    /// Customers owning more than a number of cars
    FleetOwners {
        #[clap(long, default_value_t = 20)]
        more_than: i64,
    },

    /// Cars built before a year serviced with a low odometer reading
    VintageCars {
        #[clap(long, default_value_t = 1995)]
        before: i32,

        #[clap(long, default_value_t = 50000)]
        under: u32,
    },

    /// Cars with the most service requests
    TopServiced {
        /// Number of cars to list (defaults to report_limit from the config)
        #[clap(long, short = 'k')]
        limit: Option<usize>,
    },

    /// Customers by total billed amount, highest first
    TotalBills,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file location and effective settings
    Show,

    /// Write a default config file if none exists
    Init,
}
