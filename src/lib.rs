// Mortgage Calculator - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod calculator;
pub mod schedule;
pub mod scenario;
pub mod db;
pub mod config;

// Re-export commonly used types
pub use calculator::{
    calculate, monthly_principal_and_interest,
    CalculatorError, MAX_TERM_YEARS, LoanScenario, PaymentBreakdown,
};
pub use schedule::{
    build_schedule, AmortizationSchedule, PaymentRow, YearSummary,
};
pub use scenario::{input_fingerprint, SavedScenario};
pub use db::{
    Event, SaveOutcome,
    setup_database, save_scenario, load_scenario, find_scenario_by_name,
    find_scenarios_by_fingerprint, list_scenarios, count_scenarios,
    delete_scenario, insert_event, get_events_for_entity,
};
pub use config::{AppConfig, open_database, default_database_path};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber. RUST_LOG wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
