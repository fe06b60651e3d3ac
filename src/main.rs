// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;

// Use library instead of local modules
use mortgage_calc::{
    build_schedule, calculate, delete_scenario, find_scenario_by_name,
    find_scenarios_by_fingerprint, get_events_for_entity, init_tracing, list_scenarios,
    load_scenario, save_scenario, AppConfig, LoanScenario, PaymentBreakdown, SaveOutcome,
    SavedScenario,
};

/// Mortgage payment calculator with saved scenarios
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario database (overrides MORTGAGE_CALC_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate the monthly payment breakdown
    Calc {
        #[command(flatten)]
        loan: LoanArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the amortization schedule
    Schedule {
        #[command(flatten)]
        loan: LoanArgs,

        /// One line per year instead of per month
        #[arg(long)]
        yearly: bool,

        /// Write the monthly schedule to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Calculate and save a named scenario
    Save {
        name: String,

        #[command(flatten)]
        loan: LoanArgs,
    },
    /// Show a saved scenario by id or name
    Load {
        key: String,

        #[arg(long)]
        json: bool,
    },
    /// List saved scenarios
    List,
    /// Delete a saved scenario by id
    Delete { id: String },
    /// Show the audit trail of a scenario
    History { id: String },
    /// Interactive calculator (default)
    Ui,
}

#[derive(Args, Debug, Clone)]
struct LoanArgs {
    /// Purchase price
    #[arg(long)]
    price: f64,

    /// Down payment amount
    #[arg(long, conflicts_with = "down_percent", required_unless_present = "down_percent")]
    down: Option<f64>,

    /// Down payment as a percentage of price
    #[arg(long)]
    down_percent: Option<f64>,

    /// Annual interest rate in percent
    #[arg(long)]
    rate: f64,

    /// Loan term in years
    #[arg(long, default_value_t = 30)]
    term: u32,

    /// Annual property tax
    #[arg(long, default_value_t = 0.0)]
    tax: f64,

    /// Annual homeowner's insurance
    #[arg(long, default_value_t = 0.0)]
    insurance: f64,

    /// Annual HOA dues
    #[arg(long, default_value_t = 0.0)]
    hoa: f64,
}

impl LoanArgs {
    fn to_scenario(&self) -> LoanScenario {
        let base = match (self.down, self.down_percent) {
            (Some(down), _) => LoanScenario::new(self.price, down, self.rate, self.term),
            (None, Some(pct)) => {
                LoanScenario::with_down_payment_percent(self.price, pct, self.rate, self.term)
            }
            (None, None) => LoanScenario::new(self.price, 0.0, self.rate, self.term),
        };
        base.with_escrow(self.tax, self.insurance, self.hoa)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().with_database_path(cli.db.clone());
    let command = cli.command.unwrap_or(Command::Ui);

    // Log lines on stderr would tear the full-screen UI
    if !matches!(command, Command::Ui) {
        init_tracing(&config.log_filter);
    }

    match command {
        Command::Calc { loan, json } => run_calc(&loan.to_scenario(), json),
        Command::Schedule { loan, yearly, csv } => run_schedule(&loan.to_scenario(), yearly, csv),
        Command::Save { name, loan } => {
            run_save(&config.open_database()?, &name, loan.to_scenario())
        }
        Command::Load { key, json } => run_load(&config.open_database()?, &key, json),
        Command::List => run_list(&config.open_database()?),
        Command::Delete { id } => run_delete(&config.open_database()?, &id),
        Command::History { id } => run_history(&config.open_database()?, &id),
        Command::Ui => run_ui_mode(&config),
    }
}

fn print_breakdown(inputs: &LoanScenario, result: &PaymentBreakdown) {
    println!("  Price:              {:>14.2}", inputs.price);
    println!(
        "  Down payment:       {:>14.2}  ({:.1}%)",
        inputs.down_payment,
        inputs.down_payment_percent()
    );
    println!("  Principal:          {:>14.2}", result.principal);
    println!(
        "  Rate / term:        {:>13}%  {} years",
        inputs.annual_rate_percent, inputs.term_years
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Principal+interest: {:>14.2}", result.monthly_principal_and_interest);
    println!("  Property tax:       {:>14.2}", result.monthly_taxes);
    println!("  Insurance:          {:>14.2}", result.monthly_insurance);
    println!("  HOA:                {:>14.2}", result.monthly_hoa);
    println!("  Monthly payment:    {:>14.2}", result.monthly_payment);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Total of payments:  {:>14.2}", result.total_payment);
    println!("  Total interest:     {:>14.2}", result.total_interest);
}

fn run_calc(inputs: &LoanScenario, json: bool) -> Result<()> {
    let result = calculate(inputs)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_breakdown(inputs, &result);
    }

    Ok(())
}

fn run_schedule(inputs: &LoanScenario, yearly: bool, csv: Option<PathBuf>) -> Result<()> {
    let schedule = build_schedule(inputs)?;

    if let Some(path) = csv {
        schedule.export_csv(&path)?;
        println!("✓ Wrote {} payments to {:?}", schedule.len(), path);
        return Ok(());
    }

    if yearly {
        println!("{:>4}  {:>14}  {:>14}  {:>14}", "Year", "Principal", "Interest", "Balance");
        for year in schedule.yearly_summary() {
            println!(
                "{:>4}  {:>14.2}  {:>14.2}  {:>14.2}",
                year.year, year.principal_paid, year.interest_paid, year.ending_balance
            );
        }
    } else {
        println!(
            "{:>5}  {:>12}  {:>12}  {:>12}  {:>14}",
            "#", "Payment", "Principal", "Interest", "Balance"
        );
        for row in &schedule.rows {
            println!(
                "{:>5}  {:>12.2}  {:>12.2}  {:>12.2}  {:>14.2}",
                row.number,
                row.payment,
                row.principal_paid,
                row.interest_paid,
                row.remaining_balance
            );
        }
    }

    Ok(())
}

fn run_save(conn: &Connection, name: &str, inputs: LoanScenario) -> Result<()> {
    let snapshot = SavedScenario::new(name, inputs)?;

    let twins = find_scenarios_by_fingerprint(conn, &snapshot.fingerprint())?;

    match save_scenario(conn, &snapshot)? {
        SaveOutcome::Saved => {
            println!("✓ Saved {}", snapshot.summary());
            println!("  id: {}", snapshot.id);
            for twin in twins {
                println!("  note: same inputs as \"{}\" ({})", twin.name, twin.id);
            }
            Ok(())
        }
        SaveOutcome::NameTaken => bail!("a scenario named \"{}\" already exists", snapshot.name),
    }
}

fn find_by_key(conn: &Connection, key: &str) -> Result<Option<SavedScenario>> {
    match load_scenario(conn, key)? {
        Some(found) => Ok(Some(found)),
        None => find_scenario_by_name(conn, key),
    }
}

fn run_load(conn: &Connection, key: &str, json: bool) -> Result<()> {
    let Some(snapshot) = find_by_key(conn, key)? else {
        bail!("no scenario with id or name \"{}\"", key);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("📄 {} (saved {})", snapshot.name, snapshot.created_at.format("%Y-%m-%d %H:%M"));
        println!("   id: {}\n", snapshot.id);
        print_breakdown(&snapshot.inputs, &snapshot.outputs);
    }

    Ok(())
}

fn run_list(conn: &Connection) -> Result<()> {
    let scenarios = list_scenarios(conn)?;

    if scenarios.is_empty() {
        println!("No saved scenarios.");
        return Ok(());
    }

    for snapshot in &scenarios {
        println!("{}  {}", snapshot.id, snapshot.summary());
    }
    println!("\n{} scenario(s)", scenarios.len());

    Ok(())
}

fn run_delete(conn: &Connection, id: &str) -> Result<()> {
    if delete_scenario(conn, id)? {
        println!("✓ Deleted {}", id);
        Ok(())
    } else {
        bail!("no scenario with id \"{}\"", id)
    }
}

fn run_history(conn: &Connection, id: &str) -> Result<()> {
    let events = get_events_for_entity(conn, "scenario", id)?;

    if events.is_empty() {
        println!("No events for {}", id);
    }
    for event in events {
        println!(
            "{}  {:<18} by {}  {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.actor,
            event.data
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let conn = config.open_database()?;
    let saved = list_scenarios(&conn)?;

    let mut app = ui::App::new(saved);
    ui::run_ui(&mut app, &conn)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: mortgage-calc calc --help");
    std::process::exit(1);
}
