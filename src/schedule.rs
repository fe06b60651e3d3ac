// 📅 Amortization Schedule - month-by-month principal/interest split
//
// Expands a validated LoanScenario into one row per scheduled payment,
// plus a per-year rollup and CSV export.

use crate::calculator::{calculate, CalculatorError, LoanScenario, PaymentBreakdown};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

// ============================================================================
// ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    /// 1-based payment number
    pub number: u32,

    /// 1-based loan year this payment falls in
    pub year: u32,

    /// Principal + interest paid this month (escrow excluded)
    pub payment: f64,

    pub principal_paid: f64,
    pub interest_paid: f64,
    pub remaining_balance: f64,
    pub cumulative_interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: u32,
    pub principal_paid: f64,
    pub interest_paid: f64,
    pub ending_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub breakdown: PaymentBreakdown,
    pub rows: Vec<PaymentRow>,
}

// ============================================================================
// BUILDING
// ============================================================================

/// Build the full payment schedule for a scenario.
///
/// The last payment retires whatever balance is left so the schedule always
/// ends at exactly zero.
pub fn build_schedule(scenario: &LoanScenario) -> Result<AmortizationSchedule, CalculatorError> {
    let breakdown = calculate(scenario)?;

    let monthly_rate = scenario.monthly_rate();
    let num_payments = scenario.num_payments();
    let monthly_pi = breakdown.monthly_principal_and_interest;

    let mut rows = Vec::with_capacity(num_payments as usize);
    let mut balance = breakdown.principal;
    let mut cumulative_interest = 0.0;

    for number in 1..=num_payments {
        let interest_paid = balance * monthly_rate;
        let principal_paid = if number == num_payments {
            balance
        } else {
            monthly_pi - interest_paid
        };

        balance -= principal_paid;
        if number == num_payments {
            balance = 0.0;
        }
        cumulative_interest += interest_paid;

        rows.push(PaymentRow {
            number,
            year: (number - 1) / 12 + 1,
            payment: principal_paid + interest_paid,
            principal_paid,
            interest_paid,
            remaining_balance: balance,
            cumulative_interest,
        });
    }

    Ok(AmortizationSchedule { breakdown, rows })
}

impl AmortizationSchedule {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_interest_paid(&self) -> f64 {
        self.rows.iter().map(|r| r.interest_paid).sum()
    }

    pub fn total_principal_paid(&self) -> f64 {
        self.rows.iter().map(|r| r.principal_paid).sum()
    }

    /// Roll monthly rows up into one summary per loan year
    pub fn yearly_summary(&self) -> Vec<YearSummary> {
        let mut summaries: Vec<YearSummary> = Vec::new();

        for row in &self.rows {
            match summaries.last_mut() {
                Some(current) if current.year == row.year => {
                    current.principal_paid += row.principal_paid;
                    current.interest_paid += row.interest_paid;
                    current.ending_balance = row.remaining_balance;
                }
                _ => summaries.push(YearSummary {
                    year: row.year,
                    principal_paid: row.principal_paid,
                    interest_paid: row.interest_paid,
                    ending_balance: row.remaining_balance,
                }),
            }
        }

        summaries
    }

    /// Write every payment row as CSV (header included)
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row).context("Failed to write schedule row")?;
        }
        wtr.flush().context("Failed to flush schedule CSV")?;
        Ok(())
    }

    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
        self.write_csv(file)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoanScenario {
        LoanScenario::new(500_000.0, 100_000.0, 6.5, 30)
    }

    #[test]
    fn test_schedule_length_and_years() {
        let schedule = build_schedule(&sample()).unwrap();
        assert_eq!(schedule.len(), 360);
        assert_eq!(schedule.rows[0].year, 1);
        assert_eq!(schedule.rows[11].year, 1);
        assert_eq!(schedule.rows[12].year, 2);
        assert_eq!(schedule.rows[359].year, 30);
    }

    #[test]
    fn test_schedule_ends_at_zero() {
        let schedule = build_schedule(&sample()).unwrap();
        let last = schedule.rows.last().unwrap();
        assert_eq!(last.remaining_balance, 0.0);
        assert!((last.payment - schedule.breakdown.monthly_principal_and_interest).abs() < 0.01);
    }

    #[test]
    fn test_schedule_sums_match_breakdown() {
        let schedule = build_schedule(&sample()).unwrap();

        assert!((schedule.total_principal_paid() - 400_000.0).abs() < 1e-4);
        assert!((schedule.total_interest_paid() - schedule.breakdown.total_interest).abs() < 0.01);
    }

    #[test]
    fn test_first_payment_split() {
        let schedule = build_schedule(&sample()).unwrap();
        let first = &schedule.rows[0];

        // 400,000 × 6.5% / 12
        assert!((first.interest_paid - 2166.67).abs() < 0.01);
        assert!((first.principal_paid - (2528.27 - 2166.67)).abs() < 0.01);
        assert!(first.remaining_balance < 400_000.0);
    }

    #[test]
    fn test_interest_share_declines() {
        let schedule = build_schedule(&sample()).unwrap();
        assert!(schedule.rows[0].interest_paid > schedule.rows[100].interest_paid);
        assert!(schedule.rows[100].interest_paid > schedule.rows[300].interest_paid);
    }

    #[test]
    fn test_zero_rate_schedule() {
        let schedule = build_schedule(&LoanScenario::new(360_000.0, 60_000.0, 0.0, 30)).unwrap();
        assert!(schedule.rows.iter().all(|r| r.interest_paid == 0.0));
        assert_eq!(schedule.total_interest_paid(), 0.0);
        assert!((schedule.rows[0].principal_paid - 833.333333).abs() < 1e-4);
    }

    #[test]
    fn test_yearly_summary() {
        let schedule = build_schedule(&LoanScenario::new(200_000.0, 0.0, 5.0, 15)).unwrap();
        let years = schedule.yearly_summary();

        assert_eq!(years.len(), 15);
        assert_eq!(years[0].year, 1);
        assert_eq!(years[14].ending_balance, 0.0);
        assert!(years[0].interest_paid > years[14].interest_paid);

        let interest: f64 = years.iter().map(|y| y.interest_paid).sum();
        assert!((interest - schedule.total_interest_paid()).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_scenario_has_no_schedule() {
        let err = build_schedule(&LoanScenario::new(100.0, 0.0, 5.0, 0)).unwrap_err();
        assert!(matches!(err, CalculatorError::InvalidInput { .. }));
    }

    #[test]
    fn test_term_beyond_limit_has_no_schedule() {
        let err = build_schedule(&LoanScenario::new(300_000.0, 0.0, 0.0, 300_000_000)).unwrap_err();
        assert!(matches!(err, CalculatorError::InvalidInput { field: "termYears", .. }));

        let longest = build_schedule(&LoanScenario::new(300_000.0, 0.0, 0.0, 100)).unwrap();
        assert_eq!(longest.len(), 1200);
        assert_eq!(longest.rows.last().unwrap().remaining_balance, 0.0);
    }

    #[test]
    fn test_write_csv() {
        let schedule = build_schedule(&LoanScenario::new(120_000.0, 0.0, 3.0, 1)).unwrap();
        let mut buf = Vec::new();
        schedule.write_csv(&mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("number,year,payment,principalPaid"));
        assert!(lines[1].starts_with("1,1,"));
    }

    #[test]
    fn test_export_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.csv");

        let schedule = build_schedule(&LoanScenario::new(120_000.0, 0.0, 3.0, 2)).unwrap();
        schedule.export_csv(&path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<PaymentRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 24);
        assert_eq!(rows[23].remaining_balance, 0.0);
    }
}
