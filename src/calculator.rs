// 🏠 Amortization Calculator - fixed-rate mortgage payment breakdown
//
// Pure function: LoanScenario (inputs) → PaymentBreakdown (outputs).
// No hidden state, so identical inputs always give bit-identical outputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest loan term accepted, in years
pub const MAX_TERM_YEARS: u32 = 100;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculatorError {
    /// Input rejected before any arithmetic happens
    #[error("invalid input for `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Inputs were accepted but the arithmetic overflowed to NaN/Infinity
    #[error("calculation produced a non-finite `{field}`")]
    DegenerateResult { field: &'static str },
}

impl CalculatorError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CalculatorError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            CalculatorError::InvalidInput { field, .. } => *field,
            CalculatorError::DegenerateResult { field } => *field,
        }
    }
}

// ============================================================================
// INPUTS
// ============================================================================

/// Loan terms for one calculation.
///
/// Taxes, insurance and HOA dues are annual amounts and default to 0 when
/// absent from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanScenario {
    pub price: f64,
    pub down_payment: f64,
    pub annual_rate_percent: f64,
    pub term_years: u32,

    #[serde(default)]
    pub annual_property_tax: f64,

    #[serde(default)]
    pub annual_insurance: f64,

    #[serde(default, rename = "annualHOA")]
    pub annual_hoa: f64,
}

impl LoanScenario {
    /// Scenario with no taxes, insurance or HOA dues
    pub fn new(price: f64, down_payment: f64, annual_rate_percent: f64, term_years: u32) -> Self {
        LoanScenario {
            price,
            down_payment,
            annual_rate_percent,
            term_years,
            annual_property_tax: 0.0,
            annual_insurance: 0.0,
            annual_hoa: 0.0,
        }
    }

    /// Build a scenario where the down payment is given as a percentage of price
    pub fn with_down_payment_percent(
        price: f64,
        down_percent: f64,
        annual_rate_percent: f64,
        term_years: u32,
    ) -> Self {
        LoanScenario::new(price, price * down_percent / 100.0, annual_rate_percent, term_years)
    }

    pub fn with_escrow(
        mut self,
        annual_property_tax: f64,
        annual_insurance: f64,
        annual_hoa: f64,
    ) -> Self {
        self.annual_property_tax = annual_property_tax;
        self.annual_insurance = annual_insurance;
        self.annual_hoa = annual_hoa;
        self
    }

    /// Same scenario with every `-0.0` turned into `+0.0`.
    ///
    /// SQLite stores a signed zero as integer 0, so snapshots must only ever
    /// hold the positive zero to load back bit for bit.
    pub fn normalized(mut self) -> Self {
        for value in [
            &mut self.price,
            &mut self.down_payment,
            &mut self.annual_rate_percent,
            &mut self.annual_property_tax,
            &mut self.annual_insurance,
            &mut self.annual_hoa,
        ] {
            *value += 0.0;
        }
        self
    }

    /// Amount financed (may be negative for an unvalidated scenario)
    pub fn principal(&self) -> f64 {
        self.price - self.down_payment
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 100.0 / 12.0
    }

    pub fn num_payments(&self) -> u32 {
        self.term_years.saturating_mul(12)
    }

    /// Down payment as a percentage of price (0 when price is 0)
    pub fn down_payment_percent(&self) -> f64 {
        if self.price > 0.0 {
            self.down_payment / self.price * 100.0
        } else {
            0.0
        }
    }

    /// Loan-to-value ratio in [0, 1] for a valid scenario
    pub fn loan_to_value(&self) -> f64 {
        if self.price > 0.0 {
            self.principal() / self.price
        } else {
            0.0
        }
    }

    /// Reject inputs that would make the formula meaningless
    pub fn validate(&self) -> Result<(), CalculatorError> {
        let amounts = [
            ("price", self.price),
            ("downPayment", self.down_payment),
            ("annualRatePercent", self.annual_rate_percent),
            ("annualPropertyTax", self.annual_property_tax),
            ("annualInsurance", self.annual_insurance),
            ("annualHOA", self.annual_hoa),
        ];

        for (field, value) in amounts {
            if !value.is_finite() {
                return Err(CalculatorError::invalid(field, "must be a finite number"));
            }
            if value < 0.0 {
                let reason = format!("must not be negative (got {})", value);
                return Err(CalculatorError::invalid(field, reason));
            }
        }

        if self.term_years == 0 {
            return Err(CalculatorError::invalid("termYears", "must be at least 1 year"));
        }

        if self.term_years > MAX_TERM_YEARS {
            return Err(CalculatorError::invalid(
                "termYears",
                format!("must be at most {} years (got {})", MAX_TERM_YEARS, self.term_years),
            ));
        }

        if self.down_payment > self.price {
            return Err(CalculatorError::invalid(
                "downPayment",
                format!("exceeds purchase price ({} > {})", self.down_payment, self.price),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// OUTPUTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    pub principal: f64,
    pub monthly_principal_and_interest: f64,
    pub monthly_taxes: f64,
    pub monthly_insurance: f64,
    #[serde(rename = "monthlyHOA")]
    pub monthly_hoa: f64,
}

impl PaymentBreakdown {
    /// Taxes + insurance + HOA per month
    pub fn monthly_escrow(&self) -> f64 {
        self.monthly_taxes + self.monthly_insurance + self.monthly_hoa
    }

    fn check_finite(&self) -> Result<(), CalculatorError> {
        let fields = [
            ("monthlyPrincipalAndInterest", self.monthly_principal_and_interest),
            ("monthlyTaxes", self.monthly_taxes),
            ("monthlyInsurance", self.monthly_insurance),
            ("monthlyHOA", self.monthly_hoa),
            ("monthlyPayment", self.monthly_payment),
            ("totalPayment", self.total_payment),
            ("totalInterest", self.total_interest),
        ];

        match fields.iter().find(|(_, value)| !value.is_finite()) {
            Some((field, _)) => Err(CalculatorError::DegenerateResult { field: *field }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// CALCULATION
// ============================================================================

/// Monthly principal-and-interest for a fully amortizing fixed-rate loan.
///
/// Falls back to straight-line repayment when the rate is zero. `(1+r)^n - 1`
/// goes through `ln_1p`/`exp_m1` so tiny rates converge on `principal / n`.
pub fn monthly_principal_and_interest(
    principal: f64,
    monthly_rate: f64,
    num_payments: u32,
) -> f64 {
    let n = num_payments as f64;
    if monthly_rate > 0.0 {
        let growth_minus_one = (n * monthly_rate.ln_1p()).exp_m1();
        let growth = 1.0 + growth_minus_one;
        principal * (monthly_rate * growth) / growth_minus_one
    } else {
        principal / n
    }
}

/// Compute the payment breakdown for a loan scenario
pub fn calculate(scenario: &LoanScenario) -> Result<PaymentBreakdown, CalculatorError> {
    scenario.validate()?;
    let scenario = scenario.normalized();

    let principal = scenario.principal();
    let num_payments = scenario.num_payments();
    let n = num_payments as f64;

    let monthly_pi =
        monthly_principal_and_interest(principal, scenario.monthly_rate(), num_payments);
    let monthly_taxes = scenario.annual_property_tax / 12.0;
    let monthly_insurance = scenario.annual_insurance / 12.0;
    let monthly_hoa = scenario.annual_hoa / 12.0;

    let monthly_payment = monthly_pi + monthly_taxes + monthly_insurance + monthly_hoa;

    let breakdown = PaymentBreakdown {
        monthly_payment,
        total_payment: monthly_payment * n,
        total_interest: monthly_pi * n - principal,
        principal,
        monthly_principal_and_interest: monthly_pi,
        monthly_taxes,
        monthly_insurance,
        monthly_hoa,
    };

    breakdown.check_finite()?;

    tracing::debug!(
        principal,
        term_years = scenario.term_years,
        monthly_payment,
        "calculated payment breakdown"
    );

    Ok(breakdown)
}

// ============================================================================
// TESTS
// ============================================================================
