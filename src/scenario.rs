// 💾 Saved Scenario - named, immutable snapshot of inputs + outputs
//
// Identity is the UUID. The name is a user-facing label (unique in the store).
// Outputs are stored next to inputs, so loading never recomputes.

use crate::calculator::{calculate, CalculatorError, LoanScenario, PaymentBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedScenario {
    /// Stable identity (UUID) - never changes
    pub id: String,

    pub name: String,
    pub inputs: LoanScenario,
    pub outputs: PaymentBreakdown,
    pub created_at: DateTime<Utc>,
}

impl SavedScenario {
    /// Snapshot a scenario under `name`, computing its outputs now
    pub fn new(name: &str, inputs: LoanScenario) -> Result<Self, CalculatorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CalculatorError::InvalidInput {
                field: "name",
                reason: "scenario name must not be empty".to_string(),
            });
        }

        let inputs = inputs.normalized();
        let outputs = calculate(&inputs)?;

        Ok(SavedScenario {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            inputs,
            outputs,
            created_at: Utc::now(),
        })
    }

    /// Get identity (stable UUID)
    pub fn identity(&self) -> &str {
        &self.id
    }

    /// Fingerprint of the inputs only.
    /// Two snapshots with the same loan terms share a fingerprint regardless of name.
    pub fn fingerprint(&self) -> String {
        input_fingerprint(&self.inputs)
    }

    /// One-line description for listings
    pub fn summary(&self) -> String {
        format!(
            "{}: ${:.2}/mo on ${:.0} at {}% for {}y",
            self.name,
            self.outputs.monthly_payment,
            self.outputs.principal,
            self.inputs.annual_rate_percent,
            self.inputs.term_years
        )
    }
}

/// SHA-256 over the exact bit patterns of every input field
pub fn input_fingerprint(inputs: &LoanScenario) -> String {
    let mut hasher = Sha256::new();
    hasher.update(inputs.price.to_bits().to_le_bytes());
    hasher.update(inputs.down_payment.to_bits().to_le_bytes());
    hasher.update(inputs.annual_rate_percent.to_bits().to_le_bytes());
    hasher.update(inputs.term_years.to_le_bytes());
    hasher.update(inputs.annual_property_tax.to_bits().to_le_bytes());
    hasher.update(inputs.annual_insurance.to_bits().to_le_bytes());
    hasher.update(inputs.annual_hoa.to_bits().to_le_bytes());
    format!("{:x}", hasher.finalize())
}
