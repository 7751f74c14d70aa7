//! Range checks applied to raw mix designs before inference
//!
//! Thresholds are looser than the physical ranges quoted in the messages:
//! only implausible near-zero values are flagged, which catches unit
//! confusion (litres instead of kg/m³) without rejecting edge-case mixes.

use crate::error::{StrengthError, ValidationErrors};
use crate::models::MixDesign;
use std::fmt;

/// Lower bound below which a non-zero cement mass is rejected
pub const MIN_CEMENT: f64 = 100.0;
/// Lower bound below which a non-zero water mass is rejected
pub const MIN_WATER: f64 = 100.0;
/// Lower bound below which a non-zero coarse aggregate mass is rejected
pub const MIN_COARSE_AGGREGATE: f64 = 500.0;
/// Lower bound below which a non-zero fine aggregate mass is rejected
pub const MIN_FINE_AGGREGATE: f64 = 500.0;

/// A single failed range check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    RequiredFieldsMissing,
    CementTooLow,
    WaterTooLow,
    CoarseAggregateTooLow,
    FineAggregateTooLow,
}

impl Violation {
    pub fn code(&self) -> &'static str {
        match self {
            Violation::RequiredFieldsMissing => "required_fields_missing",
            Violation::CementTooLow => "cement_too_low",
            Violation::WaterTooLow => "water_too_low",
            Violation::CoarseAggregateTooLow => "coarse_aggregate_too_low",
            Violation::FineAggregateTooLow => "fine_aggregate_too_low",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Violation::RequiredFieldsMissing => {
                "Cement, Water, Coarse Aggregate, and Fine Aggregate are required."
            }
            Violation::CementTooLow => "Cement too low - expected 100-540 kg/m³.",
            Violation::WaterTooLow => "Water too low - expected 120-250 kg/m³.",
            Violation::CoarseAggregateTooLow => {
                "Coarse Aggregate too low - expected 800-1150 kg/m³."
            }
            Violation::FineAggregateTooLow => "Fine Aggregate too low - expected 600-1000 kg/m³.",
        };
        f.write_str(message)
    }
}

/// Collect every violation for a mix; all rules run independently
pub fn check(mix: &MixDesign) -> Vec<Violation> {
    let mut violations = Vec::new();

    if mix.cement == 0.0
        || mix.water == 0.0
        || mix.coarse_aggregate == 0.0
        || mix.fine_aggregate == 0.0
    {
        violations.push(Violation::RequiredFieldsMissing);
    }
    if is_implausibly_low(mix.cement, MIN_CEMENT) {
        violations.push(Violation::CementTooLow);
    }
    if is_implausibly_low(mix.water, MIN_WATER) {
        violations.push(Violation::WaterTooLow);
    }
    if is_implausibly_low(mix.coarse_aggregate, MIN_COARSE_AGGREGATE) {
        violations.push(Violation::CoarseAggregateTooLow);
    }
    if is_implausibly_low(mix.fine_aggregate, MIN_FINE_AGGREGATE) {
        violations.push(Violation::FineAggregateTooLow);
    }

    violations
}

/// Validate a mix, returning all violations as one error
pub fn validate(mix: &MixDesign) -> Result<(), StrengthError> {
    let violations = check(mix);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(StrengthError::Validation(ValidationErrors::new(violations)))
    }
}

fn is_implausibly_low(value: f64, minimum: f64) -> bool {
    value > 0.0 && value < minimum
}
