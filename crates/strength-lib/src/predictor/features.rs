//! Feature derivation for ML inference
//!
//! Turns a raw mix design into the 11-column feature vector the regression
//! model was trained on: the eight raw inputs plus water/cement ratio, total
//! binder and log-transformed curing age.

use crate::models::{FeatureVector, MixDesign};

/// Derives engineered features from raw mix inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDeriver;

impl FeatureDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Derive the full feature vector for one mix.
    ///
    /// Total for every input: a zero-cement mix yields a water/cement ratio
    /// of 0 instead of failing, so batch rows that never passed validation
    /// still produce a finite feature vector.
    pub fn derive(&self, mix: &MixDesign) -> FeatureVector {
        let age = mix.age as f64;
        FeatureVector {
            cement: mix.cement,
            slag: mix.slag,
            fly_ash: mix.fly_ash,
            water: mix.water,
            superplasticizer: mix.superplasticizer,
            coarse_aggregate: mix.coarse_aggregate,
            fine_aggregate: mix.fine_aggregate,
            age,
            water_cement_ratio: mix.water_cement_ratio(),
            total_binder: total_binder(mix),
            log_age: log_age(age),
        }
    }

    pub fn derive_all(&self, mixes: &[MixDesign]) -> Vec<FeatureVector> {
        mixes.iter().map(|m| self.derive(m)).collect()
    }
}

/// Natural log of (1 + age); `1 + age` is exact for whole-day ages
fn log_age(age: f64) -> f64 {
    (1.0 + age).ln()
}

/// Total cementitious material
fn total_binder(mix: &MixDesign) -> f64 {
    mix.cement + mix.slag + mix.fly_ash
}
