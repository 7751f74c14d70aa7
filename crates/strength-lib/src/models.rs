//! Core data models for the strength predictor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of columns the regression model consumes
pub const NUM_FEATURES: usize = 11;

/// Number of raw mix-design inputs
pub const NUM_RAW_FEATURES: usize = 8;

/// One concrete mix design, material masses in kg/m³
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixDesign {
    pub cement: f64,
    #[serde(default)]
    pub slag: f64,
    #[serde(default)]
    pub fly_ash: f64,
    pub water: f64,
    #[serde(default)]
    pub superplasticizer: f64,
    pub coarse_aggregate: f64,
    pub fine_aggregate: f64,
    /// Curing age in days
    pub age: u32,
}

impl MixDesign {
    /// Reference high-strength mix used by the "load example" action
    pub fn example() -> Self {
        Self {
            cement: 540.0,
            slag: 0.0,
            fly_ash: 0.0,
            water: 162.0,
            superplasticizer: 2.5,
            coarse_aggregate: 1040.0,
            fine_aggregate: 676.0,
            age: 28,
        }
    }

    /// Water-to-cement mass ratio, 0 when no cement is present
    pub fn water_cement_ratio(&self) -> f64 {
        if self.cement > 0.0 {
            self.water / self.cement
        } else {
            0.0
        }
    }

    /// Sum of all material masses (age excluded)
    pub fn total_material(&self) -> f64 {
        self.cement
            + self.slag
            + self.fly_ash
            + self.water
            + self.superplasticizer
            + self.coarse_aggregate
            + self.fine_aggregate
    }
}

/// Identity of one model input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Cement,
    Slag,
    FlyAsh,
    Water,
    Superplasticizer,
    CoarseAggregate,
    FineAggregate,
    Age,
    WaterCementRatio,
    TotalBinder,
    LogAge,
}

impl Feature {
    /// Default column order: raw inputs, then engineered features
    pub const ALL: [Feature; NUM_FEATURES] = [
        Feature::Cement,
        Feature::Slag,
        Feature::FlyAsh,
        Feature::Water,
        Feature::Superplasticizer,
        Feature::CoarseAggregate,
        Feature::FineAggregate,
        Feature::Age,
        Feature::WaterCementRatio,
        Feature::TotalBinder,
        Feature::LogAge,
    ];

    /// Plain English column name
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Cement => "Cement",
            Feature::Slag => "Blast Furnace Slag",
            Feature::FlyAsh => "Fly Ash",
            Feature::Water => "Water",
            Feature::Superplasticizer => "Superplasticizer",
            Feature::CoarseAggregate => "Coarse Aggregate",
            Feature::FineAggregate => "Fine Aggregate",
            Feature::Age => "Age",
            Feature::WaterCementRatio => "W/C Ratio",
            Feature::TotalBinder => "Total Binder",
            Feature::LogAge => "Log Age",
        }
    }

    /// Column name used by artifacts trained on the localized dataset
    pub fn localized_name(&self) -> &'static str {
        match self {
            Feature::Cement => "Semen",
            Feature::Slag => "Slag_Tanur_Tinggi",
            Feature::FlyAsh => "Abu_Terbang",
            Feature::Water => "Air",
            Feature::Superplasticizer => "Superplasticizer",
            Feature::CoarseAggregate => "Agregat_Kasar",
            Feature::FineAggregate => "Agregat_Halus",
            Feature::Age => "Umur_Hari",
            Feature::WaterCementRatio => "Rasio_Air_Semen",
            Feature::TotalBinder => "Total_Bahan_Pengikat",
            Feature::LogAge => "Log_Umur_Hari",
        }
    }

    pub fn from_localized_name(name: &str) -> Option<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.localized_name() == name)
    }

    pub fn is_engineered(&self) -> bool {
        matches!(
            self,
            Feature::WaterCementRatio | Feature::TotalBinder | Feature::LogAge
        )
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw inputs plus engineered features for one mix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub cement: f64,
    pub slag: f64,
    pub fly_ash: f64,
    pub water: f64,
    pub superplasticizer: f64,
    pub coarse_aggregate: f64,
    pub fine_aggregate: f64,
    pub age: f64,
    pub water_cement_ratio: f64,
    pub total_binder: f64,
    pub log_age: f64,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Cement => self.cement,
            Feature::Slag => self.slag,
            Feature::FlyAsh => self.fly_ash,
            Feature::Water => self.water,
            Feature::Superplasticizer => self.superplasticizer,
            Feature::CoarseAggregate => self.coarse_aggregate,
            Feature::FineAggregate => self.fine_aggregate,
            Feature::Age => self.age,
            Feature::WaterCementRatio => self.water_cement_ratio,
            Feature::TotalBinder => self.total_binder,
            Feature::LogAge => self.log_age,
        }
    }

    /// Values laid out in the given column order
    pub fn ordered(&self, order: &[Feature]) -> Vec<f64> {
        order.iter().map(|f| self.get(*f)).collect()
    }
}

/// Severity tier attached to a grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Ultra,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Ultra => "ultra",
        }
    }
}

/// Discrete strength classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeResult {
    pub code: &'static str,
    pub label: &'static str,
    pub usage: &'static str,
    pub severity: Severity,
}

/// History entry created on every successful single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub mix: MixDesign,
    pub prediction: f64,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(mix: MixDesign, prediction: f64) -> Self {
        Self {
            mix,
            prediction,
            timestamp: Utc::now(),
        }
    }
}
