//! Grade classification of predicted strength
//!
//! Maps a compressive strength in MPa to one of four grade tiers. Each tier
//! covers `[lower, next lower)`; the top tier is open-ended.

use crate::models::{GradeResult, Severity};

/// Grade tiers with their inclusive lower bound in MPa, lowest first
pub const GRADE_TABLE: [(f64, GradeResult); 4] = [
    (
        f64::NEG_INFINITY,
        GradeResult {
            code: "K-175",
            label: "Low Strength",
            usage: "Non-structural works",
            severity: Severity::Low,
        },
    ),
    (
        20.0,
        GradeResult {
            code: "K-250",
            label: "Medium Strength",
            usage: "Light structural elements",
            severity: Severity::Medium,
        },
    ),
    (
        30.0,
        GradeResult {
            code: "K-300",
            label: "High Strength",
            usage: "Standard building structures",
            severity: Severity::High,
        },
    ),
    (
        40.0,
        GradeResult {
            code: "K-400+",
            label: "Very High Strength",
            usage: "Special / heavy structures",
            severity: Severity::Ultra,
        },
    ),
];

/// Classifies strength values into grades
#[derive(Debug, Clone, Copy, Default)]
pub struct GradeClassifier;

impl GradeClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, strength_mpa: f64) -> GradeResult {
        GRADE_TABLE
            .iter()
            .rev()
            .find(|(lower, _)| strength_mpa >= *lower)
            .map(|(_, grade)| *grade)
            .unwrap_or(GRADE_TABLE[0].1)
    }

    /// All grades in tier order, lowest first
    pub fn grades(&self) -> impl Iterator<Item = GradeResult> {
        GRADE_TABLE.iter().map(|(_, grade)| *grade)
    }
}
