//! Single mix prediction

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use strength_lib::{InferenceEngine, MixDesign, StrengthError};

use crate::output::{
    color_grade, format_mass, format_mpa, format_ratio, print_error, print_json, OutputFormat,
};

/// Mix design inputs in kg/m³; omitted materials count as zero
#[derive(Debug, Clone, Default, Args)]
pub struct MixArgs {
    /// Use the reference example mix instead of the flags below
    #[arg(long)]
    pub example: bool,

    /// Cement (kg/m³)
    #[arg(long)]
    pub cement: Option<f64>,

    /// Blast furnace slag (kg/m³)
    #[arg(long)]
    pub slag: Option<f64>,

    /// Fly ash (kg/m³)
    #[arg(long)]
    pub fly_ash: Option<f64>,

    /// Water (kg/m³)
    #[arg(long)]
    pub water: Option<f64>,

    /// Superplasticizer (kg/m³)
    #[arg(long)]
    pub superplasticizer: Option<f64>,

    /// Coarse aggregate (kg/m³)
    #[arg(long)]
    pub coarse_aggregate: Option<f64>,

    /// Fine aggregate (kg/m³)
    #[arg(long)]
    pub fine_aggregate: Option<f64>,

    /// Curing age in days
    #[arg(long, default_value_t = 28)]
    pub age: u32,
}

impl MixArgs {
    pub fn to_mix(&self) -> MixDesign {
        if self.example {
            return MixDesign::example();
        }
        MixDesign {
            cement: self.cement.unwrap_or(0.0),
            slag: self.slag.unwrap_or(0.0),
            fly_ash: self.fly_ash.unwrap_or(0.0),
            water: self.water.unwrap_or(0.0),
            superplasticizer: self.superplasticizer.unwrap_or(0.0),
            coarse_aggregate: self.coarse_aggregate.unwrap_or(0.0),
            fine_aggregate: self.fine_aggregate.unwrap_or(0.0),
            age: self.age,
        }
    }
}

/// Validate, predict and print one mix
pub fn run(engine: &InferenceEngine, args: &MixArgs, format: OutputFormat) -> Result<()> {
    let mix = args.to_mix();

    let assessment = match engine.assess(&mix) {
        Ok(a) => a,
        Err(StrengthError::Validation(errors)) => {
            for message in errors.messages() {
                print_error(&message);
            }
            anyhow::bail!("Mix design rejected ({} problem(s))", errors.len());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&assessment)?,
        OutputFormat::Table => {
            let grade = &assessment.grade;
            println!("{}", "Strength Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Predicted strength:  {}",
                format_mpa(assessment.prediction).bold()
            );
            println!(
                "Grade:               {} ({})",
                color_grade(grade.code, grade.severity),
                grade.label
            );
            println!("Typical usage:       {}", grade.usage);
            println!(
                "W/C ratio:           {}",
                format_ratio(assessment.water_cement_ratio)
            );
            println!(
                "Total material:      {}",
                format_mass(assessment.total_material)
            );
            println!("Age:                 {} days", mix.age);
        }
    }

    Ok(())
}
