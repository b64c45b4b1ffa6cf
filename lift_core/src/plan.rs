//! Plan files and structural validation.
//!
//! Plans are authored as TOML (or JSON) documents:
//!
//! ```toml
//! id = "upper_lower"
//! name = "Upper / Lower"
//! duration_weeks = 6
//!
//! [[days]]
//! id = "upper"
//! name = "Upper"
//! day_offset = 0
//!
//! [[days.exercises]]
//! exercise_id = "bench"
//! name = "Bench Press"
//! sets = 3
//! reps = 8
//! weight = 100.0
//! rest_seconds = 120
//! weight_increment = 5.0
//! ```

use crate::progression::validate_base;
use crate::{Error, Plan, PlanLayout, Result};
use std::collections::HashSet;
use std::path::Path;

/// Load a plan from a `.toml` or `.json` file
pub fn load_plan(path: &Path) -> Result<Plan> {
    let contents = std::fs::read_to_string(path)?;
    let plan: Plan = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        _ => toml::from_str(&contents)?,
    };
    tracing::info!("Loaded plan '{}' from {:?}", plan.id, path);
    Ok(plan)
}

impl Plan {
    /// Validate the plan, returning a list of problems (empty when valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("Plan id must not be empty".to_string());
        }
        if self.duration_weeks == 0 {
            errors.push(format!("Plan '{}': duration must be at least 1 week", self.id));
        }
        for week in &self.deload_weeks {
            if *week == 0 || *week > self.duration_weeks {
                errors.push(format!(
                    "Plan '{}': deload week {} is outside 1..={}",
                    self.id, week, self.duration_weeks
                ));
            }
        }

        errors.extend(validate_layout(&self.layout()));
        errors
    }

    /// Fail with a single validation error listing every problem
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }
}

/// Structural checks on a day/exercise layout
///
/// Empty days are allowed here; whether a layout can be trained is checked
/// separately by [`require_trainable`].
pub fn validate_layout(layout: &PlanLayout) -> Vec<String> {
    let mut errors = Vec::new();
    let mut day_ids = HashSet::new();

    for day in &layout.days {
        if !day_ids.insert(day.id.as_str()) {
            errors.push(format!("Duplicate day id '{}'", day.id));
        }
        if day.day_offset > 6 {
            errors.push(format!(
                "Day '{}': day_offset {} must be between 0 and 6",
                day.id, day.day_offset
            ));
        }

        let mut exercise_ids = HashSet::new();
        for exercise in &day.exercises {
            if !exercise_ids.insert(exercise.exercise_id.as_str()) {
                errors.push(format!(
                    "Day '{}': exercise '{}' listed more than once",
                    day.id, exercise.exercise_id
                ));
            }
            if let Err(e) = validate_base(&exercise.base()) {
                errors.push(format!(
                    "Day '{}', exercise '{}': {}",
                    day.id,
                    exercise.exercise_id,
                    e.message()
                ));
            }
        }
    }

    errors
}

/// A layout can drive a mesocycle only if it has days and every day has exercises
pub fn require_trainable(layout: &PlanLayout) -> Result<()> {
    if layout.days.is_empty() {
        return Err(Error::Validation("Plan has no days".into()));
    }
    if let Some(day) = layout.days.iter().find(|d| d.exercises.is_empty()) {
        return Err(Error::Validation(format!(
            "Plan day '{}' has no exercises",
            day.id
        )));
    }
    Ok(())
}
