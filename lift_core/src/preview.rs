//! Read-only forecast of next week's targets for the active mesocycle.

use crate::config::ProgressionConfig;
use crate::generator::slot_targets;
use crate::progression::{calculate_week_targets, ProgressionInput};
use crate::{Database, Error, MesocycleStatus, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Forecast for one exercise slot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewExercise {
    pub day_id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    pub target_weight: f64,
    pub target_reps: u32,
    pub target_sets: u32,
    pub will_progress: bool,
    pub previous_week_completed: bool,
}

/// Forecast for the week after the mesocycle's current week
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextWeekPreview {
    pub mesocycle_id: Uuid,
    pub week_number: u32,
    pub is_deload: bool,
    pub exercises: Vec<PreviewExercise>,
}

/// Compute next week's targets from this week's completion, without writing anything
pub fn next_week_preview(
    db: &Database,
    mesocycle_id: Uuid,
    policy: &ProgressionConfig,
) -> Result<NextWeekPreview> {
    let meso = db.mesocycle(mesocycle_id)?;
    if meso.status != MesocycleStatus::Active {
        return Err(Error::NotFound(format!(
            "Mesocycle {} is {}, not active",
            meso.id, meso.status
        )));
    }

    let current = meso.current_week;
    if !meso.schedule.contains(current) {
        return Err(Error::NotFound(format!(
            "Mesocycle {} has no active week",
            meso.id
        )));
    }
    let next = current + 1;
    if !meso.schedule.contains(next) {
        return Err(Error::NotFound(format!(
            "Week {} is the final week of mesocycle {}",
            current, meso.id
        )));
    }
    let is_deload = meso.schedule.is_deload(next);

    let mut exercises = Vec::new();
    for day in &meso.layout.days {
        for exercise in &day.exercises {
            let weeks = slot_targets(
                db,
                meso.id,
                &meso.schedule,
                &day.id,
                exercise,
                current,
                policy,
            )?;
            let completion = db
                .slot_completion(meso.id, &day.id, &exercise.exercise_id, current)
                .unwrap_or_default();
            let base = exercise.base();
            let targets = calculate_week_targets(
                &ProgressionInput {
                    base: Some(&base),
                    week_number: next,
                    previous: weeks.last(),
                    previous_completion: Some(&completion),
                    is_deload,
                },
                policy,
            )?;

            exercises.push(PreviewExercise {
                day_id: day.id.clone(),
                exercise_id: exercise.exercise_id.clone(),
                exercise_name: exercise.name.clone(),
                target_weight: targets.target_weight,
                target_reps: targets.target_reps,
                target_sets: targets.target_sets,
                will_progress: completion.all_sets_completed,
                previous_week_completed: completion.all_sets_completed,
            });
        }
    }

    tracing::debug!(
        "Previewed week {} of mesocycle {} ({} exercises)",
        next,
        meso.id,
        exercises.len()
    );

    Ok(NextWeekPreview {
        mesocycle_id: meso.id,
        week_number: next,
        is_deload,
        exercises,
    })
}
