//! Workout generation: expanding weekly targets into scheduled workouts.
//!
//! One [`Workout`] per plan day per week, one [`WorkoutSet`] per prescribed
//! set. Generation is idempotent per (mesocycle, plan day, week): a pending
//! workout is replaced, an in-progress or completed one is left alone.

use crate::config::ProgressionConfig;
use crate::progression::{project_weeks, ObservedWeek};
use crate::types::scheduled_date;
use crate::{
    Database, DeloadSchedule, Error, PlanDay, PlanDayExercise, PlanLayout, Result, WeekTargets,
    Workout, WorkoutSet, WorkoutStatus,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// What to generate
#[derive(Clone, Debug)]
pub struct GenerationRequest<'a> {
    pub mesocycle_id: Uuid,
    pub start_date: NaiveDate,
    pub layout: &'a PlanLayout,
    pub schedule: &'a DeloadSchedule,
    pub weeks: RangeInclusive<u32>,
    /// Restrict generation to one plan day
    pub only_day: Option<&'a str>,
    /// Skip workouts scheduled before this date
    pub not_before: Option<NaiveDate>,
    pub policy: &'a ProgressionConfig,
}

/// Outcome of one generation call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub created: usize,
    pub replaced: usize,
    pub preserved: usize,
    pub sets_created: usize,
}

/// Projected targets for one exercise slot, weeks 1..=through_week
///
/// Completion of earlier weeks is read from the workouts already in `db`, and
/// weeks with a locked workout keep the targets that workout was trained at.
pub fn slot_targets(
    db: &Database,
    mesocycle_id: Uuid,
    schedule: &DeloadSchedule,
    day_id: &str,
    exercise: &PlanDayExercise,
    through_week: u32,
    policy: &ProgressionConfig,
) -> Result<Vec<WeekTargets>> {
    project_weeks(&exercise.base(), schedule, through_week, policy, |week| {
        db.observed_slot(mesocycle_id, day_id, &exercise.exercise_id, week)
    })
}

/// Like [`slot_targets`], but chained from the exercise's current base
///
/// Only completion is taken from history, so a changed base configuration
/// flows into every week that is still regenerable.
pub fn rebased_slot_targets(
    db: &Database,
    mesocycle_id: Uuid,
    schedule: &DeloadSchedule,
    day_id: &str,
    exercise: &PlanDayExercise,
    through_week: u32,
    policy: &ProgressionConfig,
) -> Result<Vec<WeekTargets>> {
    project_weeks(&exercise.base(), schedule, through_week, policy, |week| {
        ObservedWeek {
            completion: db.slot_completion(mesocycle_id, day_id, &exercise.exercise_id, week),
            prescribed: None,
        }
    })
}

/// Set rows for one exercise at the given targets
pub fn build_exercise_sets(exercise: &PlanDayExercise, targets: &WeekTargets) -> Vec<WorkoutSet> {
    (1..=targets.target_sets)
        .map(|set_number| WorkoutSet {
            id: Uuid::new_v4(),
            exercise_id: exercise.exercise_id.clone(),
            exercise_name: exercise.name.clone(),
            set_number,
            target_weight: targets.target_weight,
            target_reps: targets.target_reps,
            rest_seconds: exercise.rest_seconds,
            actual_weight: None,
            actual_reps: None,
            logged_at: None,
        })
        .collect()
}

/// Generate (or regenerate) workouts into `db`
///
/// All targets are computed before anything is written, and callers run
/// this inside a [`crate::Store::transaction`], so a failure leaves the
/// persisted state untouched.
pub fn generate_workouts(
    db: &mut Database,
    request: &GenerationRequest<'_>,
) -> Result<GenerationSummary> {
    let (first, last) = (*request.weeks.start(), *request.weeks.end());
    let mut summary = GenerationSummary::default();
    if first > last {
        return Ok(summary);
    }
    if !request.schedule.contains(first) || !request.schedule.contains(last) {
        return Err(Error::Validation(format!(
            "Weeks {}..={} fall outside the {}-week mesocycle",
            first, last, request.schedule.duration_weeks
        )));
    }

    let days: Vec<&PlanDay> = request
        .layout
        .days
        .iter()
        .filter(|d| request.only_day.map_or(true, |id| d.id == id))
        .collect();

    let mut targets: HashMap<(&str, &str), Vec<WeekTargets>> = HashMap::new();
    for day in &days {
        for exercise in &day.exercises {
            let weeks = slot_targets(
                db,
                request.mesocycle_id,
                request.schedule,
                &day.id,
                exercise,
                last,
                request.policy,
            )?;
            targets.insert((day.id.as_str(), exercise.exercise_id.as_str()), weeks);
        }
    }

    for week in request.weeks.clone() {
        for day in &days {
            let date = scheduled_date(request.start_date, day.day_offset, week);
            if request.not_before.map_or(false, |cutoff| date < cutoff) {
                continue;
            }

            let existing = db.workouts.iter().position(|w| {
                w.mesocycle_id == request.mesocycle_id
                    && w.plan_day_id == day.id
                    && w.week_number == week
            });
            if let Some(index) = existing {
                if db.workouts[index].status.is_locked() {
                    tracing::debug!(
                        "Keeping {} workout for day '{}' week {}",
                        db.workouts[index].status,
                        day.id,
                        week
                    );
                    summary.preserved += 1;
                    continue;
                }
                db.workouts.remove(index);
                summary.replaced += 1;
            } else {
                summary.created += 1;
            }

            let mut sets = Vec::new();
            for exercise in &day.exercises {
                let week_targets = targets
                    .get(&(day.id.as_str(), exercise.exercise_id.as_str()))
                    .and_then(|weeks| weeks.get(week as usize - 1))
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "No targets for '{}' in week {}",
                            exercise.exercise_id, week
                        ))
                    })?;
                sets.extend(build_exercise_sets(exercise, week_targets));
            }
            summary.sets_created += sets.len();

            db.workouts.push(Workout {
                id: Uuid::new_v4(),
                mesocycle_id: request.mesocycle_id,
                plan_day_id: day.id.clone(),
                day_name: day.name.clone(),
                week_number: week,
                scheduled_date: date,
                is_deload: request.schedule.is_deload(week),
                status: WorkoutStatus::Pending,
                sets,
                started_at: None,
                completed_at: None,
            });
        }
    }

    tracing::info!(
        "Generated weeks {}..={} for mesocycle {}: {} created, {} replaced, {} preserved",
        first,
        last,
        request.mesocycle_id,
        summary.created,
        summary.replaced,
        summary.preserved
    );
    Ok(summary)
}
