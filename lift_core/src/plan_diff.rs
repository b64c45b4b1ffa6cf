//! Structural plan diffs and their application to a running mesocycle.
//!
//! A diff compares the layout a mesocycle was generated from with a newly
//! edited layout. Applying it rewrites only workouts that are still `pending`
//! and scheduled today or later; in-progress and completed workouts are
//! history and are never touched.

use crate::config::ProgressionConfig;
use crate::generator::{
    build_exercise_sets, generate_workouts, rebased_slot_targets, GenerationRequest,
};
use crate::plan::validate_layout;
use crate::{
    Database, Error, Mesocycle, MesocycleStatus, PlanDay, PlanDayExercise, PlanLayout, Result,
    WeekTargets, Workout, WorkoutSet, WorkoutStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Fields of an exercise that changed; `None` means unchanged
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseFieldChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_increment: Option<f64>,
}

impl ExerciseFieldChanges {
    pub fn between(old: &PlanDayExercise, new: &PlanDayExercise) -> Self {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }
        Self {
            name: changed(&old.name, &new.name),
            sets: changed(&old.sets, &new.sets),
            reps: changed(&old.reps, &new.reps),
            weight: changed(&old.weight, &new.weight),
            rest_seconds: changed(&old.rest_seconds, &new.rest_seconds),
            weight_increment: changed(&old.weight_increment, &new.weight_increment),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the change feeds into progression, so targets must be recomputed
    pub fn affects_targets(&self) -> bool {
        self.sets.is_some()
            || self.reps.is_some()
            || self.weight.is_some()
            || self.weight_increment.is_some()
    }
}

/// One structural change between two layouts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum PlanChange {
    AddedExercise {
        day_id: String,
        exercise: PlanDayExercise,
    },
    RemovedExercise {
        day_id: String,
        exercise_id: String,
    },
    ModifiedExercise {
        day_id: String,
        exercise: PlanDayExercise,
        changes: ExerciseFieldChanges,
    },
    AddedDay {
        day: PlanDay,
    },
    RemovedDay {
        day_id: String,
    },
}

/// The full set of changes between two layouts
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDiff {
    pub changes: Vec<PlanChange>,
}

impl PlanDiff {
    /// Compare layouts: days by id, exercises within a day by exercise id
    pub fn compute(old: &PlanLayout, new: &PlanLayout) -> Self {
        let mut changes = Vec::new();

        for old_day in &old.days {
            let Some(new_day) = new.day(&old_day.id) else {
                changes.push(PlanChange::RemovedDay {
                    day_id: old_day.id.clone(),
                });
                continue;
            };

            for old_exercise in &old_day.exercises {
                match new_day.exercise(&old_exercise.exercise_id) {
                    Some(new_exercise) => {
                        let field_changes = ExerciseFieldChanges::between(old_exercise, new_exercise);
                        if !field_changes.is_empty() {
                            changes.push(PlanChange::ModifiedExercise {
                                day_id: old_day.id.clone(),
                                exercise: new_exercise.clone(),
                                changes: field_changes,
                            });
                        }
                    }
                    None => changes.push(PlanChange::RemovedExercise {
                        day_id: old_day.id.clone(),
                        exercise_id: old_exercise.exercise_id.clone(),
                    }),
                }
            }

            for new_exercise in &new_day.exercises {
                if old_day.exercise(&new_exercise.exercise_id).is_none() {
                    changes.push(PlanChange::AddedExercise {
                        day_id: old_day.id.clone(),
                        exercise: new_exercise.clone(),
                    });
                }
            }
        }

        for new_day in &new.days {
            if old.day(&new_day.id).is_none() {
                changes.push(PlanChange::AddedDay {
                    day: new_day.clone(),
                });
            }
        }

        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn added_exercises(&self) -> impl Iterator<Item = (&str, &PlanDayExercise)> {
        self.changes.iter().filter_map(|c| match c {
            PlanChange::AddedExercise { day_id, exercise } => Some((day_id.as_str(), exercise)),
            _ => None,
        })
    }

    pub fn removed_exercises(&self) -> impl Iterator<Item = (&str, &str)> {
        self.changes.iter().filter_map(|c| match c {
            PlanChange::RemovedExercise {
                day_id,
                exercise_id,
            } => Some((day_id.as_str(), exercise_id.as_str())),
            _ => None,
        })
    }

    pub fn modified_exercises(
        &self,
    ) -> impl Iterator<Item = (&str, &PlanDayExercise, &ExerciseFieldChanges)> {
        self.changes.iter().filter_map(|c| match c {
            PlanChange::ModifiedExercise {
                day_id,
                exercise,
                changes,
            } => Some((day_id.as_str(), exercise, changes)),
            _ => None,
        })
    }

    pub fn added_days(&self) -> impl Iterator<Item = &PlanDay> {
        self.changes.iter().filter_map(|c| match c {
            PlanChange::AddedDay { day } => Some(day),
            _ => None,
        })
    }

    pub fn removed_days(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().filter_map(|c| match c {
            PlanChange::RemovedDay { day_id } => Some(day_id.as_str()),
            _ => None,
        })
    }
}

/// Externally visible effect of applying a plan edit
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationResult {
    pub affected_workout_count: usize,
    pub added_sets_count: usize,
    pub removed_sets_count: usize,
    pub modified_sets_count: usize,
    pub warnings: Vec<String>,
}

/// Per-workout tallies, folded into the [`ModificationResult`]
#[derive(Default)]
struct WorkoutEdit {
    added: usize,
    removed: usize,
    modified: usize,
}

impl WorkoutEdit {
    fn touched(&self) -> bool {
        self.added + self.removed + self.modified > 0
    }
}

fn is_eligible(workout: &Workout, mesocycle_id: Uuid, today: NaiveDate) -> bool {
    workout.mesocycle_id == mesocycle_id
        && workout.status == WorkoutStatus::Pending
        && workout.scheduled_date >= today
}

fn week_targets<'a>(
    targets: &'a HashMap<(String, String), Vec<WeekTargets>>,
    day_id: &str,
    exercise_id: &str,
    week: u32,
) -> Result<&'a WeekTargets> {
    targets
        .get(&(day_id.to_string(), exercise_id.to_string()))
        .and_then(|weeks| weeks.get(week as usize - 1))
        .ok_or_else(|| {
            Error::Validation(format!(
                "No targets for '{}' on day '{}' in week {}",
                exercise_id, day_id, week
            ))
        })
}

/// Resize and retarget an exercise's rows after a base-value edit
fn retarget_exercise(
    workout: &mut Workout,
    exercise: &PlanDayExercise,
    targets: &WeekTargets,
    edit: &mut WorkoutEdit,
) {
    let before = workout.sets.len();
    workout
        .sets
        .retain(|s| s.exercise_id != exercise.exercise_id || s.set_number <= targets.target_sets);
    edit.removed += before - workout.sets.len();

    for set in workout
        .sets
        .iter_mut()
        .filter(|s| s.exercise_id == exercise.exercise_id)
    {
        let updated = WorkoutSet {
            target_weight: targets.target_weight,
            target_reps: targets.target_reps,
            rest_seconds: exercise.rest_seconds,
            exercise_name: exercise.name.clone(),
            ..set.clone()
        };
        if *set != updated {
            *set = updated;
            edit.modified += 1;
        }
    }

    let missing: Vec<WorkoutSet> = build_exercise_sets(exercise, targets)
        .into_iter()
        .filter(|s| !workout.sets_for(&exercise.exercise_id).any(|e| e.set_number == s.set_number))
        .collect();
    edit.added += missing.len();
    workout.sets.extend(missing);
}

/// Update rest interval and display name in place
fn relabel_exercise(workout: &mut Workout, exercise: &PlanDayExercise, edit: &mut WorkoutEdit) {
    for set in workout
        .sets
        .iter_mut()
        .filter(|s| s.exercise_id == exercise.exercise_id)
    {
        if set.rest_seconds != exercise.rest_seconds || set.exercise_name != exercise.name {
            set.rest_seconds = exercise.rest_seconds;
            set.exercise_name = exercise.name.clone();
            edit.modified += 1;
        }
    }
}

fn edit_workout(
    workout: &mut Workout,
    diff: &PlanDiff,
    new_day: &PlanDay,
    targets: &HashMap<(String, String), Vec<WeekTargets>>,
) -> Result<WorkoutEdit> {
    let mut edit = WorkoutEdit::default();
    let day_id = new_day.id.as_str();

    for (_, exercise_id) in diff.removed_exercises().filter(|(d, _)| *d == day_id) {
        let before = workout.sets.len();
        workout.sets.retain(|s| s.exercise_id != exercise_id);
        edit.removed += before - workout.sets.len();
    }

    for (_, exercise) in diff.added_exercises().filter(|(d, _)| *d == day_id) {
        if workout.has_exercise(&exercise.exercise_id) {
            continue;
        }
        let week = week_targets(targets, day_id, &exercise.exercise_id, workout.week_number)?;
        let sets = build_exercise_sets(exercise, week);
        edit.added += sets.len();
        workout.sets.extend(sets);
    }

    for (_, exercise, changes) in diff.modified_exercises().filter(|(d, _, _)| *d == day_id) {
        if !workout.has_exercise(&exercise.exercise_id) {
            continue;
        }
        if changes.affects_targets() {
            let week = week_targets(targets, day_id, &exercise.exercise_id, workout.week_number)?;
            retarget_exercise(workout, exercise, week, &mut edit);
        } else {
            relabel_exercise(workout, exercise, &mut edit);
        }
    }

    if edit.touched() {
        workout.sets.sort_by_key(|s| (new_day.position_of(&s.exercise_id), s.set_number));
    }
    Ok(edit)
}

/// Apply a diff to one active mesocycle's pending, not-yet-due workouts
///
/// The mesocycle's layout snapshot is replaced with `new_layout`.
pub fn apply_plan_diff(
    db: &mut Database,
    mesocycle_id: Uuid,
    diff: &PlanDiff,
    new_layout: &PlanLayout,
    today: NaiveDate,
    now: DateTime<Utc>,
    policy: &ProgressionConfig,
) -> Result<ModificationResult> {
    let meso: Mesocycle = db.mesocycle(mesocycle_id)?.clone();
    if meso.status != MesocycleStatus::Active {
        return Err(Error::Conflict(format!(
            "Mesocycle {} is {}, plan edits apply only to an active mesocycle",
            meso.id, meso.status
        )));
    }

    let mut result = ModificationResult::default();

    // Targets for every slot whose rows may be (re)built, computed before any write
    let mut targets: HashMap<(String, String), Vec<WeekTargets>> = HashMap::new();
    let slots = diff.added_exercises().chain(
            diff.modified_exercises()
                .filter(|(_, _, changes)| changes.affects_targets())
                .map(|(day_id, exercise, _)| (day_id, exercise)),
        );
    for (day_id, exercise) in slots {
        let weeks = rebased_slot_targets(
            db,
            meso.id,
            &meso.schedule,
            day_id,
            exercise,
            meso.duration_weeks(),
            policy,
        )?;
        targets.insert((day_id.to_string(), exercise.exercise_id.clone()), weeks);
    }

    for day_id in diff.removed_days() {
        let before = db.workouts.len();
        let mut removed_sets = 0;
        db.workouts.retain(|w| {
            let drop = w.plan_day_id == day_id && is_eligible(w, meso.id, today);
            if drop {
                removed_sets += w.sets.len();
            }
            !drop
        });
        result.affected_workout_count += before - db.workouts.len();
        result.removed_sets_count += removed_sets;
    }

    for workout in db
        .workouts
        .iter_mut()
        .filter(|w| is_eligible(w, meso.id, today))
    {
        let Some(new_day) = new_layout.day(&workout.plan_day_id) else {
            continue;
        };
        let edit = edit_workout(workout, diff, new_day, &targets)?;
        if edit.touched() {
            tracing::debug!(
                "Workout {} (day '{}' week {}): +{} -{} ~{} sets",
                workout.id,
                workout.plan_day_id,
                workout.week_number,
                edit.added,
                edit.removed,
                edit.modified
            );
            result.affected_workout_count += 1;
            result.added_sets_count += edit.added;
            result.removed_sets_count += edit.removed;
            result.modified_sets_count += edit.modified;
        }
    }

    for day in diff.added_days() {
        let summary = generate_workouts(
            db,
            &GenerationRequest {
                mesocycle_id: meso.id,
                start_date: meso.start_date,
                layout: new_layout,
                schedule: &meso.schedule,
                weeks: 1..=meso.duration_weeks(),
                only_day: Some(&day.id),
                not_before: Some(today),
                policy,
            },
        )?;
        result.affected_workout_count += summary.created + summary.replaced;
        result.added_sets_count += summary.sets_created;
    }

    result.warnings = collect_warnings(&meso.layout, new_layout);

    let stored = db.mesocycle_mut(meso.id)?;
    stored.layout = new_layout.clone();
    stored.updated_at = now;

    tracing::info!(
        "Applied {} plan changes to mesocycle {}: {} workouts, +{} -{} ~{} sets",
        diff.changes.len(),
        meso.id,
        result.affected_workout_count,
        result.added_sets_count,
        result.removed_sets_count,
        result.modified_sets_count
    );
    Ok(result)
}

fn collect_warnings(old: &PlanLayout, new: &PlanLayout) -> Vec<String> {
    let mut warnings = Vec::new();
    for new_day in &new.days {
        let Some(old_day) = old.day(&new_day.id) else {
            continue;
        };
        if new_day.exercises.is_empty() && !old_day.exercises.is_empty() {
            warnings.push(format!(
                "Day '{}' has no exercises left; its upcoming workouts are empty",
                new_day.id
            ));
        }
        if new_day.day_offset != old_day.day_offset {
            warnings.push(format!(
                "Day '{}' moved from offset {} to {}; already scheduled workouts keep their dates",
                new_day.id, old_day.day_offset, new_day.day_offset
            ));
        }
    }
    warnings
}

/// Replace a plan's layout and reconcile every mesocycle that depends on it
///
/// The active mesocycle (if it runs this plan) gets the diff applied;
/// pending ones get their snapshot refreshed; finished ones are left alone.
pub fn apply_plan_modification(
    db: &mut Database,
    plan_id: &str,
    new_layout: &PlanLayout,
    today: NaiveDate,
    now: DateTime<Utc>,
    policy: &ProgressionConfig,
) -> Result<ModificationResult> {
    db.plan(plan_id)?;

    let errors = validate_layout(new_layout);
    if !errors.is_empty() {
        return Err(Error::Validation(errors.join("; ")));
    }

    let mut result = ModificationResult::default();
    let active = db
        .active_mesocycle()
        .filter(|m| m.plan_id == plan_id)
        .map(|m| m.id);

    if let Some(meso_id) = active {
        if new_layout.days.is_empty() || new_layout.exercise_count() == 0 {
            return Err(Error::Validation(
                "Layout would leave the active mesocycle with no days or no exercises".into(),
            ));
        }
        let diff = PlanDiff::compute(&db.mesocycle(meso_id)?.layout, new_layout);
        result = apply_plan_diff(db, meso_id, &diff, new_layout, today, now, policy)?;
    }

    for meso in db
        .mesocycles
        .values_mut()
        .filter(|m| m.plan_id == plan_id && m.status == MesocycleStatus::Pending)
    {
        meso.layout = new_layout.clone();
        meso.updated_at = now;
    }

    if let Some(plan) = db.plans.get_mut(plan_id) {
        plan.days = new_layout.days.clone();
    }
    Ok(result)
}
