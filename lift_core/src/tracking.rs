//! Logging actual set values against scheduled workouts.
//!
//! Logging the first set moves a workout from `pending` to `in_progress`,
//! after which regeneration and plan edits no longer touch it.

use crate::{Database, Error, MesocycleStatus, Result, Workout, WorkoutStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logged set
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetEntry {
    pub workout_id: Uuid,
    pub exercise_id: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
}

fn ensure_mesocycle_active(db: &Database, workout: &Workout) -> Result<()> {
    let meso = db.mesocycle(workout.mesocycle_id)?;
    if meso.status != MesocycleStatus::Active {
        return Err(Error::Conflict(format!(
            "Mesocycle {} is {}, workouts can only be logged while it is active",
            meso.id, meso.status
        )));
    }
    Ok(())
}

/// Record actual weight and reps for one set
pub fn log_set(db: &mut Database, entry: &SetEntry, now: DateTime<Utc>) -> Result<Workout> {
    if !(entry.weight >= 0.0) {
        return Err(Error::Validation(format!(
            "Logged weight must not be negative, got {}",
            entry.weight
        )));
    }

    ensure_mesocycle_active(db, db.workout(entry.workout_id)?)?;
    let workout = db.workout_mut(entry.workout_id)?;
    if workout.status == WorkoutStatus::Completed {
        return Err(Error::Conflict(format!(
            "Workout {} is already completed",
            workout.id
        )));
    }

    let set = workout
        .sets
        .iter_mut()
        .find(|s| s.exercise_id == entry.exercise_id && s.set_number == entry.set_number)
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Set {} of '{}' not found in workout {}",
                entry.set_number, entry.exercise_id, entry.workout_id
            ))
        })?;
    set.actual_weight = Some(entry.weight);
    set.actual_reps = Some(entry.reps);
    set.logged_at = Some(now);

    if workout.status == WorkoutStatus::Pending {
        workout.status = WorkoutStatus::InProgress;
        workout.started_at = Some(now);
    }

    tracing::info!(
        "Logged {} set {}: {} x {} in workout {}",
        entry.exercise_id,
        entry.set_number,
        entry.weight,
        entry.reps,
        entry.workout_id
    );
    Ok(workout.clone())
}

/// Mark a workout as completed; unlogged sets stay unlogged
pub fn complete_workout(db: &mut Database, workout_id: Uuid, now: DateTime<Utc>) -> Result<Workout> {
    ensure_mesocycle_active(db, db.workout(workout_id)?)?;
    let workout = db.workout_mut(workout_id)?;
    if workout.status == WorkoutStatus::Completed {
        return Err(Error::Conflict(format!(
            "Workout {} is already completed",
            workout_id
        )));
    }

    workout.status = WorkoutStatus::Completed;
    workout.started_at.get_or_insert(now);
    workout.completed_at = Some(now);

    let logged = workout.sets.iter().filter(|s| s.is_logged()).count();
    tracing::info!(
        "Completed workout {} ({}/{} sets logged)",
        workout_id,
        logged,
        workout.sets.len()
    );
    Ok(workout.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgressionConfig;
    use crate::generator::{generate_workouts, GenerationRequest};
    use crate::test_utils::*;

    fn seeded(status: MesocycleStatus) -> (Database, Uuid) {
        let plan = plan("ul", 2, false, upper_lower_layout());
        let meso = mesocycle(&plan, status);
        let mut db = Database::default();
        let policy = ProgressionConfig::default();
        generate_workouts(
            &mut db,
            &GenerationRequest {
                mesocycle_id: meso.id,
                start_date: meso.start_date,
                layout: &meso.layout,
                schedule: &meso.schedule,
                weeks: 1..=2,
                only_day: None,
                not_before: None,
                policy: &policy,
            },
        )
        .unwrap();
        let workout_id = db.find_workout(meso.id, "upper", 1).unwrap().id;
        db.mesocycles.insert(meso.id, meso);
        (db, workout_id)
    }

    fn entry(workout_id: Uuid, exercise: &str, set_number: u32) -> SetEntry {
        SetEntry {
            workout_id,
            exercise_id: exercise.into(),
            set_number,
            weight: 100.0,
            reps: 8,
        }
    }

    #[test]
    fn test_first_log_starts_workout() {
        let (mut db, workout_id) = seeded(MesocycleStatus::Active);
        let workout = log_set(&mut db, &entry(workout_id, "bench", 1), Utc::now()).unwrap();
        assert_eq!(workout.status, WorkoutStatus::InProgress);
        assert!(workout.started_at.is_some());
        let set = workout.sets_for("bench").next().unwrap();
        assert_eq!(set.actual_weight, Some(100.0));
        assert_eq!(set.actual_reps, Some(8));
    }

    #[test]
    fn test_unknown_set_is_not_found() {
        let (mut db, workout_id) = seeded(MesocycleStatus::Active);
        let result = log_set(&mut db, &entry(workout_id, "bench", 9), Utc::now());
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = log_set(&mut db, &entry(Uuid::new_v4(), "bench", 1), Utc::now());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_cannot_log_into_inactive_mesocycle() {
        let (mut db, workout_id) = seeded(MesocycleStatus::Cancelled);
        let result = log_set(&mut db, &entry(workout_id, "bench", 1), Utc::now());
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_complete_workout() {
        let (mut db, workout_id) = seeded(MesocycleStatus::Active);
        log_set(&mut db, &entry(workout_id, "bench", 1), Utc::now()).unwrap();

        let workout = complete_workout(&mut db, workout_id, Utc::now()).unwrap();
        assert_eq!(workout.status, WorkoutStatus::Completed);
        assert!(workout.completed_at.is_some());

        // Completed workouts are closed for logging and completion
        let again = complete_workout(&mut db, workout_id, Utc::now());
        assert!(matches!(again, Err(Error::Conflict(_))));
        let late = log_set(&mut db, &entry(workout_id, "bench", 2), Utc::now());
        assert!(matches!(late, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let (mut db, workout_id) = seeded(MesocycleStatus::Active);
        let mut bad = entry(workout_id, "bench", 1);
        bad.weight = -5.0;
        assert!(matches!(
            log_set(&mut db, &bad, Utc::now()),
            Err(Error::Validation(_))
        ));
    }
}
