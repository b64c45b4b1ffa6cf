//! Test fixtures shared by the unit tests.
//!
//! - Plan and layout factories
//! - Mesocycle factory
//! - Helpers for logging sets directly on a database snapshot

use crate::{
    Database, DeloadSchedule, Mesocycle, MesocycleStatus, Plan, PlanDay, PlanDayExercise,
    PlanLayout, WorkoutStatus,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Monday 2026-01-05
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn exercise(id: &str, sets: u32, reps: u32, weight: f64, increment: f64) -> PlanDayExercise {
    PlanDayExercise {
        exercise_id: id.into(),
        name: id.replace('_', " "),
        sets,
        reps,
        weight,
        rest_seconds: 120,
        weight_increment: increment,
    }
}

pub fn day(id: &str, offset: u32, exercises: Vec<PlanDayExercise>) -> PlanDay {
    PlanDay {
        id: id.into(),
        name: id.to_uppercase(),
        day_offset: offset,
        exercises,
    }
}

/// Two days: upper (bench 3x8@100, row 3x10@60) and lower (squat 4x5@140)
pub fn upper_lower_layout() -> PlanLayout {
    PlanLayout {
        days: vec![
            day(
                "upper",
                0,
                vec![
                    exercise("bench", 3, 8, 100.0, 5.0),
                    exercise("row", 3, 10, 60.0, 2.5),
                ],
            ),
            day("lower", 2, vec![exercise("squat", 4, 5, 140.0, 5.0)]),
        ],
    }
}

pub fn plan(id: &str, weeks: u32, final_week_deload: bool, layout: PlanLayout) -> Plan {
    Plan {
        id: id.into(),
        name: format!("Plan {}", id),
        duration_weeks: weeks,
        deload_weeks: vec![],
        final_week_deload,
        days: layout.days,
    }
}

pub fn mesocycle(plan: &Plan, status: MesocycleStatus) -> Mesocycle {
    Mesocycle {
        id: Uuid::new_v4(),
        plan_id: plan.id.clone(),
        start_date: start_date(),
        current_week: if status == MesocycleStatus::Pending { 0 } else { 1 },
        schedule: DeloadSchedule {
            duration_weeks: plan.duration_weeks,
            deload_weeks: plan.deload_weeks.clone(),
            final_week_deload: plan.final_week_deload,
        },
        status,
        layout: plan.layout(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Log the first `logged` sets of a workout at target and mark it completed
pub fn complete_slot(db: &mut Database, mesocycle_id: Uuid, day_id: &str, week: u32, logged: usize) {
    let workout = db
        .workouts
        .iter_mut()
        .find(|w| w.mesocycle_id == mesocycle_id && w.plan_day_id == day_id && w.week_number == week)
        .expect("workout exists");
    for set in workout.sets.iter_mut().take(logged) {
        set.actual_weight = Some(set.target_weight);
        set.actual_reps = Some(set.target_reps);
        set.logged_at = Some(Utc::now());
    }
    workout.status = WorkoutStatus::Completed;
}
