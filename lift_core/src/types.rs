//! Core domain types for the mesocycle planner.
//!
//! This module defines the fundamental types used throughout the system:
//! - Plans, plan days and per-exercise base configuration
//! - Mesocycles and their lifecycle status
//! - Scheduled workouts and their set rows (targets + actuals)
//! - Derived per-week targets and completion status

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Plan Types
// ============================================================================

/// Base prescription for one exercise, as configured on a plan day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBase {
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    pub rest_seconds: u32,
    pub weight_increment: f64,
}

/// An exercise slot on a plan day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanDayExercise {
    pub exercise_id: String,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    #[serde(default)]
    pub rest_seconds: u32,
    pub weight_increment: f64,
}

impl PlanDayExercise {
    pub fn base(&self) -> ExerciseBase {
        ExerciseBase {
            sets: self.sets,
            reps: self.reps,
            weight: self.weight,
            rest_seconds: self.rest_seconds,
            weight_increment: self.weight_increment,
        }
    }
}

/// Template for one training day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanDay {
    pub id: String,
    pub name: String,
    /// Days after the start of each training week (0-6)
    pub day_offset: u32,
    #[serde(default)]
    pub exercises: Vec<PlanDayExercise>,
}

impl PlanDay {
    pub fn exercise(&self, exercise_id: &str) -> Option<&PlanDayExercise> {
        self.exercises.iter().find(|e| e.exercise_id == exercise_id)
    }

    /// Position of an exercise within the day, used to order set rows
    pub fn position_of(&self, exercise_id: &str) -> usize {
        self.exercises
            .iter()
            .position(|e| e.exercise_id == exercise_id)
            .unwrap_or(usize::MAX)
    }
}

/// The day/exercise structure of a plan, as captured by a mesocycle
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanLayout {
    #[serde(default)]
    pub days: Vec<PlanDay>,
}

impl PlanLayout {
    pub fn day(&self, day_id: &str) -> Option<&PlanDay> {
        self.days.iter().find(|d| d.id == day_id)
    }

    pub fn exercise_count(&self) -> usize {
        self.days.iter().map(|d| d.exercises.len()).sum()
    }
}

/// A multi-week training plan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub duration_weeks: u32,
    /// Weeks explicitly scheduled as deloads, in addition to the final week
    #[serde(default)]
    pub deload_weeks: Vec<u32>,
    #[serde(default = "default_final_week_deload")]
    pub final_week_deload: bool,
    #[serde(default)]
    pub days: Vec<PlanDay>,
}

fn default_final_week_deload() -> bool {
    true
}

impl Plan {
    pub fn layout(&self) -> PlanLayout {
        PlanLayout {
            days: self.days.clone(),
        }
    }

    pub fn schedule(&self) -> DeloadSchedule {
        DeloadSchedule {
            duration_weeks: self.duration_weeks,
            deload_weeks: self.deload_weeks.clone(),
            final_week_deload: self.final_week_deload,
        }
    }
}

/// Which weeks of a mesocycle are deloads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeloadSchedule {
    pub duration_weeks: u32,
    #[serde(default)]
    pub deload_weeks: Vec<u32>,
    pub final_week_deload: bool,
}

impl DeloadSchedule {
    pub fn is_deload(&self, week: u32) -> bool {
        (self.final_week_deload && week == self.duration_weeks) || self.deload_weeks.contains(&week)
    }

    pub fn contains(&self, week: u32) -> bool {
        week >= 1 && week <= self.duration_weeks
    }
}

// ============================================================================
// Mesocycle Types
// ============================================================================

/// Lifecycle status of a mesocycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MesocycleStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl MesocycleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for MesocycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A fixed-length block of training weeks derived from one plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mesocycle {
    pub id: Uuid,
    pub plan_id: String,
    pub start_date: NaiveDate,
    /// 0 until started, then 1..=duration
    pub current_week: u32,
    pub schedule: DeloadSchedule,
    pub status: MesocycleStatus,
    /// Plan layout as of creation, start, or the last applied modification
    pub layout: PlanLayout,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mesocycle {
    pub fn duration_weeks(&self) -> u32 {
        self.schedule.duration_weeks
    }

    /// Calendar date of a plan day in a given week
    pub fn date_for(&self, day: &PlanDay, week: u32) -> NaiveDate {
        scheduled_date(self.start_date, day.day_offset, week)
    }
}

/// start + day offset + (week - 1) × 7 days
pub fn scheduled_date(start: NaiveDate, day_offset: u32, week: u32) -> NaiveDate {
    let offset = i64::from(day_offset) + i64::from(week.saturating_sub(1)) * 7;
    start + Duration::days(offset)
}

// ============================================================================
// Workout Types
// ============================================================================

/// Execution status of a scheduled workout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkoutStatus {
    /// In-progress and completed workouts are history and must never be regenerated
    pub fn is_locked(self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for WorkoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// One prescribed set of one exercise within a workout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: Uuid,
    pub exercise_id: String,
    pub exercise_name: String,
    pub set_number: u32,
    pub target_weight: f64,
    pub target_reps: u32,
    pub rest_seconds: u32,
    pub actual_weight: Option<f64>,
    pub actual_reps: Option<u32>,
    pub logged_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    pub fn is_logged(&self) -> bool {
        self.actual_weight.is_some() && self.actual_reps.is_some()
    }
}

/// A concrete scheduled instance of a plan day in a given week
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub mesocycle_id: Uuid,
    pub plan_day_id: String,
    pub day_name: String,
    pub week_number: u32,
    pub scheduled_date: NaiveDate,
    pub is_deload: bool,
    pub status: WorkoutStatus,
    pub sets: Vec<WorkoutSet>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workout {
    pub fn sets_for<'a>(&'a self, exercise_id: &'a str) -> impl Iterator<Item = &'a WorkoutSet> {
        self.sets.iter().filter(move |s| s.exercise_id == exercise_id)
    }

    pub fn has_exercise(&self, exercise_id: &str) -> bool {
        self.sets.iter().any(|s| s.exercise_id == exercise_id)
    }
}

// ============================================================================
// Derived Types
// ============================================================================

/// Targets for one exercise slot in one week
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekTargets {
    pub week_number: u32,
    pub target_weight: f64,
    pub target_reps: u32,
    pub target_sets: u32,
    pub is_deload: bool,
    /// Pre-deload weight; equals `target_weight` outside deload weeks
    pub lineage_weight: f64,
    /// Pre-deload sets; equals `target_sets` outside deload weeks
    pub lineage_sets: u32,
}

/// Whether all prescribed sets of an exercise slot were logged in a week
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStatus {
    pub completed_sets: u32,
    pub prescribed_sets: u32,
    pub all_sets_completed: bool,
}
