#![forbid(unsafe_code)]

//! Core domain model and business logic for the mesocycle planner.
//!
//! This crate provides:
//! - Domain types (plans, mesocycles, workouts, sets, weekly targets)
//! - Progression and completion rules
//! - Workout generation and plan-edit reconciliation
//! - Persistence (JSON store, event journal, CSV export)
//! - The `Planner` facade tying them together

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod plan;
pub mod progression;
pub mod completion;
pub mod store;
pub mod generator;
pub mod tracking;
pub mod preview;
pub mod plan_diff;
pub mod lifecycle;
pub mod journal;
pub mod export;
pub mod planner;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::*;
pub use config::{Config, PostDeload, ProgressionConfig, WeightRounding};
pub use store::{Database, FileStore, MemoryStore, Store};
pub use journal::{EventKind, EventSink, JsonlJournal, PlannerEvent};
pub use plan::load_plan;
pub use plan_diff::{ModificationResult, PlanChange, PlanDiff};
pub use preview::{NextWeekPreview, PreviewExercise};
pub use tracking::SetEntry;
pub use planner::{Clock, Envelope, FixedClock, Planner, SystemClock};
