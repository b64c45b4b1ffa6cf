//! Append-only journal of planner events.
//!
//! Events are appended to a JSONL (JSON Lines) file after each committed
//! transaction, with file locking for safe concurrent access. The journal is
//! an audit trail; the store file stays the source of truth.

use crate::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What happened
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    PlanRegistered {
        plan_id: String,
    },
    PlanModified {
        plan_id: String,
        affected_workouts: usize,
        added_sets: usize,
        removed_sets: usize,
        modified_sets: usize,
    },
    MesocycleCreated {
        mesocycle_id: Uuid,
        plan_id: String,
    },
    MesocycleStarted {
        mesocycle_id: Uuid,
        workouts: usize,
    },
    WeekAdvanced {
        mesocycle_id: Uuid,
        week: u32,
    },
    MesocycleCompleted {
        mesocycle_id: Uuid,
    },
    MesocycleCancelled {
        mesocycle_id: Uuid,
    },
    SetLogged {
        workout_id: Uuid,
        exercise_id: String,
        set_number: u32,
        weight: f64,
        reps: u32,
    },
    WorkoutCompleted {
        workout_id: Uuid,
    },
}

/// One journal line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannerEvent {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl PlannerEvent {
    pub fn new(kind: EventKind, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at,
            kind,
        }
    }
}

/// Destination for planner events
pub trait EventSink {
    fn record(&mut self, event: &PlannerEvent) -> Result<()>;
}

/// In-memory sink, used by tests and embedders that don't want a file
impl EventSink for Vec<PlannerEvent> {
    fn record(&mut self, event: &PlannerEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

/// JSONL-based event journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl EventSink for JsonlJournal {
    fn record(&mut self, event: &PlannerEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        tracing::debug!("Journaled event {} to {}", event.id, self.path.display());
        Ok(())
    }
}

/// Read all events from a journal file, skipping lines that fail to parse
pub fn read_events(path: &Path) -> Result<Vec<PlannerEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PlannerEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => tracing::warn!("Skipping journal line {}: {}", line_num + 1, e),
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} events from {}", events.len(), path.display());
    Ok(events)
}
