//! The planner facade: every operation as one store transaction.
//!
//! A [`Planner`] owns a [`Store`], an [`EventSink`] and a [`Clock`]. Writes
//! run inside `Store::transaction`, so they are atomic and serialized per
//! store; once committed, an event is appended to the journal.

use crate::config::ProgressionConfig;
use crate::export::export_history;
use crate::journal::{EventKind, EventSink, JsonlJournal, PlannerEvent};
use crate::lifecycle;
use crate::plan_diff::{apply_plan_modification, ModificationResult};
use crate::preview::{next_week_preview, NextWeekPreview};
use crate::tracking::{self, SetEntry};
use crate::{
    Error, ErrorKind, FileStore, Mesocycle, Plan, PlanLayout, Result, Store, Workout,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Store file name inside the data directory
pub const STORE_FILE: &str = "lift.json";
/// Journal file name inside the data directory
pub const JOURNAL_FILE: &str = "journal.jsonl";

/// Source of "now" and "today"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a calendar day; timestamps still come from the wall clock
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    pub today: NaiveDate,
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

/// Uniform response shape for JSON consumers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope<T> {
    Success { data: T },
    Error { kind: ErrorKind, message: String },
}

impl<T> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope::Success { data },
            Err(e) => Envelope::Error {
                kind: e.kind(),
                message: e.message(),
            },
        }
    }
}

pub struct Planner<S: Store, E: EventSink> {
    store: S,
    journal: E,
    policy: ProgressionConfig,
    clock: Box<dyn Clock>,
}

impl Planner<FileStore, JsonlJournal> {
    /// File-backed planner rooted at `data_dir`
    pub fn open(data_dir: &Path, policy: ProgressionConfig) -> Result<Self> {
        policy.validate()?;
        std::fs::create_dir_all(data_dir)?;
        Ok(Self::new(
            FileStore::new(data_dir.join(STORE_FILE)),
            JsonlJournal::new(data_dir.join(JOURNAL_FILE)),
            policy,
        ))
    }
}

impl<S: Store, E: EventSink> Planner<S, E> {
    pub fn new(store: S, journal: E, policy: ProgressionConfig) -> Self {
        Self {
            store,
            journal,
            policy,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn journal(&self) -> &E {
        &self.journal
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Append to the journal; the write is already committed, so failures only warn
    fn record(&mut self, kind: EventKind) {
        let event = PlannerEvent::new(kind, self.clock.now());
        if let Err(e) = self.journal.record(&event) {
            tracing::warn!("Failed to journal event {}: {}", event.id, e);
        }
    }

    // ------------------------------------------------------------------
    // Plans
    // ------------------------------------------------------------------

    pub fn register_plan(&mut self, plan: Plan) -> Result<Plan> {
        plan.ensure_valid()?;
        let registered = self.store.transaction(|db| {
            if db.plans.contains_key(&plan.id) {
                return Err(Error::Conflict(format!(
                    "Plan '{}' is already registered",
                    plan.id
                )));
            }
            db.plans.insert(plan.id.clone(), plan.clone());
            Ok(plan)
        })?;

        tracing::info!("Registered plan '{}'", registered.id);
        self.record(EventKind::PlanRegistered {
            plan_id: registered.id.clone(),
        });
        Ok(registered)
    }

    pub fn plan(&self, plan_id: &str) -> Result<Plan> {
        Ok(self.store.load()?.plan(plan_id)?.clone())
    }

    pub fn plans(&self) -> Result<Vec<Plan>> {
        Ok(self.store.load()?.plans.into_values().collect())
    }

    /// Replace a plan's day layout, reconciling its active mesocycle
    pub fn apply_plan_modification(
        &mut self,
        plan_id: &str,
        new_layout: &PlanLayout,
    ) -> Result<ModificationResult> {
        let today = self.clock.today();
        let now = self.clock.now();
        let policy = &self.policy;
        let result = self.store.transaction(|db| {
            apply_plan_modification(db, plan_id, new_layout, today, now, policy)
        })?;

        for warning in &result.warnings {
            tracing::warn!("{}", warning);
        }
        self.record(EventKind::PlanModified {
            plan_id: plan_id.to_string(),
            affected_workouts: result.affected_workout_count,
            added_sets: result.added_sets_count,
            removed_sets: result.removed_sets_count,
            modified_sets: result.modified_sets_count,
        });
        Ok(result)
    }

    /// Replace a whole plan definition
    ///
    /// The layout goes through [`Self::apply_plan_modification`]; name and
    /// schedule fields only affect mesocycles created afterwards.
    pub fn update_plan(&mut self, plan: Plan) -> Result<ModificationResult> {
        plan.ensure_valid()?;
        let today = self.clock.today();
        let now = self.clock.now();
        let policy = &self.policy;
        let result = self.store.transaction(|db| {
            let result =
                apply_plan_modification(db, &plan.id, &plan.layout(), today, now, policy)?;
            let stored = db.plans.get_mut(&plan.id).ok_or_else(|| {
                Error::NotFound(format!("Plan '{}' not found", plan.id))
            })?;
            *stored = plan.clone();
            Ok(result)
        })?;

        for warning in &result.warnings {
            tracing::warn!("{}", warning);
        }
        self.record(EventKind::PlanModified {
            plan_id: plan.id.clone(),
            affected_workouts: result.affected_workout_count,
            added_sets: result.added_sets_count,
            removed_sets: result.removed_sets_count,
            modified_sets: result.modified_sets_count,
        });
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Mesocycle lifecycle
    // ------------------------------------------------------------------

    pub fn create_mesocycle(&mut self, plan_id: &str, start_date: NaiveDate) -> Result<Mesocycle> {
        let now = self.clock.now();
        let meso = self
            .store
            .transaction(|db| lifecycle::create_mesocycle(db, plan_id, start_date, now))?;
        self.record(EventKind::MesocycleCreated {
            mesocycle_id: meso.id,
            plan_id: plan_id.to_string(),
        });
        Ok(meso)
    }

    pub fn start_mesocycle(&mut self, mesocycle_id: Uuid) -> Result<Mesocycle> {
        let now = self.clock.now();
        let policy = &self.policy;
        let (meso, summary) = self
            .store
            .transaction(|db| lifecycle::start_mesocycle(db, mesocycle_id, policy, now))?;
        self.record(EventKind::MesocycleStarted {
            mesocycle_id: meso.id,
            workouts: summary.created + summary.replaced,
        });
        Ok(meso)
    }

    pub fn advance_week(&mut self, mesocycle_id: Uuid) -> Result<Mesocycle> {
        let now = self.clock.now();
        let policy = &self.policy;
        let (meso, _) = self
            .store
            .transaction(|db| lifecycle::advance_week(db, mesocycle_id, policy, now))?;
        self.record(EventKind::WeekAdvanced {
            mesocycle_id: meso.id,
            week: meso.current_week,
        });
        Ok(meso)
    }

    pub fn complete_mesocycle(&mut self, mesocycle_id: Uuid) -> Result<Mesocycle> {
        let now = self.clock.now();
        let meso = self
            .store
            .transaction(|db| lifecycle::complete_mesocycle(db, mesocycle_id, now))?;
        self.record(EventKind::MesocycleCompleted {
            mesocycle_id: meso.id,
        });
        Ok(meso)
    }

    pub fn cancel_mesocycle(&mut self, mesocycle_id: Uuid) -> Result<Mesocycle> {
        let now = self.clock.now();
        let meso = self
            .store
            .transaction(|db| lifecycle::cancel_mesocycle(db, mesocycle_id, now))?;
        self.record(EventKind::MesocycleCancelled {
            mesocycle_id: meso.id,
        });
        Ok(meso)
    }

    pub fn mesocycle(&self, mesocycle_id: Uuid) -> Result<Mesocycle> {
        Ok(self.store.load()?.mesocycle(mesocycle_id)?.clone())
    }

    pub fn active_mesocycle(&self) -> Result<Mesocycle> {
        self.store
            .load()?
            .active_mesocycle()
            .cloned()
            .ok_or_else(|| Error::NotFound("No active mesocycle".into()))
    }

    pub fn get_next_week_preview(&self, mesocycle_id: Uuid) -> Result<NextWeekPreview> {
        next_week_preview(&self.store.load()?, mesocycle_id, &self.policy)
    }

    // ------------------------------------------------------------------
    // Workouts
    // ------------------------------------------------------------------

    /// Workouts of a mesocycle in calendar order, optionally for one week
    pub fn workouts(&self, mesocycle_id: Uuid, week: Option<u32>) -> Result<Vec<Workout>> {
        let db = self.store.load()?;
        db.mesocycle(mesocycle_id)?;
        Ok(db
            .workouts_for(mesocycle_id)
            .into_iter()
            .filter(|w| week.map_or(true, |n| w.week_number == n))
            .cloned()
            .collect())
    }

    pub fn log_set(&mut self, entry: &SetEntry) -> Result<Workout> {
        let now = self.clock.now();
        let workout = self
            .store
            .transaction(|db| tracking::log_set(db, entry, now))?;
        self.record(EventKind::SetLogged {
            workout_id: entry.workout_id,
            exercise_id: entry.exercise_id.clone(),
            set_number: entry.set_number,
            weight: entry.weight,
            reps: entry.reps,
        });
        Ok(workout)
    }

    pub fn complete_workout(&mut self, workout_id: Uuid) -> Result<Workout> {
        let now = self.clock.now();
        let workout = self
            .store
            .transaction(|db| tracking::complete_workout(db, workout_id, now))?;
        self.record(EventKind::WorkoutCompleted { workout_id });
        Ok(workout)
    }

    pub fn export_history(&self, mesocycle_id: Uuid, path: &Path) -> Result<usize> {
        export_history(&self.store.load()?, mesocycle_id, path)
    }
}
