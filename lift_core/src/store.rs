//! Persistent planner state with transactional read-modify-write.
//!
//! Every write goes through [`Store::transaction`]: the closure runs against a
//! working copy of the [`Database`] while the store's writer lock is held, and
//! the copy is committed only if the closure succeeds. That is the
//! single-writer discipline generation and diff application rely on.

use crate::completion::evaluate_workout_exercise;
use crate::progression::ObservedWeek;
use crate::{
    CompletionStatus, Error, Mesocycle, MesocycleStatus, Plan, Result, WeekTargets, Workout,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Snapshot of everything the planner persists
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub plans: BTreeMap<String, Plan>,
    #[serde(default)]
    pub mesocycles: BTreeMap<Uuid, Mesocycle>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
}

impl Database {
    pub fn plan(&self, plan_id: &str) -> Result<&Plan> {
        self.plans
            .get(plan_id)
            .ok_or_else(|| Error::NotFound(format!("Plan '{}' not found", plan_id)))
    }

    pub fn mesocycle(&self, id: Uuid) -> Result<&Mesocycle> {
        self.mesocycles
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Mesocycle {} not found", id)))
    }

    pub fn mesocycle_mut(&mut self, id: Uuid) -> Result<&mut Mesocycle> {
        self.mesocycles
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Mesocycle {} not found", id)))
    }

    /// The mesocycle currently `active`, if any
    pub fn active_mesocycle(&self) -> Option<&Mesocycle> {
        self.mesocycles
            .values()
            .find(|m| m.status == MesocycleStatus::Active)
    }

    pub fn workout(&self, id: Uuid) -> Result<&Workout> {
        self.workouts
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::NotFound(format!("Workout {} not found", id)))
    }

    pub fn workout_mut(&mut self, id: Uuid) -> Result<&mut Workout> {
        self.workouts
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::NotFound(format!("Workout {} not found", id)))
    }

    /// Workouts of a mesocycle in schedule order
    pub fn workouts_for(&self, mesocycle_id: Uuid) -> Vec<&Workout> {
        let mut workouts: Vec<_> = self
            .workouts
            .iter()
            .filter(|w| w.mesocycle_id == mesocycle_id)
            .collect();
        workouts.sort_by(|a, b| {
            (a.scheduled_date, a.week_number, &a.plan_day_id)
                .cmp(&(b.scheduled_date, b.week_number, &b.plan_day_id))
        });
        workouts
    }

    /// The workout generated for a (mesocycle, plan day, week) tuple
    pub fn find_workout(&self, mesocycle_id: Uuid, day_id: &str, week: u32) -> Option<&Workout> {
        self.workouts.iter().find(|w| {
            w.mesocycle_id == mesocycle_id && w.plan_day_id == day_id && w.week_number == week
        })
    }

    /// How an exercise slot went in a week; `None` when no workout exists for it
    pub fn slot_completion(
        &self,
        mesocycle_id: Uuid,
        day_id: &str,
        exercise_id: &str,
        week: u32,
    ) -> Option<CompletionStatus> {
        self.find_workout(mesocycle_id, day_id, week)
            .map(|w| evaluate_workout_exercise(w, exercise_id))
    }

    /// Targets a locked workout already fixed for an exercise slot
    ///
    /// Pending workouts are still regenerable, so they prescribe nothing.
    pub fn slot_prescription(
        &self,
        mesocycle_id: Uuid,
        day_id: &str,
        exercise_id: &str,
        week: u32,
    ) -> Option<WeekTargets> {
        let workout = self
            .find_workout(mesocycle_id, day_id, week)
            .filter(|w| w.status.is_locked())?;
        let first = workout.sets_for(exercise_id).next()?;
        let sets = workout.sets_for(exercise_id).count() as u32;
        Some(WeekTargets {
            week_number: week,
            target_weight: first.target_weight,
            target_reps: first.target_reps,
            target_sets: sets,
            is_deload: workout.is_deload,
            lineage_weight: first.target_weight,
            lineage_sets: sets,
        })
    }

    /// Recorded completion and locked targets of an exercise slot in a week
    pub fn observed_slot(
        &self,
        mesocycle_id: Uuid,
        day_id: &str,
        exercise_id: &str,
        week: u32,
    ) -> ObservedWeek {
        ObservedWeek {
            completion: self.slot_completion(mesocycle_id, day_id, exercise_id, week),
            prescribed: self.slot_prescription(mesocycle_id, day_id, exercise_id, week),
        }
    }
}

/// Backing storage for the planner
pub trait Store {
    /// Read a consistent snapshot
    fn load(&self) -> Result<Database>;

    /// Run `f` against a working copy and commit it only if `f` succeeds
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>;
}

impl<S: Store> Store for Arc<S> {
    fn load(&self) -> Result<Database> {
        (**self).load()
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        (**self).transaction(f)
    }
}

/// In-process store guarded by a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    db: Mutex<Database>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Database> {
        let guard = self.db.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let mut guard = self.db.lock().unwrap_or_else(|p| p.into_inner());
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }
}

/// JSON file store with a sibling lock file
///
/// Readers take a shared lock, writers an exclusive one for the whole
/// read-modify-write. Commits write a temp file in the same directory and
/// rename it over the store file.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn open_lock_file(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        Ok(file)
    }

    fn read_unlocked(&self) -> Result<Database> {
        if !self.path.exists() {
            tracing::info!("No store file at {:?}, starting empty", self.path);
            return Ok(Database::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(File::open(&self.path)?);
        reader.read_to_string(&mut contents)?;

        // A corrupt store holds history; refuse to overwrite it with an empty one
        let db = serde_json::from_str::<Database>(&contents).map_err(|e| {
            tracing::error!("Store file {:?} is unreadable: {}", self.path, e);
            Error::Json(e)
        })?;
        Ok(db)
    }

    fn write_unlocked(&self, db: &Database) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(db)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl Store for FileStore {
    fn load(&self) -> Result<Database> {
        let lock = self.open_lock_file()?;
        lock.lock_shared()?;
        let result = self.read_unlocked();
        release(&self.path, lock.unlock(), result)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let lock = self.open_lock_file()?;
        lock.lock_exclusive()?;

        let outcome = self.read_unlocked().and_then(|mut db| {
            let value = f(&mut db)?;
            self.write_unlocked(&db)?;
            Ok(value)
        });

        if outcome.is_ok() {
            tracing::debug!("Committed transaction to {:?}", self.path);
        }
        release(&self.path, lock.unlock(), outcome)
    }
}

/// Hand back `outcome` whatever the unlock did
///
/// A commit has already happened by the time the lock is released, and the
/// lock goes away with the file handle anyway, so an unlock failure is only
/// worth a warning.
fn release<T>(path: &Path, unlocked: std::io::Result<()>, outcome: Result<T>) -> Result<T> {
    if let Err(e) = unlocked {
        tracing::warn!("Failed to release lock on {:?}: {}", path, e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlanDay, PlanDayExercise};

    fn sample_plan(id: &str) -> Plan {
        Plan {
            id: id.into(),
            name: "Upper/Lower".into(),
            duration_weeks: 4,
            deload_weeks: vec![],
            final_week_deload: true,
            days: vec![PlanDay {
                id: "upper".into(),
                name: "Upper".into(),
                day_offset: 0,
                exercises: vec![PlanDayExercise {
                    exercise_id: "bench".into(),
                    name: "Bench Press".into(),
                    sets: 3,
                    reps: 8,
                    weight: 100.0,
                    rest_seconds: 120,
                    weight_increment: 5.0,
                }],
            }],
        }
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("lift.json"));

        store
            .transaction(|db| {
                db.plans.insert("ul".into(), sample_plan("ul"));
                Ok(())
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.plan("ul").unwrap().days.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("missing.json"));
        let db = store.load().unwrap();
        assert!(db.plans.is_empty());
        assert!(db.workouts.is_empty());
    }

    #[test]
    fn test_failed_transaction_leaves_file_unchanged() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("lift.json"));
        store
            .transaction(|db| {
                db.plans.insert("ul".into(), sample_plan("ul"));
                Ok(())
            })
            .unwrap();

        let result: Result<()> = store.transaction(|db| {
            db.plans.clear();
            Err(Error::Validation("abort".into()))
        });
        assert!(result.is_err());
        assert!(store.load().unwrap().plans.contains_key("ul"));
    }

    #[test]
    fn test_corrupted_store_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("lift.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(Error::Json(_))));

        // Writers refuse too, so history is never clobbered
        let result = store.transaction(|_| Ok(()));
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ invalid json }");
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("lift.json"));
        store.transaction(|_| Ok(())).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "lift.json" && e.file_name() != "lift.lock")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only lift.json and lift.lock, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_unlock_failure_keeps_the_outcome() {
        let path = Path::new("lift.json");
        let failed = || std::io::Error::new(std::io::ErrorKind::Other, "unlock failed");

        let committed = release(path, Err(failed()), Ok(7));
        assert_eq!(committed.unwrap(), 7);

        let rejected: Result<u32> = release(
            path,
            Err(failed()),
            Err(Error::Validation("bad input".into())),
        );
        assert!(matches!(rejected, Err(Error::Validation(_))));
    }

    #[test]
    fn test_lock_is_reusable_after_transaction() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path().join("lift.json"));

        let first = store
            .transaction(|db| {
                db.plans.insert("a".into(), sample_plan("a"));
                Ok(db.plans.len())
            })
            .unwrap();
        let second = store
            .transaction(|db| {
                db.plans.insert("b".into(), sample_plan("b"));
                Ok(db.plans.len())
            })
            .unwrap();

        assert_eq!((first, second), (1, 2));
        assert_eq!(store.load().unwrap().plans.len(), 2);
    }

    #[test]
    fn test_memory_store_rollback() {
        let store = MemoryStore::new();
        store
            .transaction(|db| {
                db.plans.insert("ul".into(), sample_plan("ul"));
                Ok(())
            })
            .unwrap();

        let result: Result<()> = store.transaction(|db| {
            db.plans.insert("other".into(), sample_plan("other"));
            Err(Error::Conflict("abort".into()))
        });
        assert!(result.is_err());

        let db = store.load().unwrap();
        assert_eq!(db.plans.len(), 1);
    }

    #[test]
    fn test_arc_store_shares_state() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .transaction(|db| {
                            let id = format!("plan_{}", i);
                            db.plans.insert(id.clone(), sample_plan(&id));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.load().unwrap().plans.len(), 8);
    }

    #[test]
    fn test_not_found_lookups() {
        let db = Database::default();
        assert!(matches!(db.plan("nope"), Err(Error::NotFound(_))));
        assert!(matches!(db.mesocycle(Uuid::new_v4()), Err(Error::NotFound(_))));
        assert!(matches!(db.workout(Uuid::new_v4()), Err(Error::NotFound(_))));
    }
}
