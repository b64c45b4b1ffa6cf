//! CSV export of a mesocycle's training history.
//!
//! One row per set, prescribed and actual values side by side. The file is
//! written to a temporary sibling, synced, then renamed into place so a crash
//! never leaves a half-written export behind.

use crate::{Database, Result, Workout, WorkoutSet};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    week: u32,
    date: String,
    day: &'a str,
    deload: bool,
    workout_status: String,
    exercise_id: &'a str,
    exercise: &'a str,
    set: u32,
    target_weight: f64,
    target_reps: u32,
    actual_weight: Option<f64>,
    actual_reps: Option<u32>,
    logged_at: Option<String>,
}

impl<'a> CsvRow<'a> {
    fn new(workout: &'a Workout, set: &'a WorkoutSet) -> Self {
        CsvRow {
            week: workout.week_number,
            date: workout.scheduled_date.to_string(),
            day: &workout.day_name,
            deload: workout.is_deload,
            workout_status: workout.status.to_string(),
            exercise_id: &set.exercise_id,
            exercise: &set.exercise_name,
            set: set.set_number,
            target_weight: set.target_weight,
            target_reps: set.target_reps,
            actual_weight: set.actual_weight,
            actual_reps: set.actual_reps,
            logged_at: set.logged_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Write every set of a mesocycle to `path`, returning the number of rows
pub fn export_history(db: &Database, mesocycle_id: Uuid, path: &Path) -> Result<usize> {
    db.mesocycle(mesocycle_id)?;
    let workouts = db.workouts_for(mesocycle_id);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let temp = NamedTempFile::new_in(dir)?;
    let mut writer = csv::Writer::from_writer(temp);
    let mut rows = 0;
    for workout in &workouts {
        for set in &workout.sets {
            writer.serialize(CsvRow::new(workout, set))?;
            rows += 1;
        }
    }

    writer.flush()?;
    let temp = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    tracing::info!(
        "Exported {} sets of mesocycle {} to {}",
        rows,
        mesocycle_id,
        path.display()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgressionConfig;
    use crate::generator::{generate_workouts, GenerationRequest};
    use crate::test_utils::*;
    use crate::{Error, MesocycleStatus};

    #[test]
    fn test_export_writes_one_row_per_set() {
        let plan = plan("ul", 2, false, upper_lower_layout());
        let meso = mesocycle(&plan, MesocycleStatus::Active);
        let mut db = Database::default();
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
                policy: &ProgressionConfig::default(),
            },
        )
        .unwrap();
        db.mesocycles.insert(meso.id, meso.clone());
        complete_slot(&mut db, meso.id, "upper", 1, 2);

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");
        let rows = export_history(&db, meso.id, &path).unwrap();
        assert_eq!(rows, 20);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "week");
        assert_eq!(&headers[10], "actual_weight");

        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 20);
        // First row: week 1 upper, bench set 1, logged
        assert_eq!(&records[0][0], "1");
        assert_eq!(&records[0][1], "2026-01-05");
        assert_eq!(&records[0][5], "bench");
        assert_eq!(&records[0][10], "100.0");
        // Third bench set was not logged
        assert_eq!(&records[2][10], "");
    }

    #[test]
    fn test_export_unknown_mesocycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.csv");
        let result = export_history(&Database::default(), Uuid::new_v4(), &path);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!path.exists());
    }
}
