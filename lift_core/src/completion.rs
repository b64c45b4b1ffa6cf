//! Completion evaluation for an exercise slot in a week.
//!
//! A set counts once both its actual weight and actual reps are logged,
//! whether or not they met the target.

use crate::{CompletionStatus, Workout, WorkoutSet};

/// Evaluate completion from a prescribed count and the logged rows
pub fn evaluate_completion<'a, I>(prescribed_sets: u32, sets: I) -> CompletionStatus
where
    I: IntoIterator<Item = &'a WorkoutSet>,
{
    let completed_sets = sets.into_iter().filter(|s| s.is_logged()).count() as u32;
    CompletionStatus {
        completed_sets,
        prescribed_sets,
        all_sets_completed: prescribed_sets > 0 && completed_sets == prescribed_sets,
    }
}

/// Evaluate one exercise within a workout, using its set rows as the prescription
pub fn evaluate_workout_exercise(workout: &Workout, exercise_id: &str) -> CompletionStatus {
    let prescribed = workout.sets_for(exercise_id).count() as u32;
    evaluate_completion(prescribed, workout.sets_for(exercise_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn set(number: u32, weight: Option<f64>, reps: Option<u32>) -> WorkoutSet {
        WorkoutSet {
            id: Uuid::new_v4(),
            exercise_id: "bench".into(),
            exercise_name: "Bench Press".into(),
            set_number: number,
            target_weight: 100.0,
            target_reps: 8,
            rest_seconds: 120,
            actual_weight: weight,
            actual_reps: reps,
            logged_at: None,
        }
    }

    #[test]
    fn test_all_sets_logged() {
        let sets = vec![
            set(1, Some(100.0), Some(8)),
            set(2, Some(100.0), Some(8)),
            set(3, Some(100.0), Some(8)),
        ];
        let status = evaluate_completion(3, &sets);
        assert_eq!(status.completed_sets, 3);
        assert!(status.all_sets_completed);
    }

    #[test]
    fn test_partial_logging() {
        let sets = vec![
            set(1, Some(100.0), Some(8)),
            set(2, Some(100.0), Some(8)),
            set(3, None, None),
        ];
        let status = evaluate_completion(3, &sets);
        assert_eq!(status.completed_sets, 2);
        assert!(!status.all_sets_completed);
    }

    #[test]
    fn test_missed_target_still_counts() {
        // Logged 5 reps at lower weight against a target of 8 @ 100
        let sets = vec![set(1, Some(90.0), Some(5))];
        let status = evaluate_completion(1, &sets);
        assert!(status.all_sets_completed);
    }

    #[test]
    fn test_half_logged_set_does_not_count() {
        let sets = vec![set(1, Some(100.0), None), set(2, None, Some(8))];
        let status = evaluate_completion(2, &sets);
        assert_eq!(status.completed_sets, 0);
    }

    #[test]
    fn test_zero_prescribed_is_never_complete() {
        let status = evaluate_completion(0, &[]);
        assert_eq!(status, CompletionStatus::default());
        assert!(!status.all_sets_completed);
    }
}
