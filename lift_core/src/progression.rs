//! Progression logic for computing weekly exercise targets.
//!
//! Rules, applied per exercise slot:
//! - Week 1: the base configuration verbatim
//! - Normal week: +increment if the previous week was fully logged, else repeat
//! - Deload week: reduced weight and sets from the pre-deload lineage
//! - Week after a deload: resumes per the configured carry-forward policy
//!
//! Targets for week n depend only on week n-1 targets and completion.

use crate::config::{PostDeload, ProgressionConfig, WeightRounding};
use crate::{CompletionStatus, DeloadSchedule, Error, ExerciseBase, Result, WeekTargets};

/// Everything the calculator needs to produce one week's targets
#[derive(Clone, Debug)]
pub struct ProgressionInput<'a> {
    pub base: Option<&'a ExerciseBase>,
    pub week_number: u32,
    pub previous: Option<&'a WeekTargets>,
    pub previous_completion: Option<&'a CompletionStatus>,
    pub is_deload: bool,
}

/// Check that a base configuration can drive a progression
pub fn validate_base(base: &ExerciseBase) -> Result<()> {
    if !(base.weight_increment > 0.0) {
        return Err(Error::Validation(format!(
            "Weight increment must be positive, got {}",
            base.weight_increment
        )));
    }
    if base.sets == 0 || base.reps == 0 {
        return Err(Error::Validation(
            "Sets and reps must be at least 1".into(),
        ));
    }
    if !(base.weight >= 0.0) {
        return Err(Error::Validation(format!(
            "Weight must not be negative, got {}",
            base.weight
        )));
    }
    Ok(())
}

/// Compute one week's targets for one exercise
pub fn calculate_week_targets(
    input: &ProgressionInput<'_>,
    policy: &ProgressionConfig,
) -> Result<WeekTargets> {
    let base = input
        .base
        .ok_or_else(|| Error::Validation("Exercise base configuration is missing".into()))?;
    validate_base(base)?;

    let week = input.week_number;
    if week == 0 {
        return Err(Error::Validation("Week numbers start at 1".into()));
    }

    let previous = match input.previous {
        Some(previous) if week > 1 => previous,
        _ => {
            if input.is_deload {
                return Ok(deload_targets(
                    week,
                    base.weight,
                    base.sets,
                    base.reps,
                    base.weight_increment,
                    policy,
                ));
            }
            return Ok(steady_targets(week, base.weight, base.reps, base.sets));
        }
    };

    if input.is_deload {
        // Deload from the lineage so back-to-back deloads never compound
        return Ok(deload_targets(
            week,
            previous.lineage_weight,
            previous.lineage_sets,
            previous.target_reps,
            base.weight_increment,
            policy,
        ));
    }

    if previous.is_deload {
        let weight = match policy.post_deload {
            PostDeload::PreDeloadLineage => previous.lineage_weight,
            PostDeload::ContinueFromDeload => previous.target_weight,
        };
        tracing::debug!("Week {} resumes after deload at {}", week, weight);
        return Ok(steady_targets(
            week,
            weight,
            previous.target_reps,
            previous.lineage_sets,
        ));
    }

    let completed = input
        .previous_completion
        .map_or(false, |c| c.all_sets_completed);
    let weight = if completed {
        previous.target_weight + base.weight_increment
    } else {
        previous.target_weight
    };

    tracing::debug!(
        "Week {}: {} -> {} (previous week completed: {})",
        week,
        previous.target_weight,
        weight,
        completed
    );

    Ok(steady_targets(
        week,
        weight,
        previous.target_reps,
        previous.target_sets,
    ))
}

/// What a week of one exercise slot looks like in recorded history
#[derive(Clone, Debug, Default)]
pub struct ObservedWeek {
    /// How the week went; `None` counts as not completed
    pub completion: Option<CompletionStatus>,
    /// Targets already fixed by a locked workout, which later weeks build on
    pub prescribed: Option<WeekTargets>,
}

/// Chain the calculator from week 1 through `through_week`
///
/// `observe(n)` reports what is recorded for week `n`. A prescribed week
/// replaces the calculated targets so later weeks progress from what was
/// actually trained; deload weeks keep their calculated lineage.
pub fn project_weeks<F>(
    base: &ExerciseBase,
    schedule: &DeloadSchedule,
    through_week: u32,
    policy: &ProgressionConfig,
    mut observe: F,
) -> Result<Vec<WeekTargets>>
where
    F: FnMut(u32) -> ObservedWeek,
{
    let mut weeks: Vec<WeekTargets> = Vec::with_capacity(through_week as usize);
    let mut completion: Option<CompletionStatus> = None;
    for week in 1..=through_week {
        let mut targets = calculate_week_targets(
            &ProgressionInput {
                base: Some(base),
                week_number: week,
                previous: weeks.last(),
                previous_completion: completion.as_ref(),
                is_deload: schedule.is_deload(week),
            },
            policy,
        )?;

        let observed = observe(week);
        if let Some(prescribed) = observed.prescribed {
            anchor(&mut targets, &prescribed);
        }
        completion = observed.completion;
        weeks.push(targets);
    }
    Ok(weeks)
}

fn anchor(targets: &mut WeekTargets, prescribed: &WeekTargets) {
    if targets.target_weight != prescribed.target_weight
        || targets.target_sets != prescribed.target_sets
    {
        tracing::debug!(
            "Week {} anchored to recorded {} x {} (calculated {} x {})",
            targets.week_number,
            prescribed.target_sets,
            prescribed.target_weight,
            targets.target_sets,
            targets.target_weight
        );
    }
    targets.target_weight = prescribed.target_weight;
    targets.target_reps = prescribed.target_reps;
    targets.target_sets = prescribed.target_sets;
    if !targets.is_deload {
        targets.lineage_weight = prescribed.target_weight;
        targets.lineage_sets = prescribed.target_sets;
    }
}

/// Round a raw weight according to the configured policy
pub fn round_weight(raw: f64, increment: f64, rounding: WeightRounding) -> f64 {
    match rounding {
        WeightRounding::NearestWhole => raw.round(),
        WeightRounding::NearestIncrement => (raw / increment).round() * increment,
        WeightRounding::DownToIncrement => (raw / increment).floor() * increment,
    }
}

fn steady_targets(week: u32, weight: f64, reps: u32, sets: u32) -> WeekTargets {
    WeekTargets {
        week_number: week,
        target_weight: weight,
        target_reps: reps,
        target_sets: sets,
        is_deload: false,
        lineage_weight: weight,
        lineage_sets: sets,
    }
}

fn deload_targets(
    week: u32,
    weight: f64,
    sets: u32,
    reps: u32,
    increment: f64,
    policy: &ProgressionConfig,
) -> WeekTargets {
    let target_weight = round_weight(
        weight * policy.deload_weight_factor,
        increment,
        policy.deload_rounding,
    );
    let target_sets = ((f64::from(sets) * policy.deload_set_factor).ceil() as u32).max(1);

    tracing::debug!(
        "Week {} deload: {} x {} -> {} x {}",
        week,
        sets,
        weight,
        target_sets,
        target_weight
    );

    WeekTargets {
        week_number: week,
        target_weight,
        target_reps: reps,
        target_sets,
        is_deload: true,
        lineage_weight: weight,
        lineage_sets: sets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ExerciseBase {
        ExerciseBase {
            sets: 3,
            reps: 8,
            weight: 100.0,
            rest_seconds: 120,
            weight_increment: 5.0,
        }
    }

    fn status(completed: u32, prescribed: u32) -> CompletionStatus {
        CompletionStatus {
            completed_sets: completed,
            prescribed_sets: prescribed,
            all_sets_completed: completed == prescribed && prescribed > 0,
        }
    }

    fn week_after(
        previous: &WeekTargets,
        completion: Option<&CompletionStatus>,
        is_deload: bool,
        policy: &ProgressionConfig,
    ) -> WeekTargets {
        let base = base();
        calculate_week_targets(
            &ProgressionInput {
                base: Some(&base),
                week_number: previous.week_number + 1,
                previous: Some(previous),
                previous_completion: completion,
                is_deload,
            },
            policy,
        )
        .unwrap()
    }

    fn week_one() -> WeekTargets {
        let base = base();
        calculate_week_targets(
            &ProgressionInput {
                base: Some(&base),
                week_number: 1,
                previous: None,
                previous_completion: None,
                is_deload: false,
            },
            &ProgressionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_week_one_uses_base_verbatim() {
        let targets = week_one();
        assert_eq!(targets.target_weight, 100.0);
        assert_eq!(targets.target_reps, 8);
        assert_eq!(targets.target_sets, 3);
        assert!(!targets.is_deload);
    }

    #[test]
    fn test_completed_week_progresses() {
        let policy = ProgressionConfig::default();
        let week2 = week_after(&week_one(), Some(&status(3, 3)), false, &policy);
        assert_eq!(week2.target_weight, 105.0);
        assert_eq!(week2.target_reps, 8);
        assert_eq!(week2.target_sets, 3);
    }

    #[test]
    fn test_partial_week_repeats() {
        let policy = ProgressionConfig::default();
        let week2 = week_after(&week_one(), Some(&status(2, 3)), false, &policy);
        assert_eq!(week2.target_weight, 100.0);
        assert_eq!(week2.target_sets, 3);

        // Missing completion behaves like an incomplete week
        let week2 = week_after(&week_one(), None, false, &policy);
        assert_eq!(week2.target_weight, 100.0);
    }

    #[test]
    fn test_deload_week_from_120() {
        let policy = ProgressionConfig::default();
        let mut week5 = week_one();
        week5.week_number = 5;
        week5.target_weight = 120.0;
        week5.lineage_weight = 120.0;

        let week6 = week_after(&week5, Some(&status(3, 3)), true, &policy);
        assert!(week6.is_deload);
        assert_eq!(week6.target_sets, 2);
        assert_eq!(week6.target_weight, 102.0);
        assert_eq!(week6.target_reps, 8);
    }

    #[test]
    fn test_deload_rounding_policies() {
        assert_eq!(round_weight(102.0, 5.0, WeightRounding::NearestWhole), 102.0);
        assert_eq!(round_weight(102.0, 5.0, WeightRounding::NearestIncrement), 100.0);
        assert_eq!(round_weight(103.0, 5.0, WeightRounding::NearestIncrement), 105.0);
        assert_eq!(round_weight(104.0, 5.0, WeightRounding::DownToIncrement), 100.0);
        assert_eq!(round_weight(88.4, 2.5, WeightRounding::NearestIncrement), 87.5);
    }

    #[test]
    fn test_deload_never_drops_below_one_set() {
        let policy = ProgressionConfig::default();
        let mut single = week_one();
        single.target_sets = 1;
        single.lineage_sets = 1;
        let deload = week_after(&single, None, true, &policy);
        assert_eq!(deload.target_sets, 1);
    }

    #[test]
    fn test_week_after_deload_resumes_lineage() {
        let policy = ProgressionConfig::default();
        let mut week4 = week_one();
        week4.week_number = 4;
        week4.target_weight = 120.0;
        week4.lineage_weight = 120.0;

        let deload = week_after(&week4, Some(&status(3, 3)), true, &policy);
        let resumed = week_after(&deload, Some(&status(2, 2)), false, &policy);
        assert!(!resumed.is_deload);
        assert_eq!(resumed.target_weight, 120.0);
        assert_eq!(resumed.target_sets, 3);
    }

    #[test]
    fn test_week_after_deload_can_continue_from_deload() {
        let policy = ProgressionConfig {
            post_deload: PostDeload::ContinueFromDeload,
            ..ProgressionConfig::default()
        };
        let mut week4 = week_one();
        week4.week_number = 4;
        week4.target_weight = 120.0;
        week4.lineage_weight = 120.0;

        let deload = week_after(&week4, None, true, &policy);
        let resumed = week_after(&deload, Some(&status(2, 2)), false, &policy);
        assert_eq!(resumed.target_weight, 102.0);
        assert_eq!(resumed.target_sets, 3);
    }

    #[test]
    fn test_consecutive_deloads_do_not_compound() {
        let policy = ProgressionConfig::default();
        let first = week_after(&week_one(), None, true, &policy);
        let second = week_after(&first, None, true, &policy);
        assert_eq!(first.target_weight, 85.0);
        assert_eq!(second.target_weight, 85.0);
        assert_eq!(second.target_sets, 2);
    }

    #[test]
    fn test_week_one_deload() {
        let base = base();
        let targets = calculate_week_targets(
            &ProgressionInput {
                base: Some(&base),
                week_number: 1,
                previous: None,
                previous_completion: None,
                is_deload: true,
            },
            &ProgressionConfig::default(),
        )
        .unwrap();
        assert!(targets.is_deload);
        assert_eq!(targets.target_weight, 85.0);
        assert_eq!(targets.target_sets, 2);
        assert_eq!(targets.lineage_weight, 100.0);
    }

    #[test]
    fn test_validation_errors() {
        let policy = ProgressionConfig::default();
        let missing = calculate_week_targets(
            &ProgressionInput {
                base: None,
                week_number: 1,
                previous: None,
                previous_completion: None,
                is_deload: false,
            },
            &policy,
        );
        assert!(matches!(missing, Err(Error::Validation(_))));

        let mut bad = base();
        bad.weight_increment = 0.0;
        let zero_increment = calculate_week_targets(
            &ProgressionInput {
                base: Some(&bad),
                week_number: 1,
                previous: None,
                previous_completion: None,
                is_deload: false,
            },
            &policy,
        );
        assert!(matches!(zero_increment, Err(Error::Validation(_))));

        let good = base();
        let week_zero = calculate_week_targets(
            &ProgressionInput {
                base: Some(&good),
                week_number: 0,
                previous: None,
                previous_completion: None,
                is_deload: false,
            },
            &policy,
        );
        assert!(matches!(week_zero, Err(Error::Validation(_))));
    }

    #[test]
    fn test_projection_follows_completion() {
        let schedule = DeloadSchedule {
            duration_weeks: 6,
            deload_weeks: vec![],
            final_week_deload: true,
        };
        // Weeks 1, 2 and 4 fully logged; week 3 partial
        let weeks = project_weeks(&base(), &schedule, 6, &ProgressionConfig::default(), |w| {
            ObservedWeek {
                completion: match w {
                    1 | 2 | 4 => Some(status(3, 3)),
                    3 => Some(status(1, 3)),
                    _ => None,
                },
                prescribed: None,
            }
        })
        .unwrap();

        let weights: Vec<f64> = weeks.iter().map(|w| w.target_weight).collect();
        assert_eq!(weights, vec![100.0, 105.0, 110.0, 110.0, 115.0, 98.0]);
        assert!(weeks[5].is_deload);
        assert_eq!(weeks[5].target_sets, 2);
    }

    fn prescribed(week: u32, weight: f64, sets: u32) -> WeekTargets {
        WeekTargets {
            week_number: week,
            target_weight: weight,
            target_reps: 8,
            target_sets: sets,
            is_deload: false,
            lineage_weight: weight,
            lineage_sets: sets,
        }
    }

    #[test]
    fn test_recorded_targets_anchor_later_weeks() {
        let schedule = DeloadSchedule {
            duration_weeks: 4,
            deload_weeks: vec![],
            final_week_deload: false,
        };
        // Weeks 1 and 2 were both trained at 100 and fully logged
        let weeks = project_weeks(&base(), &schedule, 4, &ProgressionConfig::default(), |w| {
            match w {
                1 | 2 => ObservedWeek {
                    completion: Some(status(3, 3)),
                    prescribed: Some(prescribed(w, 100.0, 3)),
                },
                _ => ObservedWeek::default(),
            }
        })
        .unwrap();

        let weights: Vec<f64> = weeks.iter().map(|w| w.target_weight).collect();
        assert_eq!(weights, vec![100.0, 100.0, 105.0, 105.0]);
    }

    #[test]
    fn test_recorded_deload_keeps_lineage() {
        let schedule = DeloadSchedule {
            duration_weeks: 4,
            deload_weeks: vec![2],
            final_week_deload: false,
        };
        let weeks = project_weeks(&base(), &schedule, 4, &ProgressionConfig::default(), |w| {
            match w {
                1 => ObservedWeek {
                    completion: Some(status(3, 3)),
                    prescribed: Some(prescribed(1, 110.0, 3)),
                },
                2 => ObservedWeek {
                    completion: Some(status(2, 2)),
                    prescribed: Some(WeekTargets {
                        is_deload: true,
                        ..prescribed(2, 90.0, 2)
                    }),
                },
                _ => ObservedWeek::default(),
            }
        })
        .unwrap();

        assert_eq!(weeks[1].target_weight, 90.0);
        assert_eq!(weeks[1].lineage_weight, 110.0);
        assert_eq!(weeks[1].lineage_sets, 3);
        // Resumes from the week trained before the deload
        assert_eq!(weeks[2].target_weight, 110.0);
        assert_eq!(weeks[2].target_sets, 3);
    }

    #[test]
    fn test_progression_property_over_weeks() {
        let policy = ProgressionConfig::default();
        let mut previous = week_one();
        for week in 2..10u32 {
            let completed = week % 3 != 0;
            let completion = status(if completed { 3 } else { 2 }, 3);
            let next = week_after(&previous, Some(&completion), false, &policy);
            if completed {
                assert_eq!(next.target_weight, previous.target_weight + 5.0);
            } else {
                assert_eq!(next.target_weight, previous.target_weight);
            }
            previous = next;
        }
    }
}
