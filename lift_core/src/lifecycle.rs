//! Mesocycle state transitions: `pending -> active -> {completed | cancelled}`.
//!
//! Every function here runs against a working copy inside a store
//! transaction; an error leaves the stored state unchanged.

use crate::config::ProgressionConfig;
use crate::generator::{generate_workouts, GenerationRequest, GenerationSummary};
use crate::plan::require_trainable;
use crate::{Database, Error, Mesocycle, MesocycleStatus, Result};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

fn ensure_no_other_active(db: &Database, except: Option<Uuid>) -> Result<()> {
    match db.active_mesocycle() {
        Some(active) if Some(active.id) != except => Err(Error::Conflict(
            "An active mesocycle already exists".into(),
        )),
        _ => Ok(()),
    }
}

fn ensure_active(meso: &Mesocycle, action: &str) -> Result<()> {
    if meso.status != MesocycleStatus::Active {
        return Err(Error::Validation(format!(
            "Cannot {} mesocycle {}: it is {}",
            action, meso.id, meso.status
        )));
    }
    Ok(())
}

/// Create a pending mesocycle from a registered plan
pub fn create_mesocycle(
    db: &mut Database,
    plan_id: &str,
    start_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Mesocycle> {
    let plan = db.plan(plan_id)?;
    plan.ensure_valid()?;
    let layout = plan.layout();
    require_trainable(&layout)?;
    ensure_no_other_active(db, None)?;

    let meso = Mesocycle {
        id: Uuid::new_v4(),
        plan_id: plan.id.clone(),
        start_date,
        current_week: 0,
        schedule: plan.schedule(),
        status: MesocycleStatus::Pending,
        layout,
        created_at: now,
        updated_at: now,
    };
    db.mesocycles.insert(meso.id, meso.clone());

    tracing::info!(
        "Created mesocycle {} from plan '{}' starting {}",
        meso.id,
        plan_id,
        start_date
    );
    Ok(meso)
}

/// Activate a pending mesocycle and generate every week's workouts
pub fn start_mesocycle(
    db: &mut Database,
    mesocycle_id: Uuid,
    policy: &ProgressionConfig,
    now: DateTime<Utc>,
) -> Result<(Mesocycle, GenerationSummary)> {
    let meso = db.mesocycle(mesocycle_id)?.clone();
    ensure_no_other_active(db, Some(meso.id))?;
    if meso.status != MesocycleStatus::Pending {
        return Err(Error::Conflict(format!(
            "Mesocycle {} is {}, only a pending mesocycle can be started",
            meso.id, meso.status
        )));
    }
    require_trainable(&meso.layout)?;

    let summary = generate_workouts(
        db,
        &GenerationRequest {
            mesocycle_id: meso.id,
            start_date: meso.start_date,
            layout: &meso.layout,
            schedule: &meso.schedule,
            weeks: 1..=meso.duration_weeks(),
            only_day: None,
            not_before: None,
            policy,
        },
    )?;

    let stored = db.mesocycle_mut(meso.id)?;
    stored.status = MesocycleStatus::Active;
    stored.current_week = 1;
    stored.updated_at = now;

    tracing::info!(
        "Started mesocycle {}: {} workouts, {} sets",
        meso.id,
        summary.created + summary.replaced,
        summary.sets_created
    );
    Ok((stored.clone(), summary))
}

/// Move to the next week and regenerate the pending tail
///
/// Weeks after the previous one are regenerated so their targets reflect the
/// completion logged so far; locked workouts are kept as they are.
pub fn advance_week(
    db: &mut Database,
    mesocycle_id: Uuid,
    policy: &ProgressionConfig,
    now: DateTime<Utc>,
) -> Result<(Mesocycle, GenerationSummary)> {
    let meso = db.mesocycle(mesocycle_id)?.clone();
    ensure_active(&meso, "advance")?;
    if meso.current_week >= meso.duration_weeks() {
        return Err(Error::Validation(format!(
            "Mesocycle {} is already in its final week ({})",
            meso.id, meso.current_week
        )));
    }

    let next = meso.current_week + 1;
    let summary = generate_workouts(
        db,
        &GenerationRequest {
            mesocycle_id: meso.id,
            start_date: meso.start_date,
            layout: &meso.layout,
            schedule: &meso.schedule,
            weeks: next..=meso.duration_weeks(),
            only_day: None,
            not_before: None,
            policy,
        },
    )?;

    let stored = db.mesocycle_mut(meso.id)?;
    stored.current_week = next;
    stored.updated_at = now;

    tracing::info!("Mesocycle {} advanced to week {}", meso.id, next);
    Ok((stored.clone(), summary))
}

fn finish(
    db: &mut Database,
    mesocycle_id: Uuid,
    status: MesocycleStatus,
    now: DateTime<Utc>,
) -> Result<Mesocycle> {
    let action = match status {
        MesocycleStatus::Cancelled => "cancel",
        _ => "complete",
    };
    let meso = db.mesocycle_mut(mesocycle_id)?;
    ensure_active(meso, action)?;
    meso.status = status;
    meso.updated_at = now;

    tracing::info!("Mesocycle {} is now {}", meso.id, status);
    Ok(meso.clone())
}

/// Mark an active mesocycle completed; workouts are kept as history
pub fn complete_mesocycle(db: &mut Database, mesocycle_id: Uuid, now: DateTime<Utc>) -> Result<Mesocycle> {
    finish(db, mesocycle_id, MesocycleStatus::Completed, now)
}

/// Cancel an active mesocycle; workouts are kept as history
pub fn cancel_mesocycle(db: &mut Database, mesocycle_id: Uuid, now: DateTime<Utc>) -> Result<Mesocycle> {
    finish(db, mesocycle_id, MesocycleStatus::Cancelled, now)
}
