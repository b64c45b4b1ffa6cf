use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lift_core::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "meso")]
#[command(about = "Progressive-overload mesocycle planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Print a JSON envelope instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage training plans
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },

    /// Create a pending mesocycle from a plan
    Create {
        #[arg(long)]
        plan: String,

        /// First day of week 1 (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
    },

    /// Start a pending mesocycle and generate its workouts
    Start { id: Uuid },

    /// Move the active mesocycle to its next week
    Advance { id: Option<Uuid> },

    /// Mark the active mesocycle completed
    Complete { id: Option<Uuid> },

    /// Cancel the active mesocycle
    Cancel { id: Option<Uuid> },

    /// Show next week's targets without changing anything
    Preview { id: Option<Uuid> },

    /// List scheduled workouts
    Workouts {
        id: Option<Uuid>,

        #[arg(long)]
        week: Option<u32>,
    },

    /// Log one set of a workout
    Log {
        workout: Uuid,

        #[arg(long)]
        exercise: String,

        #[arg(long)]
        set: u32,

        #[arg(long)]
        weight: f64,

        #[arg(long)]
        reps: u32,
    },

    /// Mark a workout completed
    Finish { workout: Uuid },

    /// Export a mesocycle's sets to CSV
    Export {
        id: Option<Uuid>,

        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Register a new plan from a TOML or JSON file
    Add { file: PathBuf },

    /// Replace an existing plan, updating upcoming workouts of its active mesocycle
    Edit { file: PathBuf },

    /// Show a registered plan
    Show { id: String },

    /// List registered plans
    List,
}

type FilePlanner = Planner<FileStore, JsonlJournal>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    lift_core::logging::init_with_level(lift_core::logging::level_for_verbosity(cli.verbose));

    match open_planner(&cli) {
        Ok(mut planner) => run(&mut planner, cli.command, cli.json),
        Err(e) => report::<()>(cli.json, Err(e), |_| {}),
    }
}

fn open_planner(cli: &Cli) -> Result<FilePlanner> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let planner = Planner::open(&data_dir, config.progression)?;
    Ok(match cli.today {
        Some(today) => planner.with_clock(FixedClock { today }),
        None => planner,
    })
}

/// Print the outcome and map it to an exit code
fn report<T: Serialize>(json: bool, result: Result<T>, render: impl FnOnce(&T)) -> ExitCode {
    let code = if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    if json {
        let envelope = Envelope::from(result);
        match serde_json::to_string_pretty(&envelope) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        match result {
            Ok(value) => render(&value),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    code
}

fn target(planner: &FilePlanner, id: Option<Uuid>) -> Result<Uuid> {
    match id {
        Some(id) => Ok(id),
        None => Ok(planner.active_mesocycle()?.id),
    }
}

fn run(planner: &mut FilePlanner, command: Commands, json: bool) -> ExitCode {
    match command {
        Commands::Plan { command } => run_plan(planner, command, json),
        Commands::Create { plan, start } => report(
            json,
            planner.create_mesocycle(&plan, start),
            display_mesocycle,
        ),
        Commands::Start { id } => report(json, planner.start_mesocycle(id), display_mesocycle),
        Commands::Advance { id } => report(
            json,
            target(planner, id).and_then(|id| planner.advance_week(id)),
            display_mesocycle,
        ),
        Commands::Complete { id } => report(
            json,
            target(planner, id).and_then(|id| planner.complete_mesocycle(id)),
            display_mesocycle,
        ),
        Commands::Cancel { id } => report(
            json,
            target(planner, id).and_then(|id| planner.cancel_mesocycle(id)),
            display_mesocycle,
        ),
        Commands::Preview { id } => report(
            json,
            target(planner, id).and_then(|id| planner.get_next_week_preview(id)),
            display_preview,
        ),
        Commands::Workouts { id, week } => report(
            json,
            target(planner, id).and_then(|id| planner.workouts(id, week)),
            |workouts| {
                for workout in workouts {
                    display_workout(workout);
                }
            },
        ),
        Commands::Log {
            workout,
            exercise,
            set,
            weight,
            reps,
        } => {
            let entry = SetEntry {
                workout_id: workout,
                exercise_id: exercise,
                set_number: set,
                weight,
                reps,
            };
            report(json, planner.log_set(&entry), |workout| {
                println!(
                    "✓ Logged {} set {}: {} x {}",
                    entry.exercise_id, entry.set_number, entry.weight, entry.reps
                );
                display_workout(workout);
            })
        }
        Commands::Finish { workout } => report(json, planner.complete_workout(workout), |w| {
            let logged = w.sets.iter().filter(|s| s.is_logged()).count();
            println!(
                "✓ Workout completed ({}/{} sets logged)",
                logged,
                w.sets.len()
            );
        }),
        Commands::Export { id, out } => report(
            json,
            target(planner, id).and_then(|id| planner.export_history(id, &out)),
            |rows| println!("✓ Exported {} sets to {}", rows, out.display()),
        ),
    }
}

fn run_plan(planner: &mut FilePlanner, command: PlanCommand, json: bool) -> ExitCode {
    match command {
        PlanCommand::Add { file } => report(
            json,
            load_plan(&file).and_then(|plan| planner.register_plan(plan)),
            display_plan,
        ),
        PlanCommand::Edit { file } => report(
            json,
            load_plan(&file).and_then(|plan| planner.update_plan(plan)),
            display_modification,
        ),
        PlanCommand::Show { id } => report(json, planner.plan(&id), display_plan),
        PlanCommand::List => report(json, planner.plans(), |plans| {
            if plans.is_empty() {
                println!("No plans registered.");
            }
            for plan in plans {
                println!(
                    "{}  {} ({} weeks, {} days)",
                    plan.id,
                    plan.name,
                    plan.duration_weeks,
                    plan.days.len()
                );
            }
        }),
    }
}

fn display_plan(plan: &Plan) {
    println!("{} ({})", plan.name, plan.id);
    let schedule = plan.schedule();
    let deloads: Vec<String> = (1..=plan.duration_weeks)
        .filter(|w| schedule.is_deload(*w))
        .map(|w| w.to_string())
        .collect();
    println!(
        "  {} weeks, deload weeks: {}",
        plan.duration_weeks,
        if deloads.is_empty() {
            "none".to_string()
        } else {
            deloads.join(", ")
        }
    );
    for day in &plan.days {
        println!();
        println!("  {} [{}] (day +{})", day.name, day.id, day.day_offset);
        for exercise in &day.exercises {
            println!(
                "    {:<20} {}x{} @ {} (+{}, rest {}s)",
                exercise.name,
                exercise.sets,
                exercise.reps,
                exercise.weight,
                exercise.weight_increment,
                exercise.rest_seconds
            );
        }
    }
}

fn display_mesocycle(meso: &Mesocycle) {
    println!("Mesocycle {}", meso.id);
    println!("  Plan:   {}", meso.plan_id);
    println!("  Status: {}", meso.status);
    println!("  Start:  {}", meso.start_date);
    println!("  Week:   {}/{}", meso.current_week, meso.duration_weeks());
}

fn display_preview(preview: &NextWeekPreview) {
    println!(
        "Week {}{}",
        preview.week_number,
        if preview.is_deload { " (deload)" } else { "" }
    );
    for exercise in &preview.exercises {
        println!(
            "  {:<10} {:<20} {}x{} @ {}  {}",
            exercise.day_id,
            exercise.exercise_name,
            exercise.target_sets,
            exercise.target_reps,
            exercise.target_weight,
            if exercise.will_progress {
                "↑ progressing"
            } else {
                "= holding"
            }
        );
    }
}

fn display_workout(workout: &Workout) {
    println!();
    println!(
        "{} week {} {}{} [{}]",
        workout.scheduled_date,
        workout.week_number,
        workout.day_name,
        if workout.is_deload { " (deload)" } else { "" },
        workout.status
    );
    println!("  id: {}", workout.id);
    for set in &workout.sets {
        let actual = match (set.actual_weight, set.actual_reps) {
            (Some(weight), Some(reps)) => format!("{} x {}", weight, reps),
            _ => "-".to_string(),
        };
        println!(
            "  {:<20} #{} target {} x {}  actual {}",
            set.exercise_name, set.set_number, set.target_weight, set.target_reps, actual
        );
    }
}

fn display_modification(result: &ModificationResult) {
    println!("✓ Plan updated");
    println!("  Workouts affected: {}", result.affected_workout_count);
    println!("  Sets added:        {}", result.added_sets_count);
    println!("  Sets removed:      {}", result.removed_sets_count);
    println!("  Sets modified:     {}", result.modified_sets_count);
    for warning in &result.warnings {
        println!("  ⚠ {}", warning);
    }
}
