mod host;

use clap::{Parser, Subcommand};
use fit_core::calories::{format_clock, format_minutes};
use fit_core::snapshot;
use fit_core::*;
use host::{AutoPlan, Outcome};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "fit")]
#[command(about = "Guided workout sessions with resumable timers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available workouts
    List {
        /// Only show this category (cardio, stretch, relax, ...)
        #[arg(long)]
        category: Option<String>,
    },

    /// Run a guided workout
    Start {
        /// Workout id, as shown by `fit list`
        workout_id: String,

        /// Resume saved progress without asking
        #[arg(long, conflicts_with = "fresh")]
        resume: bool,

        /// Ignore saved progress and start over
        #[arg(long, conflicts_with = "resume")]
        fresh: bool,

        /// Run unattended (for testing) - tick without waiting, ignore stdin
        #[arg(long)]
        auto: bool,

        /// With --auto: stop after this many ticks, leaving progress saved
        #[arg(long, requires = "auto")]
        stop_after: Option<u32>,

        /// With --auto: quit after this many ticks
        #[arg(long, requires = "auto", conflicts_with = "stop_after")]
        quit_after: Option<u32>,

        /// Body weight in kg for the calorie estimate
        #[arg(long)]
        weight: Option<f64>,

        /// Do not log the finished workout
        #[arg(long)]
        no_log: bool,
    },

    /// Show saved progress, if any
    Status,

    /// Throw away saved progress
    Discard,

    /// Summarize recent workouts
    Stats {
        /// Look back this many days
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Roll up the completed-workout WAL to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

/// Where everything lives under the data directory
struct Paths {
    session_dir: PathBuf,
    wal_dir: PathBuf,
    wal_path: PathBuf,
    csv_path: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            session_dir: data_dir.join("session"),
            wal_path: wal_dir.join("completed_workouts.wal"),
            wal_dir,
            csv_path: data_dir.join("workouts.csv"),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    fit_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::List { category } => cmd_list(&data_dir, category.as_deref(), &config),
        Commands::Start {
            workout_id,
            resume,
            fresh,
            auto,
            stop_after,
            quit_after,
            weight,
            no_log,
        } => cmd_start(
            &data_dir,
            &workout_id,
            StartOptions {
                resume,
                fresh,
                auto,
                plan: AutoPlan {
                    stop_after,
                    quit_after,
                },
                weight: weight.or(config.profile.weight_kg),
                no_log,
            },
            &config,
        ),
        Commands::Status => cmd_status(&data_dir),
        Commands::Discard => cmd_discard(&data_dir),
        Commands::Stats { days } => cmd_stats(&data_dir, days),
        Commands::Rollup { cleanup } => cmd_rollup(&data_dir, cleanup),
    }
}

fn cmd_list(data_dir: &Path, category: Option<&str>, config: &Config) -> Result<()> {
    let catalog = LayeredCatalog::load(data_dir)?;
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
    }

    let workouts = match category {
        Some(c) => catalog.list_category(c),
        None => catalog.list(),
    };

    if workouts.is_empty() {
        println!("No workouts found.");
        return Ok(());
    }

    let timings = &config.session;
    for workout in workouts {
        let work: u32 = workout
            .exercises
            .iter()
            .map(|ex| resolve_duration_or(ex, timings.default_exercise_seconds))
            .sum();
        let rests = timings.break_seconds * workout.exercises.len().saturating_sub(1) as u32;

        println!(
            "{:<22} {:<26} {:<8} {:<7} {:>2} exercises  ~{}",
            workout.id,
            workout.name,
            workout.category.as_deref().unwrap_or("-"),
            workout.intensity.as_deref().unwrap_or("-"),
            workout.exercises.len(),
            format_minutes(work + rests)
        );
    }

    Ok(())
}

struct StartOptions {
    resume: bool,
    fresh: bool,
    auto: bool,
    plan: AutoPlan,
    weight: Option<f64>,
    no_log: bool,
}

fn cmd_start(data_dir: &Path, workout_id: &str, opts: StartOptions, config: &Config) -> Result<()> {
    let paths = Paths::new(data_dir);

    let catalog = LayeredCatalog::load(data_dir)?;
    let definition = match catalog.fetch(workout_id) {
        Ok(definition) => definition,
        Err(e @ Error::WorkoutNotFound(_)) => {
            eprintln!("Workout not found: {}. Try `fit list`.", workout_id);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let timings = config.session.clone();
    let mut store = FileSnapshotStore::new(&paths.session_dir);

    let pending = snapshot::pending_for(&store, &definition, &timings);
    let resume = match pending {
        Some(ref saved) if !opts.fresh => {
            opts.resume
                || opts.auto
                || prompt_yes_no(&format!(
                    "Saved progress for '{}' at exercise {} (saved {}). Resume? [Y/n] ",
                    definition.name,
                    saved.current_exercise_index + 1,
                    saved.timestamp.format("%Y-%m-%d %H:%M")
                ))?
        }
        _ => false,
    };

    if !resume {
        if let Some(other) = snapshot::peek(&store) {
            println!(
                "Discarding saved progress for '{}'.",
                other.workout_ref
            );
            snapshot::discard(&mut store)?;
        }
    }

    // Weekly totals are only refreshed once a workout actually finished
    let finished = Rc::new(Cell::new(false));
    let signal = CompletionSignal::new();
    {
        let finished = Rc::clone(&finished);
        signal.subscribe(move |workout| {
            tracing::info!("Workout '{}' finished", workout.id);
            finished.set(true);
        });
    }

    let session = match resume {
        true => WorkoutSession::restore(definition, timings, store)?,
        false => WorkoutSession::new(definition, timings, store)?,
    };
    let session = session.with_signal(signal);

    display_header(&session, resume);

    let outcome = if opts.auto {
        host::drive_auto(session, opts.plan)?
    } else {
        host::drive_interactive(session, resume)?
    };

    match outcome {
        Outcome::Completed(record) => {
            let summary = WorkoutSummary::from_record(&record, opts.weight);
            display_summary(&record, &summary);

            if opts.no_log {
                println!("\n[Not logging workout]");
            } else {
                let mut sink = JsonlSink::new(&paths.wal_path);
                sink.append(&CompletedWorkout::from_completion(&record, &summary))?;
                println!("\n✓ Workout logged!");
            }

            if finished.get() && !opts.no_log {
                let recent = load_recent_workouts(&paths.wal_path, &paths.csv_path, 7)?;
                let stats = WorkoutStats::from_workouts(&recent);
                println!(
                    "  This week: {} workouts, {} kcal",
                    stats.workouts, stats.total_calories
                );
            }
        }
        Outcome::Quit | Outcome::Cancelled => {}
        Outcome::Interrupted => {
            println!("Resume later with `fit start {}`.", workout_id);
        }
    }

    Ok(())
}

fn cmd_status(data_dir: &Path) -> Result<()> {
    let paths = Paths::new(data_dir);
    let store = FileSnapshotStore::new(&paths.session_dir);

    let Some(saved) = snapshot::peek(&store) else {
        println!("No workout in progress.");
        return Ok(());
    };

    println!("Workout in progress: {}", saved.workout_ref);
    println!("  Phase:    {:?}", saved.phase);
    println!("  Exercise: {}", saved.current_exercise_index + 1);
    match saved.phase {
        Phase::Countdown => println!("  Starts in {}s", saved.countdown_remaining),
        _ => println!("  Remaining: {}", format_clock(saved.remaining_seconds)),
    }
    println!("  Elapsed:  {}", format_minutes(saved.total_elapsed_seconds));
    println!("  Saved:    {}", saved.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    if !saved.is_running && saved.phase.is_clocked() {
        println!("  (paused)");
    }

    Ok(())
}

fn cmd_discard(data_dir: &Path) -> Result<()> {
    let paths = Paths::new(data_dir);
    let mut store = FileSnapshotStore::new(&paths.session_dir);

    let had_progress = store.load(snapshot::SESSION_KEY)?.is_some();
    snapshot::discard(&mut store)?;

    if had_progress {
        println!("✓ Saved progress discarded");
    } else {
        println!("No workout in progress.");
    }

    Ok(())
}

fn cmd_stats(data_dir: &Path, days: i64) -> Result<()> {
    let paths = Paths::new(data_dir);
    let workouts = load_recent_workouts(&paths.wal_path, &paths.csv_path, days)?;
    let stats = WorkoutStats::from_workouts(&workouts);

    println!("Last {} days", days);
    println!("  Workouts: {}", stats.workouts);
    println!("  Time:     {}", format_minutes(u32::try_from(stats.total_seconds).unwrap_or(u32::MAX)));
    println!("  Calories: {} kcal", stats.total_calories);
    if let Some(last) = stats.last_workout_at {
        println!("  Last:     {}", last.format("%Y-%m-%d %H:%M"));
    }
    if let Some(favourite) = stats.favourite {
        println!("  Favourite: {}", favourite);
    }

    Ok(())
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let paths = Paths::new(data_dir);

    if !paths.wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = fit_core::csv_rollup::wal_to_csv_and_archive(&paths.wal_path, &paths.csv_path)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", paths.csv_path.display());

    if cleanup {
        let cleaned = fit_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn display_header<S: SnapshotPort>(session: &WorkoutSession<S>, resumed: bool) {
    let definition = session.definition();

    println!("\n╭─────────────────────────────────────────╮");
    println!(
        "│  {} WORKOUT",
        definition.category.as_deref().unwrap_or("guided").to_uppercase()
    );
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", definition.name);
    if let Some(ref intensity) = definition.intensity {
        println!("  Intensity: {}", intensity);
    }
    println!();

    for (i, exercise) in definition.exercises.iter().enumerate() {
        let marker = if resumed && i < session.state().current_exercise_index {
            "✓"
        } else {
            "→"
        };
        println!(
            "  {} {:<28} {}",
            marker,
            exercise.name,
            format_clock(session.duration_of(i).unwrap_or(0))
        );
    }

    println!();
}

fn display_summary(record: &CompletionRecord, summary: &WorkoutSummary) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  WORKOUT COMPLETE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", record.workout_ref.name);
    println!("  Time:       {}", format_minutes(summary.total_seconds));
    println!("  Calories:   {} kcal", summary.total_calories);
    println!("  Completion: {}%", summary.completion_percent);
    println!();

    for exercise in &summary.exercises {
        println!(
            "  ✓ {:<28} {:>6}  {:>5.1} kcal",
            exercise.name,
            format_clock(exercise.seconds),
            exercise.calories
        );
    }
}

fn prompt_yes_no(question: &str) -> Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    Ok(!matches!(line.trim().to_lowercase().as_str(), "n" | "no"))
}
