//! Session host: turns wall-clock time and stdin into engine calls.

use fit_core::calories::format_clock;
use fit_core::{
    CompletionRecord, Metronome, Phase, Result, SessionEvent, SnapshotPort, WorkoutSession,
};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// How a hosted session ended
pub enum Outcome {
    Completed(CompletionRecord),
    /// User confirmed quitting; snapshot cleared
    Quit,
    /// Host stopped driving; snapshot left for resumption
    Interrupted,
    /// Never started
    Cancelled,
}

/// Scripted stop points for unattended runs, counted in ticks
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoPlan {
    pub stop_after: Option<u32>,
    pub quit_after: Option<u32>,
}

/// Run a session without sleeping or reading input
pub fn drive_auto<S: SnapshotPort>(
    mut session: WorkoutSession<S>,
    plan: AutoPlan,
) -> Result<Outcome> {
    if session.phase() == Phase::NotStarted {
        let event = session.start()?;
        if let Some(record) = announce(&session, event) {
            return Ok(Outcome::Completed(record));
        }
    } else if session.phase().is_clocked() && session.resume()? {
        // A paused snapshot would otherwise tick as a no-op forever
        println!("Resuming paused workout.");
    }

    let mut metronome = Metronome::new(Duration::ZERO);
    let mut ticks = 0u32;

    loop {
        metronome.follow(session.tick_generation(), Instant::now());
        if !metronome.is_running() {
            return Ok(Outcome::Interrupted);
        }

        if plan.quit_after == Some(ticks) {
            session.quit()?;
            println!("Workout quit after {} ticks.", ticks);
            return Ok(Outcome::Quit);
        }
        if plan.stop_after == Some(ticks) {
            println!("Stopped after {} ticks; progress saved.", ticks);
            return Ok(Outcome::Interrupted);
        }

        for _ in 0..metronome.take_due(Instant::now()) {
            ticks += 1;
            let event = session.tick()?;
            if let Some(record) = announce(&session, event) {
                return Ok(Outcome::Completed(record));
            }
        }
    }
}

/// Run a session against the real clock, reading commands from stdin
pub fn drive_interactive<S: SnapshotPort>(
    mut session: WorkoutSession<S>,
    resumed: bool,
) -> Result<Outcome> {
    let inputs = spawn_stdin_reader();

    if session.phase() == Phase::NotStarted {
        println!("Press Enter to start, 'q' + Enter to cancel.");
        match inputs.recv() {
            Ok(line) if line == "q" => return Ok(Outcome::Cancelled),
            Ok(_) => {
                let event = session.start()?;
                if let Some(record) = announce(&session, event) {
                    return Ok(Outcome::Completed(record));
                }
            }
            Err(_) => return Ok(Outcome::Cancelled),
        }
    } else if resumed && session.pause()? {
        println!("Resumed paused. 'p' + Enter to continue.");
    }

    print_controls();

    let mut metronome = Metronome::new(Duration::from_secs(1));
    let mut input_open = true;

    loop {
        let now = Instant::now();
        metronome.follow(session.tick_generation(), now);
        let wait = metronome
            .time_until_due(now)
            .unwrap_or(Duration::from_millis(250));

        if input_open {
            match inputs.recv_timeout(wait) {
                Ok(line) => match line.as_str() {
                    "p" => {
                        if !session.toggle_pause()? {
                            println!("\n(pause is disabled during the countdown)");
                        }
                        render(&session);
                    }
                    "s" => {
                        if session.phase() == Phase::Countdown {
                            println!("\n(skip is disabled during the countdown)");
                        }
                        let event = session.skip()?;
                        if let Some(record) = announce(&session, event) {
                            return Ok(Outcome::Completed(record));
                        }
                    }
                    "q" => {
                        if confirm_quit(&inputs) {
                            session.quit()?;
                            println!("Workout quit. Progress discarded.");
                            return Ok(Outcome::Quit);
                        }
                        render(&session);
                    }
                    _ => {}
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => input_open = false,
            }
        } else {
            std::thread::sleep(wait);
        }

        let due = metronome.take_due(Instant::now());
        let generation = session.tick_generation();
        for _ in 0..due {
            let event = session.tick()?;
            let changed_phase = event.is_some();
            if let Some(record) = announce(&session, event) {
                return Ok(Outcome::Completed(record));
            }
            if !changed_phase {
                render(&session);
            }
            // Late ticks belong to the phase that just ended
            if session.tick_generation() != generation {
                break;
            }
        }
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line.trim().to_lowercase()).is_err() {
                break;
            }
        }
    });
    rx
}

fn confirm_quit(inputs: &Receiver<String>) -> bool {
    print!("\nQuit workout? Progress will be lost. [y/N] ");
    let _ = io::stdout().flush();
    matches!(inputs.recv().as_deref(), Ok("y") | Ok("yes"))
}

fn print_controls() {
    println!("─────────────────────────────────────────");
    println!("  'p' + Enter  pause / resume");
    println!("  's' + Enter  skip");
    println!("  'q' + Enter  quit");
    println!("─────────────────────────────────────────");
}

/// Print a phase change. Returns the record when the session completed.
fn announce<S: SnapshotPort>(
    session: &WorkoutSession<S>,
    event: Option<SessionEvent>,
) -> Option<CompletionRecord> {
    let total = session.definition().exercises.len();
    let name_of = |index: usize| {
        session
            .definition()
            .exercises
            .get(index)
            .map(|ex| ex.name.clone())
            .unwrap_or_default()
    };

    match event? {
        SessionEvent::CountdownStarted { index } => {
            println!(
                "\nGet ready: {} (exercise {}/{})",
                name_of(index),
                index + 1,
                total
            );
            None
        }
        SessionEvent::WorkStarted { index } => {
            let seconds = session.duration_of(index).unwrap_or(0);
            println!("Go! {} for {}", name_of(index), format_clock(seconds));
            None
        }
        SessionEvent::BreakStarted { finished, next } => {
            println!(
                "\n✓ {} done. Rest {}s, next up: {}",
                name_of(finished),
                session.timings().break_seconds,
                name_of(next)
            );
            None
        }
        SessionEvent::Completed(record) => {
            println!("\n✓ Workout complete!");
            Some(record)
        }
    }
}

fn render<S: SnapshotPort>(session: &WorkoutSession<S>) {
    let state = session.state();
    let label = match state.phase {
        Phase::Countdown => format!("GET READY {}", state.countdown_remaining),
        Phase::Working => format!(
            "WORK {}  {}",
            format_clock(state.remaining_seconds),
            session.current_exercise().map(|e| e.name.as_str()).unwrap_or("")
        ),
        Phase::OnBreak => format!(
            "REST {}  next: {}",
            format_clock(state.remaining_seconds),
            session.next_exercise().map(|e| e.name.as_str()).unwrap_or("finish")
        ),
        Phase::NotStarted | Phase::Completed => return,
    };
    let paused = if state.phase.is_clocked() && !state.is_running {
        "  [paused]"
    } else {
        ""
    };

    print!("\r{:<64}", format!("{}{}", label, paused));
    let _ = io::stdout().flush();
}
