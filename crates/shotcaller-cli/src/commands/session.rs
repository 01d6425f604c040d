use std::io::Write;
use std::sync::Arc;

use clap::Subcommand;
use shotcaller_core::narration::DurationModel;
use shotcaller_core::settings::data_dir;
use shotcaller_core::{
    backend_from_config, builtin, Config, Event, Narrator, NullBackend, Session, WorkoutRecord,
};
use tokio::sync::broadcast;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session with the configured (or overridden) settings
    Run {
        /// Number of rounds
        #[arg(long)]
        rounds: Option<u32>,
        /// Round length in minutes (0.25 steps)
        #[arg(long)]
        round_min: Option<f64>,
        /// Rest length in minutes (0.25 steps)
        #[arg(long)]
        rest_min: Option<f64>,
        /// Callout cadence tier: easy, medium, hard
        #[arg(long)]
        difficulty: Option<String>,
        /// Technique categories to draw from (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Mirror Left/Right in every callout
        #[arg(long)]
        southpaw: bool,
        /// Read the pool in order instead of randomly
        #[arg(long)]
        in_order: bool,
        /// Mix calisthenics prompts into the pool
        #[arg(long)]
        calisthenics: bool,
        /// Backend voice id
        #[arg(long)]
        voice: Option<String>,
        /// Speaking rate, 0.8 to 2.5
        #[arg(long)]
        speed: Option<f64>,
        /// Run without any speech backend (timer only)
        #[arg(long)]
        silent: bool,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Resume the most recent unfinished workout from the log
    Resume {
        #[arg(long)]
        silent: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show the workout log
    Log {
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            rounds,
            round_min,
            rest_min,
            difficulty,
            categories,
            southpaw,
            in_order,
            calisthenics,
            voice,
            speed,
            silent,
            json,
        } => {
            let mut config = Config::load()?;
            let settings = &mut config.session;
            if let Some(rounds) = rounds {
                settings.rounds_count = rounds;
            }
            if let Some(minutes) = round_min {
                settings.set_round_min(minutes);
            }
            if let Some(minutes) = rest_min {
                settings.set_rest_minutes(minutes);
            }
            if let Some(tier) = difficulty {
                settings.difficulty = tier.parse()?;
            }
            if !categories.is_empty() {
                settings.categories = categories;
            }
            if southpaw {
                settings.southpaw_mode = true;
            }
            if in_order {
                settings.read_in_order = true;
            }
            if calisthenics {
                settings.add_calisthenics = true;
            }
            if voice.is_some() {
                settings.voice = voice;
            }
            if let Some(speed) = speed {
                settings.voice_speed = speed;
            }
            settings.normalize();

            let session = build_session(&config, silent)?;
            session.start().await?;
            drive(session, json).await
        }
        SessionAction::Resume { silent, json } => {
            let record = last_unfinished_record()?.ok_or("no unfinished workout in the log")?;
            let mut config = Config::load()?;
            // Replay the settings the workout was logged with, not
            // whatever the config says today. The headline fields win
            // over the nested settings for log lines predating them.
            config.session = record.settings.clone();
            config.session.rounds_count = record.rounds_planned;
            config.session.set_round_min(record.round_length_min);
            config.session.set_rest_minutes(record.rest_minutes);
            config.session.difficulty = record.difficulty;
            if !record.categories.is_empty() {
                config.session.categories = record.categories.clone();
            }
            config.session.normalize();

            let session = build_session(&config, silent)?;
            session.resume_from(&record).await?;
            eprintln!(
                "resuming at round {} of {}",
                record.rounds_completed + 1,
                record.rounds_planned
            );
            drive(session, json).await
        }
        SessionAction::Log { json } => {
            let records = read_log()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("no workouts logged");
            } else {
                for r in &records {
                    println!(
                        "{}  {}/{} rounds  {}  {} shots  [{}]",
                        r.timestamp.format("%Y-%m-%d %H:%M"),
                        r.rounds_completed,
                        r.rounds_planned,
                        r.difficulty,
                        r.shots_called_out,
                        r.categories.join(", "),
                    );
                }
            }
            Ok(())
        }
    }
}

fn build_session(config: &Config, silent: bool) -> Result<Session, Box<dyn std::error::Error>> {
    let backend = if silent {
        Arc::new(NullBackend) as Arc<dyn shotcaller_core::SpeechBackend>
    } else {
        backend_from_config(config)
    };
    if !silent && !backend.is_available() {
        eprintln!("no speech backend available, running silent");
    }
    let narrator = Narrator::new(backend, DurationModel::default());
    Ok(Session::new(config.session.clone(), &builtin(), narrator)?)
}

/// Print the event stream until the session completes or Ctrl-C stops it.
/// Either way the workout record lands in the log.
async fn drive(session: Session, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = session.subscribe();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    print_event(&event, json)?;
                    if matches!(event, Event::WorkoutCompleted { .. }) {
                        // Give the announcer a beat to queue the closing
                        // line, then let it finish before the stop.
                        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
                        session.narrator().wait_idle().await;
                        let record = session.stop().await;
                        append_record(&record)?;
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let record = session.stop().await;
                append_record(&record)?;
                if json {
                    println!("{}", serde_json::to_string(&record)?);
                } else {
                    println!(
                        "stopped: {}/{} rounds, {} shots called",
                        record.rounds_completed, record.rounds_planned, record.shots_called_out
                    );
                }
                break;
            }
        }
    }
    Ok(())
}

fn print_event(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::PreRoundStarted { round, countdown_secs, .. } => {
            println!("get ready: round {round} in {countdown_secs} s")
        }
        Event::RoundStarted { round, duration_secs, .. } => {
            println!("round {round} ({duration_secs} s)")
        }
        Event::RoundEnded { round, .. } => println!("round {round} done"),
        Event::RestStarted { duration_secs, .. } => println!("rest ({duration_secs} s)"),
        Event::RestWarning { .. } => println!("  10 seconds"),
        Event::RestBell { .. } => println!("  5 seconds"),
        Event::RestEnded { next_round, .. } => println!("rest over, round {next_round} next"),
        Event::WorkoutCompleted { rounds_completed, .. } => {
            println!("workout complete: {rounds_completed} rounds")
        }
        Event::SessionPaused { .. } => println!("paused"),
        Event::SessionResumed { .. } => println!("resumed"),
        Event::SessionStopped { .. } => {}
        Event::CalloutSpoken { text, .. } => println!("  > {text}"),
        Event::NarrationFailed { message, .. } => eprintln!("narration failed: {message}"),
        Event::InterruptionDetected { reason, .. } => println!("interrupted: {reason}"),
        Event::InterruptionCleared { .. } => println!("interruption cleared (still paused)"),
    }
    Ok(())
}

fn log_path() -> Result<std::path::PathBuf, std::io::Error> {
    Ok(data_dir()?.join("workouts.jsonl"))
}

fn append_record(record: &WorkoutRecord) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path()?)?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

fn read_log() -> Result<Vec<WorkoutRecord>, Box<dyn std::error::Error>> {
    let path = log_path()?;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        records.push(serde_json::from_str(line)?);
    }
    Ok(records)
}

fn last_unfinished_record() -> Result<Option<WorkoutRecord>, Box<dyn std::error::Error>> {
    Ok(read_log()?
        .into_iter()
        .rev()
        .find(|r| !r.is_complete()))
}
