use clap::Subcommand;
use shotcaller_core::narration::DurationModel;
use shotcaller_core::{backend_from_config, Config, Narrator, Utterance};

#[derive(Subcommand)]
pub enum VoicesAction {
    /// List the voices the configured backend offers
    List {
        #[arg(long)]
        json: bool,
    },
    /// Speak a test phrase
    Test {
        /// Phrase to speak
        #[arg(default_value = "Jab, Cross, Left Hook")]
        text: String,
        /// Voice id to test (defaults to the configured voice)
        #[arg(long)]
        voice: Option<String>,
        /// Speaking rate
        #[arg(long)]
        speed: Option<f64>,
    },
}

pub async fn run(action: VoicesAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let backend = backend_from_config(&config);
    if !backend.is_available() {
        eprintln!("no speech backend available");
        std::process::exit(1);
    }

    match action {
        VoicesAction::List { json } => {
            let narrator = Narrator::new(backend, DurationModel::default());
            let voices = narrator.voices().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&voices)?);
            } else if voices.is_empty() {
                println!("backend reports no voices");
            } else {
                for v in voices {
                    let default = if v.is_default { " (default)" } else { "" };
                    println!("{:<24} {:<8} {}{}", v.id, v.language, v.name, default);
                }
            }
        }
        VoicesAction::Test { text, voice, speed } => {
            let narrator = Narrator::new(backend, DurationModel::default());
            let utterance = Utterance::new(text)
                .with_voice(voice.or_else(|| config.session.voice.clone()))
                .with_rate(speed.unwrap_or(config.session.voice_speed));
            let outcome = narrator.speak(utterance).await?;
            println!("spoke in {} ms", outcome.duration_ms);
        }
    }
    Ok(())
}
