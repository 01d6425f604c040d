use clap::Subcommand;
use shotcaller_core::{Config, ConfigError};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the full configuration
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Set a config value
    Set {
        /// Key (e.g. "rounds", "round-min", "difficulty", "speech-server")
        key: String,
        /// New value
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            set_key(&mut config, &key, &value)?;
            config.session.normalize();
            config.save()?;
            println!("ok");
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

fn set_key(config: &mut Config, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };
    let s = &mut config.session;
    match key {
        "rounds" => s.rounds_count = value.parse().map_err(|_| invalid("expected an integer".into()))?,
        "round-min" => {
            s.set_round_min(value.parse().map_err(|_| invalid("expected minutes".into()))?)
        }
        "rest-min" => {
            s.set_rest_minutes(value.parse().map_err(|_| invalid("expected minutes".into()))?)
        }
        "difficulty" => s.difficulty = value.parse()?,
        "southpaw" => s.southpaw_mode = parse_bool(value).ok_or_else(|| invalid("expected true/false".into()))?,
        "in-order" => s.read_in_order = parse_bool(value).ok_or_else(|| invalid("expected true/false".into()))?,
        "calisthenics" => s.add_calisthenics = parse_bool(value).ok_or_else(|| invalid("expected true/false".into()))?,
        "categories" => {
            s.categories = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect()
        }
        "voice" => s.voice = non_empty(value),
        "voice-speed" => {
            s.voice_speed = value.parse().map_err(|_| invalid("expected a rate".into()))?
        }
        "speech-server" => config.speech_server = non_empty(value),
        "speech-command" => config.speech_command = non_empty(value),
        other => return Err(invalid(format!("unknown key '{other}'"))),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// An empty string clears an optional key.
fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
