use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "shotcaller", version, about = "Voice-driven round timer for striking workouts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Training sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Technique library
    Techniques {
        #[command(subcommand)]
        action: commands::techniques::TechniquesAction,
    },
    /// Speech voices
    Voices {
        #[command(subcommand)]
        action: commands::voices::VoicesAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action).await,
        Commands::Techniques { action } => commands::techniques::run(action),
        Commands::Voices { action } => commands::voices::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
