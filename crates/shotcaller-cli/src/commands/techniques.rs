use clap::Subcommand;
use shotcaller_core::{builtin, style_catalog};

#[derive(Subcommand)]
pub enum TechniquesAction {
    /// List styles, or the techniques of one style
    List {
        /// Style key (e.g. "boxing", "tae"); omit to list all styles
        category: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TechniquesAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TechniquesAction::List { category, json } => {
            let library = builtin();
            match category {
                Some(key) => {
                    let Some(group) = library.get(&key) else {
                        eprintln!("unknown style: {key}");
                        std::process::exit(1);
                    };
                    if json {
                        println!("{}", serde_json::to_string_pretty(group)?);
                    } else {
                        for item in group.items() {
                            println!("{}", item.text());
                        }
                    }
                }
                None => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&style_catalog())?);
                    } else {
                        for style in style_catalog() {
                            let count = library.get(style.key).map_or(0, |g| g.len());
                            println!("{:<14} {:>3} techniques  {}", style.key, count, style.label);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
