use super::{open_store, print_json};
use crate::cli::OutputFormat;
use crate::error::AppError;
use crate::session::{clean_token, load_session};
use colored::Colorize;

pub fn run(format: OutputFormat) -> Result<(), String> {
    let store = open_store()?;
    let had_session = load_session(&store).is_some();
    clean_token(&store).map_err(AppError::from)?;

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "message": "Session cleared",
            "hadSession": had_session,
        }));
    } else if had_session {
        println!("{} Session cleared", "✓".green());
    } else {
        println!("{} No session was stored", "→".dimmed());
    }
    Ok(())
}
