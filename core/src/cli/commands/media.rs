use super::{block_on, load_config, open_store, print_json, remote_screen};
use crate::cli::OutputFormat;
use crate::controls::MediaAction;
use colored::Colorize;

pub fn run(action: MediaAction, format: OutputFormat) -> Result<(), String> {
    let config = load_config()?;
    let store = open_store()?;
    let screen = remote_screen(&store, &config)?;

    if !block_on(screen.media(action))? {
        return Err(format!(
            "'{action}' was not delivered to {}",
            screen.relay().service_url()
        ));
    }

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "action": action.as_str(),
            "delivered": true,
        }));
    } else {
        println!("{} {action}", "✓".green());
    }
    Ok(())
}
