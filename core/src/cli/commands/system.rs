use super::{block_on, load_config, open_store, print_json, remote_screen};
use crate::cli::OutputFormat;
use crate::controls::SystemAction;
use colored::Colorize;

pub fn run(action: SystemAction, format: OutputFormat) -> Result<(), String> {
    let config = load_config()?;
    let store = open_store()?;
    let mut screen = remote_screen(&store, &config)?;

    let Some(response) = block_on(screen.system(action))? else {
        return Err(format!(
            "'{action}' was not delivered to {}",
            screen.relay().service_url()
        ));
    };

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "action": action.as_str(),
            "response": response,
            "battery": screen.battery_level(),
        }));
    } else if action == SystemAction::Battery {
        println!("{}", screen.battery_label());
    } else {
        println!("{} {action}", "✓".green());
    }
    Ok(())
}
