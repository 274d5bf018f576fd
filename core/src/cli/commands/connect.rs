use super::{block_on, load, load_config, open_store, print_json};
use crate::cli::OutputFormat;
use crate::connect::ConnectForm;
use crate::error::AppError;
use crate::session::{load_session, Bootstrap, BootstrapState, Location};
use colored::Colorize;

pub fn run(link: &str, device_name: Option<String>, format: OutputFormat) -> Result<(), String> {
    let config = load_config()?;
    let store = open_store()?;
    let location = Location::parse(link).map_err(|e| format!("Invalid connect link: {e}"))?;

    let mut bootstrap = Bootstrap::new();
    let (_, transition) = load(&mut bootstrap, &store, location);

    if transition.state == BootstrapState::Authenticated {
        let service_url = load_session(&store).map(|s| s.service_url);
        if format == OutputFormat::Json {
            print_json(&serde_json::json!({
                "connected": true,
                "alreadyConnected": true,
                "serviceUrl": service_url,
            }));
        } else {
            println!(
                "{} Already connected to {}",
                "→".dimmed(),
                service_url.unwrap_or_default().cyan()
            );
            println!("  Run `remote logout` first to pair with a different link");
        }
        return Ok(());
    }

    // A missing parameter latches the handshake error; nothing is submitted.
    let Some(context) = bootstrap.handshake().cloned() else {
        return Err(AppError::Handshake.into());
    };

    let mut form = ConnectForm::new(device_name.unwrap_or_else(|| config.default_device_name()));
    let outcome = block_on(form.submit(&context, &store, config.request_timeout()))?;

    let Some(outcome) = outcome else {
        let message = form
            .error()
            .unwrap_or("connect request was not sent")
            .to_owned();
        return Err(AppError::Connect { message }.into());
    };

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "connected": true,
            "alreadyConnected": false,
            "deviceName": form.device_name(),
            "serviceUrl": outcome.session.service_url,
            "redirect": outcome.redirect.path(),
        }));
    } else {
        println!(
            "{} Connected to {} as '{}'",
            "✓".green(),
            outcome.session.service_url.cyan(),
            form.device_name()
        );
    }

    Ok(())
}
