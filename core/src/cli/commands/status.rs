use super::{load, open_store, print_json};
use crate::cli::OutputFormat;
use crate::session::token::{expires_at, is_token_expired};
use crate::session::{load_session, Bootstrap, Location, Route};
use colored::Colorize;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn run(format: OutputFormat) -> Result<(), String> {
    let store = open_store()?;
    let session = load_session(&store);
    let now = SystemTime::now();

    let connected = session
        .as_ref()
        .is_some_and(|s| !is_token_expired(Some(s.auth_token.as_str()), now));
    let expiry = session.as_ref().and_then(|s| expires_at(&s.auth_token));

    let mut bootstrap = Bootstrap::new();
    let (location, transition) = load(&mut bootstrap, &store, Location::route(Route::Root));

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "connected": connected,
            "serviceUrl": session.as_ref().map(|s| s.service_url.as_str()),
            "expiresAt": expiry,
            "route": location.path,
            "state": transition.state,
            "sessionFile": store.path(),
        }));
        return Ok(());
    }

    match (&session, connected) {
        (Some(session), true) => {
            println!("{} Connected to {}", "✓".green(), session.service_url.cyan());
            if let Some(exp) = expiry {
                let now_secs = now
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                println!("  Token expires in {}", format_remaining(exp.saturating_sub(now_secs)));
            }
        }
        (Some(session), false) => {
            println!(
                "{} Token for {} has expired",
                "✗".red(),
                session.service_url.cyan()
            );
            println!("  Open a fresh connect link from the companion to pair again");
        }
        (None, _) => {
            println!("{} Not connected", "✗".red());
            println!("  Run `remote connect <LINK>` with the link the companion displays");
        }
    }
    println!("  {}", format!("Session file: {}", store.path().display()).dimmed());

    Ok(())
}

/// Coarse human-readable duration, e.g. "2d 3h", "5h 12m", "42s".
fn format_remaining(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "0s");
        assert_eq!(format_remaining(42), "42s");
        assert_eq!(format_remaining(600), "10m");
        assert_eq!(format_remaining(5 * 3_600 + 12 * 60 + 9), "5h 12m");
        assert_eq!(format_remaining(2 * 86_400 + 3 * 3_600), "2d 3h");
    }
}
