pub mod connect;
pub mod logout;
pub mod media;
pub mod record;
pub mod shell;
pub mod status;
pub mod stream;
pub mod system;

use crate::config::Config;
use crate::controls::RemoteScreen;
use crate::error::AppError;
use crate::relay::RelayClient;
use crate::session::{
    bootstrap_load, Bootstrap, BootstrapState, FileSessionStore, Location, Route, SessionStore,
    StoredSession, Transition,
};
use std::future::Future;
use std::path::Path;
use std::time::SystemTime;
use tokio::io::AsyncRead;

/// Redirects followed per load before giving up.
const MAX_REDIRECTS: usize = 3;

/// Serialize a value as pretty-printed JSON and print it to stdout.
fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("failed to serialize JSON output")
    );
}

/// Run a future on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    Ok(rt.block_on(future))
}

fn open_store() -> Result<FileSessionStore, String> {
    FileSessionStore::open_default().map_err(|e| AppError::from(e).into())
}

fn load_config() -> Result<Config, String> {
    Config::load().map_err(|e| AppError::from(e).into())
}

/// Evaluate a load of `location`, following redirects until the guard settles.
fn load(
    bootstrap: &mut Bootstrap,
    store: &dyn SessionStore,
    location: Location,
) -> (Location, Transition) {
    let mut location = location;
    let mut transition = bootstrap_load(bootstrap, store, &location, SystemTime::now());
    for _ in 0..MAX_REDIRECTS {
        let Some(route) = transition.redirect else {
            break;
        };
        location = Location::route(route);
        transition = bootstrap_load(bootstrap, store, &location, SystemTime::now());
    }
    (location, transition)
}

/// The stored session, provided the guard lets us onto the remote screen.
fn require_session(store: &dyn SessionStore) -> Result<StoredSession, String> {
    let mut bootstrap = Bootstrap::new();
    let (location, transition) = load(&mut bootstrap, store, Location::route(Route::Remote));
    if transition.state != BootstrapState::Authenticated || location.path != Route::Remote.path() {
        return Err(AppError::NotConnected.into());
    }
    crate::session::load_session(store).ok_or_else(|| AppError::NotConnected.into())
}

/// Build the remote screen for the stored session.
fn remote_screen(store: &dyn SessionStore, config: &Config) -> Result<RemoteScreen, String> {
    let session = require_session(store)?;
    let relay = RelayClient::from_session(&session, config.request_timeout())
        .map_err(|e| e.to_string())?;
    Ok(RemoteScreen::new(relay))
}

/// Open a file, or stdin for `None` / `-`.
async fn open_input(path: Option<&str>) -> Result<Box<dyn AsyncRead + Unpin + Send>, String> {
    match path {
        None | Some("-") => Ok(Box::new(tokio::io::stdin())),
        Some(p) => {
            let file = tokio::fs::File::open(p)
                .await
                .map_err(|e| format!("Failed to open {p}: {e}"))?;
            Ok(Box::new(file))
        }
    }
}

/// Container hint for a recording: explicit `container`, else the input's extension.
fn extension_hint(input: Option<&str>, container: Option<&str>) -> Option<String> {
    container.map(str::to_owned).or_else(|| {
        input
            .and_then(|p| Path::new(p).extension())
            .and_then(|e| e.to_str())
            .map(str::to_owned)
    })
}

/// Resolves on Ctrl-C.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::token::tests::make_token;
    use crate::session::MemorySessionStore;

    fn token_with_exp(exp: u64) -> String {
        make_token(&serde_json::json!({ "exp": exp }))
    }

    #[test]
    fn test_load_follows_redirect_to_connect() {
        let store = MemorySessionStore::new();
        let mut bootstrap = Bootstrap::new();
        let (location, transition) = load(&mut bootstrap, &store, Location::route(Route::Root));
        assert_eq!(location.path, "/connect");
        assert_eq!(transition.state, BootstrapState::HandshakeError);
        assert!(bootstrap.has_error());
    }

    #[test]
    fn test_load_follows_redirect_to_remote() {
        let store = MemorySessionStore::with_session(StoredSession::new(
            token_with_exp(u64::from(u32::MAX)),
            "http://h",
        ));
        let mut bootstrap = Bootstrap::new();
        let (location, transition) = load(&mut bootstrap, &store, Location::route(Route::Root));
        assert_eq!(location.path, "/remote");
        assert_eq!(transition.redirect, None);
        assert_eq!(transition.state, BootstrapState::Authenticated);
    }

    #[test]
    fn test_extension_hint() {
        assert_eq!(extension_hint(Some("clip.flac"), None), Some("flac".to_owned()));
        assert_eq!(extension_hint(Some("clip.flac"), Some("wav")), Some("wav".to_owned()));
        assert_eq!(extension_hint(Some("-"), None), None);
        assert_eq!(extension_hint(None, None), None);
    }

    #[test]
    fn test_require_session() {
        let expired =
            MemorySessionStore::with_session(StoredSession::new(token_with_exp(1), "http://h"));
        assert!(require_session(&expired).is_err());

        let session = StoredSession::new(token_with_exp(u64::from(u32::MAX)), "http://h");
        let valid = MemorySessionStore::with_session(session.clone());
        assert_eq!(require_session(&valid).unwrap(), session);
    }
}
