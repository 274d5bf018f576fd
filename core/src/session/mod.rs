//! Session bootstrap: stored credentials, token validity, and the routing guard.

pub mod bootstrap;
pub mod store;
pub mod token;

pub use bootstrap::{
    evaluate, Bootstrap, BootstrapState, HandshakeContext, Location, Route, Transition,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError, StoredSession};

use std::time::SystemTime;

/// Read the stored session, treating an unreadable store as empty.
pub fn load_session(store: &dyn SessionStore) -> Option<StoredSession> {
    match store.load() {
        Ok(session) => session,
        Err(e) => {
            log::warn!("Ignoring unreadable session: {e}");
            None
        }
    }
}

/// The stored session if its token is present and unexpired at `now`.
pub fn valid_session(store: &dyn SessionStore, now: SystemTime) -> Option<StoredSession> {
    load_session(store)
        .filter(|s| !token::is_token_expired(Some(s.auth_token.as_str()), now))
}

/// Evaluate a load of `location` against whatever is stored.
pub fn bootstrap_load(
    bootstrap: &mut Bootstrap,
    store: &dyn SessionStore,
    location: &Location,
    now: SystemTime,
) -> Transition {
    let token_valid = valid_session(store, now).is_some();
    bootstrap.navigate(token_valid, location)
}

/// Forget the durable session ("clean token"). The next load is unauthenticated.
pub fn clean_token(store: &dyn SessionStore) -> Result<(), StoreError> {
    store.clear()?;
    log::info!("Session cleared");
    Ok(())
}
