//! Persisted local client state: boot session values and the window layout.
//!
//! Session values are stored as raw strings under fixed keys. The window layout is stored as a
//! versioned envelope so stale layouts from older clients are dropped rather than misread.

use client_host::{load_envelope_with, save_envelope_with, PrefsStore};
use leptos::logging;

use crate::{
    entities::EntityId,
    error::StoreError,
    model::{BootSession, StoreState},
    reducer::StoreAction,
    store::Store,
    window_order::{WindowEntry, WindowOrder},
};

pub const DEVICE_ID_KEY: &str = "client.device_id";
pub const AUTH_TOKEN_KEY: &str = "client.auth_token";
pub const USER_ID_KEY: &str = "client.user_id";
pub const ALIAS_ID_KEY: &str = "client.alias_id";
pub const WINDOW_LAYOUT_KEY: &str = "client.window_layout.v1";
pub const WINDOW_LAYOUT_SCHEMA_VERSION: u32 = 1;

async fn load_string<S: PrefsStore + ?Sized>(prefs: &S, key: &str) -> Option<String> {
    match prefs.load_value(key).await {
        Ok(value) => value.filter(|value| !value.is_empty()),
        Err(err) => {
            logging::warn!("load `{key}` failed: {err}");
            None
        }
    }
}

async fn store_string<S: PrefsStore + ?Sized>(
    prefs: &S,
    key: &str,
    value: Option<&str>,
) -> Result<(), String> {
    match value {
        Some(value) => prefs.save_value(key, value).await,
        None => prefs.delete_value(key).await,
    }
}

/// Reads the persisted session. Read failures are logged and treated as absent, so the worst
/// case is an anonymous boot.
pub async fn load_boot_session<S: PrefsStore + ?Sized>(prefs: &S) -> BootSession {
    let device_id = load_string(prefs, DEVICE_ID_KEY).await;
    let auth_token = load_string(prefs, AUTH_TOKEN_KEY).await;
    let user_id = load_string(prefs, USER_ID_KEY).await.map(EntityId::from);
    let alias_id = match &user_id {
        Some(_) => load_string(prefs, ALIAS_ID_KEY).await.map(EntityId::from),
        None => None,
    };
    BootSession {
        device_id,
        auth_token,
        user_id,
        alias_id,
    }
}

/// Writes the current identity selection and device id. Absent values delete their key.
///
/// `auth_token` is owned by the caller; `None` leaves the stored token untouched.
///
/// # Errors
///
/// Returns the first store failure.
pub async fn persist_session<S: PrefsStore + ?Sized>(
    prefs: &S,
    state: &StoreState,
    auth_token: Option<&str>,
) -> Result<(), String> {
    if let Some(device_id) = state.device_id.as_deref() {
        prefs.save_value(DEVICE_ID_KEY, device_id).await?;
    }
    if let Some(token) = auth_token {
        prefs.save_value(AUTH_TOKEN_KEY, token).await?;
    }
    store_string(
        prefs,
        USER_ID_KEY,
        state.current_user_id.as_ref().map(EntityId::as_str),
    )
    .await?;
    store_string(
        prefs,
        ALIAS_ID_KEY,
        state.current_alias_id.as_ref().map(EntityId::as_str),
    )
    .await
}

/// Forgets the stored token, e.g. after the server rejected it.
///
/// # Errors
///
/// Returns the store failure.
pub async fn clear_auth_token<S: PrefsStore + ?Sized>(prefs: &S) -> Result<(), String> {
    prefs.delete_value(AUTH_TOKEN_KEY).await
}

/// Saves the window stack, back to front.
///
/// # Errors
///
/// Returns an error when serialization or the store write fails.
pub async fn persist_window_layout<S: PrefsStore + ?Sized>(
    prefs: &S,
    windows: &WindowOrder,
) -> Result<(), String> {
    let entries = windows.ordered().into_iter().cloned().collect::<Vec<_>>();
    save_envelope_with(prefs, WINDOW_LAYOUT_KEY, WINDOW_LAYOUT_SCHEMA_VERSION, &entries).await
}

/// Loads the saved window stack. Missing, stale, or unreadable layouts load as empty.
pub async fn load_window_layout<S: PrefsStore + ?Sized>(prefs: &S) -> Vec<WindowEntry> {
    match load_envelope_with::<_, Vec<WindowEntry>>(
        prefs,
        WINDOW_LAYOUT_KEY,
        WINDOW_LAYOUT_SCHEMA_VERSION,
    )
    .await
    {
        Ok(entries) => entries.unwrap_or_default(),
        Err(err) => {
            logging::warn!("window layout load failed: {err}");
            Vec::new()
        }
    }
}

/// Loads persisted values and applies them to `store` in a single commit.
///
/// Returns the loaded session so the caller can authenticate with its token.
///
/// # Errors
///
/// Returns the reducer's rejection; the store is left untouched in that case.
pub async fn hydrate_store<S: PrefsStore + ?Sized>(
    store: &Store,
    prefs: &S,
) -> Result<BootSession, StoreError> {
    let session = load_boot_session(prefs).await;
    let entries = load_window_layout(prefs).await;
    let mut actions = vec![StoreAction::HydrateSession(session.clone())];
    if !entries.is_empty() {
        actions.push(StoreAction::RestoreWindows { entries });
    }
    store.dispatch(StoreAction::Batch(actions))?;
    logging::log!(
        "session hydrated (anonymous: {}, windows: {})",
        session.is_anonymous(),
        store.get_state().windows.len()
    );
    Ok(session)
}
