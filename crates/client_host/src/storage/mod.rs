//! Key/value persistence used for local client state.

pub mod envelope;
pub mod prefs;
