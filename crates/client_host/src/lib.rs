//! Host storage contracts consumed by the client runtime.
//!
//! The runtime never touches browser storage directly. Persisted local state (device id, auth
//! token, selected identity, window layout) flows through the [`PrefsStore`] trait so tests and
//! native targets can swap in [`MemoryPrefsStore`] while browser entry points provide their own
//! `localStorage`-backed adapter.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod storage;
pub mod time;

pub use storage::envelope::{
    build_state_envelope, decode_envelope_payload, load_envelope_with, save_envelope_with,
    StateEnvelope, STATE_ENVELOPE_VERSION,
};
pub use storage::prefs::{
    load_json_with, save_json_with, MemoryPrefsStore, NoopPrefsStore, PrefsStore, PrefsStoreFuture,
};
pub use time::{next_envelope_stamp_ms, unix_time_ms_now};
