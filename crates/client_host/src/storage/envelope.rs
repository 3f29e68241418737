//! Versioned JSON envelopes for structured values kept in a [`PrefsStore`].

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::prefs::{load_json_with, save_json_with, PrefsStore};

/// Version of the [`StateEnvelope`] wrapper itself.
pub const STATE_ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Wrapper recording which payload schema was written and when.
pub struct StateEnvelope {
    /// Wrapper version.
    pub envelope_version: u32,
    /// Storage key the envelope was written under.
    pub key: String,
    /// Payload schema version chosen by the writer.
    pub schema_version: u32,
    /// Write time in unix milliseconds.
    pub updated_at_unix_ms: u64,
    /// Serialized payload.
    pub payload: Value,
}

/// Serializes `payload` into a freshly stamped [`StateEnvelope`].
///
/// # Errors
///
/// Returns an error when `payload` cannot be converted to JSON.
pub fn build_state_envelope<T: Serialize>(
    key: &str,
    schema_version: u32,
    payload: &T,
) -> Result<StateEnvelope, String> {
    Ok(StateEnvelope {
        envelope_version: STATE_ENVELOPE_VERSION,
        key: key.to_string(),
        schema_version,
        updated_at_unix_ms: crate::time::next_envelope_stamp_ms(),
        payload: serde_json::to_value(payload).map_err(|e| e.to_string())?,
    })
}

/// Decodes the payload of `envelope`.
///
/// # Errors
///
/// Returns an error when the payload does not match `T`.
pub fn decode_envelope_payload<T: DeserializeOwned>(envelope: &StateEnvelope) -> Result<T, String> {
    serde_json::from_value(envelope.payload.clone()).map_err(|e| e.to_string())
}

/// Writes `payload` under `key` wrapped in a [`StateEnvelope`].
///
/// # Errors
///
/// Returns an error when serialization or the store write fails.
pub async fn save_envelope_with<S: PrefsStore + ?Sized, T: Serialize>(
    store: &S,
    key: &str,
    schema_version: u32,
    payload: &T,
) -> Result<(), String> {
    let envelope = build_state_envelope(key, schema_version, payload)?;
    save_json_with(store, key, &envelope).await
}

/// Reads the envelope under `key` and decodes its payload.
///
/// Envelopes written with a different `schema_version` are ignored (`Ok(None)`), so stale layouts
/// from older clients are dropped instead of misread.
///
/// # Errors
///
/// Returns an error when the store fails or the stored text is not a decodable envelope.
pub async fn load_envelope_with<S: PrefsStore + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
    schema_version: u32,
) -> Result<Option<T>, String> {
    let Some(envelope) = load_json_with::<_, StateEnvelope>(store, key).await? else {
        return Ok(None);
    };
    if envelope.schema_version != schema_version {
        return Ok(None);
    }
    decode_envelope_payload(&envelope).map(Some)
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::storage::prefs::MemoryPrefsStore;

    #[test]
    fn envelope_serializes_with_snake_case_fields() {
        let envelope = StateEnvelope {
            envelope_version: STATE_ENVELOPE_VERSION,
            key: "client.window_layout.v1".to_string(),
            schema_version: 3,
            updated_at_unix_ms: 99,
            payload: json!({"ok": true}),
        };
        let value = serde_json::to_value(&envelope).expect("serialize");
        let object = value.as_object().expect("object");
        assert_eq!(object.get("schema_version"), Some(&json!(3)));
        assert_eq!(object.get("updated_at_unix_ms"), Some(&json!(99)));
        assert!(!object.contains_key("schemaVersion"));
    }

    #[test]
    fn save_then_load_returns_payload() {
        let store = MemoryPrefsStore::default();
        block_on(save_envelope_with(&store, "k", 2, &json!({"n": 5}))).expect("save");
        let loaded: Option<serde_json::Value> =
            block_on(load_envelope_with(&store, "k", 2)).expect("load");
        assert_eq!(loaded, Some(json!({"n": 5})));
    }

    #[test]
    fn schema_mismatch_is_ignored() {
        let store = MemoryPrefsStore::default();
        block_on(save_envelope_with(&store, "k", 1, &json!({"n": 5}))).expect("save");
        let loaded: Option<serde_json::Value> =
            block_on(load_envelope_with(&store, "k", 2)).expect("load");
        assert_eq!(loaded, None);
    }

    #[test]
    fn later_envelopes_carry_later_stamps() {
        let first = build_state_envelope("k", 1, &1).expect("first");
        let second = build_state_envelope("k", 1, &2).expect("second");
        assert!(second.updated_at_unix_ms > first.updated_at_unix_ms);
    }
}
