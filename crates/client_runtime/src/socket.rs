//! Translates server push events into store actions.
//!
//! The transport itself lives outside this crate; whatever owns the connection hands each decoded
//! event to a [`SocketListener`] as `(kind, payload)`.

use leptos::logging;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    collection::{Change, ChangePayload, ChangeType},
    entities::{
        Alias, Device, DocFile, Entity, EntityKind, Forum, ForumPost, ForumThread, Message,
        Position, Room, Team, Transaction, User, Wallet,
    },
    error::StoreError,
    model::{ClientConfig, ConnectionStatus},
    reducer::{EntityChange, StoreAction},
    store::Store,
};

/// Receiver of the actions produced by a [`SocketListener`].
pub trait EntityEventSink {
    /// Applies one action.
    ///
    /// # Errors
    ///
    /// Returns the reducer's rejection, if any.
    fn apply(&self, action: StoreAction) -> Result<(), StoreError>;
}

impl EntityEventSink for Store {
    fn apply(&self, action: StoreAction) -> Result<(), StoreError> {
        self.dispatch(action)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChange {
    change_type: ChangeType,
    #[serde(default)]
    reset: bool,
    #[serde(default)]
    entity: Option<Value>,
    #[serde(default)]
    entities: Option<Vec<Value>>,
}

/// Decodes a wire change event for `E`.
///
/// The payload carries `changeType`, an optional `reset` flag, and either `entity` or
/// `entities`. When both are present the batch wins.
///
/// # Errors
///
/// Returns [`StoreError::InvalidPayload`] for undecodable JSON and
/// [`StoreError::MissingEntities`] when neither `entity` nor `entities` is present.
pub fn decode_change<E: Entity>(payload: Value) -> Result<Change<E>, StoreError> {
    let invalid = |err: serde_json::Error| StoreError::InvalidPayload {
        kind: E::KIND.to_string(),
        message: err.to_string(),
    };
    let wire: WireChange = serde_json::from_value(payload).map_err(invalid)?;

    let payload = match (wire.entities, wire.entity) {
        (Some(values), _) => ChangePayload::Batch(
            values
                .into_iter()
                .map(serde_json::from_value::<E>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?,
        ),
        (None, Some(value)) => {
            ChangePayload::Single(serde_json::from_value::<E>(value).map_err(invalid)?)
        }
        (None, None) => return Err(StoreError::MissingEntities { kind: E::KIND }),
    };

    Ok(Change {
        change_type: wire.change_type,
        payload,
        reset: wire.reset,
    })
}

/// Decodes a wire event for the collection named by `kind`.
///
/// # Errors
///
/// Returns [`StoreError::UnknownKind`] for unrecognized kinds, otherwise as [`decode_change`].
pub fn decode_entity_event(kind: &str, payload: Value) -> Result<EntityChange, StoreError> {
    let Some(kind) = EntityKind::from_wire(kind) else {
        return Err(StoreError::UnknownKind(kind.to_string()));
    };
    let change = match kind {
        EntityKind::Users => decode_change::<User>(payload)?.into(),
        EntityKind::Aliases => decode_change::<Alias>(payload)?.into(),
        EntityKind::Rooms => decode_change::<Room>(payload)?.into(),
        EntityKind::Messages => decode_change::<Message>(payload)?.into(),
        EntityKind::Wallets => decode_change::<Wallet>(payload)?.into(),
        EntityKind::Transactions => decode_change::<Transaction>(payload)?.into(),
        EntityKind::DocFiles => decode_change::<DocFile>(payload)?.into(),
        EntityKind::Teams => decode_change::<Team>(payload)?.into(),
        EntityKind::Devices => decode_change::<Device>(payload)?.into(),
        EntityKind::Forums => decode_change::<Forum>(payload)?.into(),
        EntityKind::ForumThreads => decode_change::<ForumThread>(payload)?.into(),
        EntityKind::ForumPosts => decode_change::<ForumPost>(payload)?.into(),
        EntityKind::Positions => decode_change::<Position>(payload)?.into(),
    };
    Ok(change)
}

/// Routes socket events into a sink, logging and returning rejections.
pub struct SocketListener<'a, S: EntityEventSink + ?Sized> {
    sink: &'a S,
}

impl<'a, S: EntityEventSink + ?Sized> SocketListener<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink }
    }

    /// Handles a create/update/remove event for one collection.
    ///
    /// # Errors
    ///
    /// Returns the decode or reducer error. A rejected event never changes the store.
    pub fn on_entity_event(&self, kind: &str, payload: Value) -> Result<(), StoreError> {
        let result =
            decode_entity_event(kind, payload).and_then(|change| self.sink.apply(change.into()));
        if let Err(err) = &result {
            logging::warn!("socket event `{kind}` rejected: {err}");
        }
        result
    }

    pub fn on_connection_status(&self, status: ConnectionStatus) -> Result<(), StoreError> {
        self.sink.apply(StoreAction::SetConnectionStatus(status))
    }

    /// Handles the server's config push.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] when the payload is not a config object.
    pub fn on_config(&self, payload: Value) -> Result<(), StoreError> {
        let config = serde_json::from_value::<ClientConfig>(payload).map_err(|err| {
            let err = StoreError::InvalidPayload {
                kind: "config".to_string(),
                message: err.to_string(),
            };
            logging::warn!("socket config rejected: {err}");
            err
        })?;
        self.sink.apply(StoreAction::SetConfig(config))
    }
}
