//! Errors raised by malformed writes into the store.

use thiserror::Error;

use crate::entities::EntityKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// A rejected dispatch. The store keeps its previous snapshot when one of these is returned.
pub enum StoreError {
    /// An entity in a change carried no id.
    #[error("{kind} entity is missing its id")]
    MissingEntityId {
        /// Kind of the offending change.
        kind: EntityKind,
    },
    /// A wire event named a kind the store does not hold.
    #[error("unknown entity kind `{0}`")]
    UnknownKind(String),
    /// A wire payload could not be decoded.
    #[error("invalid {kind} payload: {message}")]
    InvalidPayload {
        /// Kind named by the event.
        kind: String,
        /// Decoder message.
        message: String,
    },
    /// A wire payload carried neither `entity` nor `entities`.
    #[error("{kind} change carries no entity")]
    MissingEntities {
        /// Kind of the offending change.
        kind: EntityKind,
    },
}
