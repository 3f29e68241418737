//! Client-side state store for the chat/social client.
//!
//! Server pushes arrive through [`SocketListener`], become [`StoreAction`]s, and are folded into
//! immutable [`StoreState`] snapshots by [`reduce_store`]. Views read snapshots through the
//! [`selectors`] module and subscribe to commits on the [`Store`].

pub mod collection;
pub mod effect_executor;
pub mod entities;
pub mod error;
pub mod model;
pub mod persistence;
pub mod reducer;
pub mod selectors;
pub mod socket;
pub mod store;
pub mod window_order;

pub use collection::{apply_change, Change, ChangePayload, ChangeType, EntityCollection};
pub use effect_executor::{execute_effects, EffectHost, HeadlessEffectHost};
pub use entities::{Entity, EntityId, EntityKind};
pub use error::StoreError;
pub use model::*;
pub use persistence::{
    hydrate_store, load_boot_session, load_window_layout, persist_session, persist_window_layout,
};
pub use reducer::{reduce_store, EntityChange, RuntimeEffect, StoreAction};
pub use selectors::SelectorCache;
pub use socket::{EntityEventSink, SocketListener};
pub use store::{Store, Subscription};
pub use window_order::{WindowEntry, WindowKind, WindowOrder, WindowValue};
