//! Store actions, side-effect intents, and the pure transition function.

use std::rc::Rc;

use serde_json::json;

use crate::{
    collection::{apply_change, Change, EntityCollection},
    entities::{
        Alias, Device, DocFile, Entity, EntityId, EntityKind, Forum, ForumPost, ForumThread,
        Message, Position, Room, Team, Transaction, User, Wallet,
    },
    error::StoreError,
    model::{BootSession, ClientConfig, ConnectionStatus, StoreState, UiMode},
    window_order::{WindowEntry, WindowKind, WindowValue},
};

/// Id of the window opened when help mode targets a panel.
pub const HELP_WINDOW_ID: &str = "help";

#[derive(Debug, Clone, PartialEq)]
/// A typed change tagged with the collection it targets.
pub enum EntityChange {
    Users(Change<User>),
    Aliases(Change<Alias>),
    Rooms(Change<Room>),
    Messages(Change<Message>),
    Wallets(Change<Wallet>),
    Transactions(Change<Transaction>),
    DocFiles(Change<DocFile>),
    Teams(Change<Team>),
    Devices(Change<Device>),
    Forums(Change<Forum>),
    ForumThreads(Change<ForumThread>),
    ForumPosts(Change<ForumPost>),
    Positions(Change<Position>),
}

impl EntityChange {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Users(_) => EntityKind::Users,
            Self::Aliases(_) => EntityKind::Aliases,
            Self::Rooms(_) => EntityKind::Rooms,
            Self::Messages(_) => EntityKind::Messages,
            Self::Wallets(_) => EntityKind::Wallets,
            Self::Transactions(_) => EntityKind::Transactions,
            Self::DocFiles(_) => EntityKind::DocFiles,
            Self::Teams(_) => EntityKind::Teams,
            Self::Devices(_) => EntityKind::Devices,
            Self::Forums(_) => EntityKind::Forums,
            Self::ForumThreads(_) => EntityKind::ForumThreads,
            Self::ForumPosts(_) => EntityKind::ForumPosts,
            Self::Positions(_) => EntityKind::Positions,
        }
    }
}

impl<E: Entity> From<Change<E>> for EntityChange {
    fn from(change: Change<E>) -> Self {
        E::tag_change(change)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_store`]. Dispatching one is the only way to change the store.
pub enum StoreAction {
    /// Apply a create/update/remove to one entity collection.
    Entity(EntityChange),
    SetCurrentUser(Option<EntityId>),
    SetCurrentAlias(Option<EntityId>),
    SetConnectionStatus(ConnectionStatus),
    /// Switch UI mode. Help mode with a target also opens the help window on top.
    SetUiMode(UiMode),
    SetConfig(ClientConfig),
    /// Apply persisted local values read at boot.
    HydrateSession(BootSession),
    /// Open a window or bring it to front.
    FocusWindow {
        id: String,
        value: WindowValue,
    },
    CloseWindow {
        id: String,
    },
    ResetWindows,
    /// Restore a saved layout verbatim.
    RestoreWindows {
        entries: Vec<WindowEntry>,
    },
    /// Forget the identity, session-private collections, and every window.
    Logout,
    /// Apply several actions atomically: all of them or none, one commit.
    Batch(Vec<StoreAction>),
}

impl StoreAction {
    pub fn focus_window(id: impl Into<String>, value: WindowValue) -> Self {
        Self::FocusWindow {
            id: id.into(),
            value,
        }
    }

    pub fn close_window(id: impl Into<String>) -> Self {
        Self::CloseWindow { id: id.into() }
    }
}

impl From<EntityChange> for StoreAction {
    fn from(change: EntityChange) -> Self {
        Self::Entity(change)
    }
}

impl<E: Entity> From<Change<E>> for StoreAction {
    fn from(change: Change<E>) -> Self {
        Self::Entity(E::tag_change(change))
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Side-effect intents emitted by [`reduce_store`] for the host to execute.
pub enum RuntimeEffect {
    /// Persist the current window layout.
    PersistWindowLayout,
    /// Persist the selected user/alias (and device id).
    PersistSession,
    /// Move keyboard focus into the given window.
    FocusWindowInput(String),
}

/// Applies `action` to `state` and returns the next snapshot plus side-effect intents.
///
/// Slices the action does not touch are shared with `state`, so callers can detect a no-op with
/// [`StoreState::same_slices`].
///
/// # Errors
///
/// Returns a [`StoreError`] for malformed writes. Nothing from the action, including earlier
/// members of a [`StoreAction::Batch`], is kept in that case.
pub fn reduce_store(
    state: &StoreState,
    action: StoreAction,
) -> Result<(StoreState, Vec<RuntimeEffect>), StoreError> {
    let mut next = state.clone();
    let mut effects = Vec::new();
    apply_action(&mut next, action, &mut effects)?;
    Ok((next, effects))
}

fn apply_action(
    state: &mut StoreState,
    action: StoreAction,
    effects: &mut Vec<RuntimeEffect>,
) -> Result<(), StoreError> {
    match action {
        StoreAction::Entity(change) => apply_entity_change(state, change)?,
        StoreAction::SetCurrentUser(user_id) => {
            if state.current_user_id != user_id {
                state.current_user_id = user_id;
                state.current_alias_id = None;
                effects.push(RuntimeEffect::PersistSession);
            }
        }
        StoreAction::SetCurrentAlias(alias_id) => {
            if state.current_alias_id != alias_id {
                state.current_alias_id = alias_id;
                effects.push(RuntimeEffect::PersistSession);
            }
        }
        StoreAction::SetConnectionStatus(status) => {
            state.connection_status = status;
        }
        StoreAction::SetUiMode(mode) => {
            if let UiMode::Help {
                target: Some(target),
            } = &mode
            {
                let value =
                    WindowValue::with_payload(WindowKind::Help, json!({ "target": target }));
                focus_window(state, HELP_WINDOW_ID.to_string(), value, effects);
            }
            state.ui_mode = mode;
        }
        StoreAction::SetConfig(config) => {
            if *state.config != config {
                state.config = Rc::new(config);
            }
        }
        StoreAction::HydrateSession(session) => {
            state.device_id = session.device_id;
            state.current_user_id = session.user_id;
            state.current_alias_id = if state.current_user_id.is_some() {
                session.alias_id
            } else {
                None
            };
        }
        StoreAction::FocusWindow { id, value } => focus_window(state, id, value, effects),
        StoreAction::CloseWindow { id } => {
            let windows = state.windows.close(&id);
            if !windows.ptr_eq(&state.windows) {
                state.windows = windows;
                if state.last_window.as_deref() == Some(id.as_str()) {
                    state.last_window = state.windows.front_most().map(|entry| entry.id.clone());
                }
                effects.push(RuntimeEffect::PersistWindowLayout);
            }
        }
        StoreAction::ResetWindows => reset_windows(state, effects),
        StoreAction::RestoreWindows { entries } => {
            let windows = state.windows.replace_batch(entries);
            if !windows.ptr_eq(&state.windows) {
                state.windows = windows;
                state.last_window = state.windows.front_most().map(|entry| entry.id.clone());
            }
        }
        StoreAction::Logout => {
            state.current_user_id = None;
            state.current_alias_id = None;
            state.ui_mode = UiMode::Normal;
            clear(&mut state.wallets);
            clear(&mut state.transactions);
            clear(&mut state.doc_files);
            clear(&mut state.devices);
            clear(&mut state.positions);
            reset_windows(state, effects);
            effects.push(RuntimeEffect::PersistSession);
        }
        StoreAction::Batch(actions) => {
            for action in actions {
                apply_action(state, action, effects)?;
            }
        }
    }
    Ok(())
}

fn apply_entity_change(state: &mut StoreState, change: EntityChange) -> Result<(), StoreError> {
    match change {
        EntityChange::Users(c) => state.users = apply_change(&state.users, c)?,
        EntityChange::Aliases(c) => state.aliases = apply_change(&state.aliases, c)?,
        EntityChange::Rooms(c) => state.rooms = apply_change(&state.rooms, c)?,
        EntityChange::Messages(c) => state.messages = apply_change(&state.messages, c)?,
        EntityChange::Wallets(c) => state.wallets = apply_change(&state.wallets, c)?,
        EntityChange::Transactions(c) => {
            state.transactions = apply_change(&state.transactions, c)?
        }
        EntityChange::DocFiles(c) => state.doc_files = apply_change(&state.doc_files, c)?,
        EntityChange::Teams(c) => state.teams = apply_change(&state.teams, c)?,
        EntityChange::Devices(c) => state.devices = apply_change(&state.devices, c)?,
        EntityChange::Forums(c) => state.forums = apply_change(&state.forums, c)?,
        EntityChange::ForumThreads(c) => {
            state.forum_threads = apply_change(&state.forum_threads, c)?
        }
        EntityChange::ForumPosts(c) => state.forum_posts = apply_change(&state.forum_posts, c)?,
        EntityChange::Positions(c) => state.positions = apply_change(&state.positions, c)?,
    }
    Ok(())
}

fn focus_window(
    state: &mut StoreState,
    id: String,
    value: WindowValue,
    effects: &mut Vec<RuntimeEffect>,
) {
    let windows = state.windows.focus(&id, value);
    if windows.ptr_eq(&state.windows) {
        return;
    }
    state.windows = windows;
    state.last_window = Some(id.clone());
    effects.push(RuntimeEffect::PersistWindowLayout);
    effects.push(RuntimeEffect::FocusWindowInput(id));
}

fn reset_windows(state: &mut StoreState, effects: &mut Vec<RuntimeEffect>) {
    if state.windows.is_empty() && state.last_window.is_none() {
        return;
    }
    state.windows = state.windows.reset_all();
    state.last_window = None;
    effects.push(RuntimeEffect::PersistWindowLayout);
}

fn clear<E>(collection: &mut EntityCollection<E>) {
    if !collection.is_empty() {
        *collection = EntityCollection::default();
    }
}
