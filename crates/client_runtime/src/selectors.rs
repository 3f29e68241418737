//! Read-only queries over a [`StoreState`] snapshot.
//!
//! Selectors never mutate and never fail: an entity that references something not loaded yet
//! resolves to a fallback (anonymous identity, empty name) because the missing piece normally
//! arrives with its own event moments later.

mod memo;

use std::{collections::BTreeSet, rc::Rc};

pub use memo::{Dependency, KeyedMemo};

use crate::{
    collection::EntityCollection,
    entities::{Alias, DocFile, Entity, EntityId, Message, Room, Transaction, User, Wallet},
    model::{ClientConfig, Identity, StoreState},
    window_order::WindowEntry,
};

/// Looks up any entity kind by id.
pub fn entity_by_id<'a, E: Entity>(state: &'a StoreState, id: &str) -> Option<&'a Rc<E>> {
    E::collection(state).get(id)
}

pub fn user_by_id<'a>(state: &'a StoreState, id: &str) -> Option<&'a Rc<User>> {
    state.users.get(id)
}

pub fn alias_by_id<'a>(state: &'a StoreState, id: &str) -> Option<&'a Rc<Alias>> {
    state.aliases.get(id)
}

pub fn room_by_id<'a>(state: &'a StoreState, id: &str) -> Option<&'a Rc<Room>> {
    state.rooms.get(id)
}

pub fn wallet_by_id<'a>(state: &'a StoreState, id: &str) -> Option<&'a Rc<Wallet>> {
    state.wallets.get(id)
}

pub fn doc_file_by_id<'a>(state: &'a StoreState, id: &str) -> Option<&'a Rc<DocFile>> {
    state.doc_files.get(id)
}

/// Resolves `id` against users first, then aliases.
pub fn identity_by_id(state: &StoreState, id: &str) -> Option<Identity> {
    if let Some(user) = state.users.get(id) {
        return Some(Identity::User(Rc::clone(user)));
    }
    state
        .aliases
        .get(id)
        .map(|alias| Identity::Alias(Rc::clone(alias)))
}

/// Like [`identity_by_id`], falling back to [`Identity::Anonymous`].
pub fn identity_or_anonymous(state: &StoreState, id: &str) -> Identity {
    identity_by_id(state, id).unwrap_or(Identity::Anonymous)
}

pub fn current_user(state: &StoreState) -> Option<Rc<User>> {
    let id = state.current_user_id.as_ref()?;
    state.users.get(id.as_str()).cloned()
}

/// The identity the user currently acts as: the selected alias when loaded, else the user, else
/// anonymous.
pub fn current_identity(state: &StoreState) -> Identity {
    if state.current_user_id.is_none() {
        return Identity::Anonymous;
    }
    if let Some(alias) = state
        .current_alias_id
        .as_ref()
        .and_then(|id| state.aliases.get(id.as_str()))
    {
        return Identity::Alias(Rc::clone(alias));
    }
    current_user(state)
        .map(Identity::User)
        .unwrap_or(Identity::Anonymous)
}

/// Ids of the current user and every alias they own, sorted. Empty when logged out.
pub fn current_identity_ids(state: &StoreState) -> Vec<EntityId> {
    let Some(user_id) = state.current_user_id.as_ref() else {
        return Vec::new();
    };

    let mut ids = BTreeSet::new();
    ids.insert(user_id.clone());
    if let Some(alias_ids) = state
        .users
        .get(user_id.as_str())
        .and_then(|user| user.alias_ids.as_ref())
    {
        ids.extend(alias_ids.iter().cloned());
    }
    ids.extend(
        state
            .aliases
            .iter()
            .filter(|alias| alias.owner_id.as_ref() == Some(user_id))
            .map(|alias| alias.id.clone()),
    );
    ids.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq)]
/// A room with the name it should be listed under.
pub struct RoomListing {
    pub room: Rc<Room>,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Rooms split the way the room list shows them. Each group is sorted by display name,
/// case-insensitively.
pub struct RoomGroups {
    pub followed: Vec<RoomListing>,
    pub unfollowed: Vec<RoomListing>,
    pub whispers: Vec<RoomListing>,
}

/// Name a room is listed under for `viewer`.
///
/// Whisper rooms are named after their other participants; participants that are not loaded
/// yet contribute an empty name.
pub fn room_display_name(state: &StoreState, room: &Room, viewer: &Identity) -> String {
    if room.is_whisper != Some(true) {
        return room.room_name.clone().unwrap_or_default();
    }

    let others = room
        .participant_ids
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|id| id.as_str() != viewer.id())
        .map(|id| {
            identity_by_id(state, id.as_str())
                .map(|identity| identity.display_name().to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    if others.is_empty() {
        room.room_name.clone().unwrap_or_default()
    } else {
        others.join(", ")
    }
}

/// Partitions rooms into followed (by the current identity), not followed, and whispers.
pub fn room_groups(state: &StoreState) -> RoomGroups {
    let viewer = current_identity(state);
    let following = viewer.following_rooms();
    let mut groups = RoomGroups::default();

    for room in state.rooms.iter() {
        let listing = RoomListing {
            display_name: room_display_name(state, room, &viewer),
            room: Rc::clone(room),
        };
        if room.is_whisper == Some(true) {
            groups.whispers.push(listing);
        } else if following.contains(&room.id) {
            groups.followed.push(listing);
        } else {
            groups.unfollowed.push(listing);
        }
    }

    for group in [
        &mut groups.followed,
        &mut groups.unfollowed,
        &mut groups.whispers,
    ] {
        group.sort_by_cached_key(|listing| {
            (listing.display_name.to_lowercase(), listing.room.id.clone())
        });
    }
    groups
}

/// Messages for `room_id`, always including the broadcast room, oldest first.
pub fn messages_for_room(state: &StoreState, room_id: &str) -> Vec<Rc<Message>> {
    let broadcast = &state.config.default_rooms.broadcast_room_id;
    let mut messages = state
        .messages
        .iter()
        .filter(|message| {
            message
                .room_id
                .as_ref()
                .is_some_and(|id| id.as_str() == room_id || id == broadcast)
        })
        .cloned()
        .collect::<Vec<_>>();
    messages.sort_by(|a, b| {
        a.time_created
            .cmp(&b.time_created)
            .then_with(|| a.id.cmp(&b.id))
    });
    messages
}

/// Wallets owned by the current user or any of their aliases, in id order.
pub fn owned_wallet_ids(state: &StoreState) -> Vec<EntityId> {
    let owners = current_identity_ids(state);
    if owners.is_empty() {
        return Vec::new();
    }
    let owns = |id: &Option<EntityId>| id.as_ref().is_some_and(|id| owners.contains(id));
    state
        .wallets
        .iter()
        .filter(|wallet| owns(&wallet.owner_id) || owns(&wallet.owner_alias_id))
        .map(|wallet| wallet.id.clone())
        .collect()
}

/// Transactions touching `wallet_id`, oldest first.
pub fn transactions_for_wallet(state: &StoreState, wallet_id: &str) -> Vec<Rc<Transaction>> {
    let mut transactions = state
        .transactions
        .iter()
        .filter(|tx| {
            tx.from_wallet_id.as_ref().is_some_and(|id| id.as_str() == wallet_id)
                || tx.to_wallet_id.as_ref().is_some_and(|id| id.as_str() == wallet_id)
        })
        .cloned()
        .collect::<Vec<_>>();
    transactions.sort_by(|a, b| {
        a.time_created
            .cmp(&b.time_created)
            .then_with(|| a.id.cmp(&b.id))
    });
    transactions
}

pub fn front_window(state: &StoreState) -> Option<&WindowEntry> {
    state.windows.front_most()
}

/// Open windows from back to front.
pub fn ordered_windows(state: &StoreState) -> Vec<&WindowEntry> {
    state.windows.ordered()
}

type RoomGroupDeps = (
    EntityCollection<Room>,
    EntityCollection<User>,
    EntityCollection<Alias>,
    Option<EntityId>,
    Option<EntityId>,
);
type MessageDeps = (EntityCollection<Message>, Rc<ClientConfig>);
type WalletDeps = (
    EntityCollection<Wallet>,
    EntityCollection<User>,
    EntityCollection<Alias>,
    Option<EntityId>,
);

#[derive(Debug, Default)]
/// Memoized versions of the expensive selectors. Results are reused until a slice they read
/// changes reference.
pub struct SelectorCache {
    room_groups: KeyedMemo<(), RoomGroupDeps, RoomGroups>,
    messages: KeyedMemo<EntityId, MessageDeps, Vec<Rc<Message>>>,
    owned_wallets: KeyedMemo<(), WalletDeps, Vec<EntityId>>,
}

impl SelectorCache {
    pub fn room_groups(&mut self, state: &StoreState) -> Rc<RoomGroups> {
        let deps = (
            state.rooms.clone(),
            state.users.clone(),
            state.aliases.clone(),
            state.current_user_id.clone(),
            state.current_alias_id.clone(),
        );
        self.room_groups
            .get_or_compute((), deps, |_| room_groups(state))
    }

    pub fn messages_for_room(
        &mut self,
        state: &StoreState,
        room_id: &str,
    ) -> Rc<Vec<Rc<Message>>> {
        let deps = (state.messages.clone(), Rc::clone(&state.config));
        self.messages
            .get_or_compute(EntityId::from(room_id), deps, |_| {
                messages_for_room(state, room_id)
            })
    }

    pub fn owned_wallet_ids(&mut self, state: &StoreState) -> Rc<Vec<EntityId>> {
        let deps = (
            state.wallets.clone(),
            state.users.clone(),
            state.aliases.clone(),
            state.current_user_id.clone(),
        );
        self.owned_wallets
            .get_or_compute((), deps, |_| owned_wallet_ids(state))
    }

    /// Drops every cached view.
    pub fn clear(&mut self) {
        self.room_groups.clear();
        self.messages.clear();
        self.owned_wallets.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        collection::{Change, ChangeType},
        model::ANONYMOUS_NAME,
        reducer::{reduce_store, StoreAction},
    };

    fn apply(state: &StoreState, actions: Vec<StoreAction>) -> StoreState {
        reduce_store(state, StoreAction::Batch(actions))
            .expect("reduce")
            .0
    }

    fn user(id: &str, name: &str, following: &[&str]) -> User {
        User {
            id: id.into(),
            username: Some(name.to_string()),
            following_rooms: Some(following.iter().map(|r| EntityId::from(*r)).collect()),
            ..User::default()
        }
    }

    fn alias(id: &str, name: &str, owner: &str) -> Alias {
        Alias {
            id: id.into(),
            alias_name: Some(name.to_string()),
            owner_id: Some(owner.into()),
            ..Alias::default()
        }
    }

    fn room(id: &str, name: &str) -> Room {
        Room {
            id: id.into(),
            room_name: Some(name.to_string()),
            ..Room::default()
        }
    }

    fn whisper(id: &str, participants: &[&str]) -> Room {
        Room {
            id: id.into(),
            is_whisper: Some(true),
            participant_ids: Some(participants.iter().map(|p| EntityId::from(*p)).collect()),
            ..Room::default()
        }
    }

    fn message(id: &str, room_id: &str, at: &str) -> Message {
        Message {
            id: id.into(),
            room_id: Some(room_id.into()),
            time_created: Some(at.to_string()),
            ..Message::default()
        }
    }

    fn world() -> StoreState {
        apply(
            &StoreState::default(),
            vec![
                Change::batch(
                    ChangeType::Create,
                    vec![
                        user("u1", "ada", &["r2"]),
                        user("u2", "Bob", &[]),
                    ],
                )
                .into(),
                Change::create(alias("a1", "shadow", "u1")).into(),
                Change::batch(
                    ChangeType::Create,
                    vec![
                        room("r1", "zeta"),
                        room("r2", "Alpha"),
                        room("r3", "beta"),
                        room("r4", "Gamma"),
                        whisper("w1", &["u1", "u2"]),
                        whisper("w2", &["u1", "ghost"]),
                    ],
                )
                .into(),
                StoreAction::SetCurrentUser(Some("u1".into())),
            ],
        )
    }

    fn names(listings: &[RoomListing]) -> Vec<&str> {
        listings.iter().map(|l| l.display_name.as_str()).collect()
    }

    #[test]
    fn identity_resolution_checks_users_then_aliases() {
        let state = world();
        assert!(matches!(identity_by_id(&state, "u1"), Some(Identity::User(_))));
        assert!(matches!(identity_by_id(&state, "a1"), Some(Identity::Alias(_))));
        assert_eq!(identity_by_id(&state, "nobody"), None);
        assert_eq!(
            identity_or_anonymous(&state, "nobody").display_name(),
            ANONYMOUS_NAME
        );
    }

    #[test]
    fn current_identity_prefers_loaded_alias() {
        let state = world();
        assert_eq!(current_identity(&state).display_name(), "ada");

        let as_alias = apply(&state, vec![StoreAction::SetCurrentAlias(Some("a1".into()))]);
        assert_eq!(current_identity(&as_alias).display_name(), "shadow");

        let unknown_alias = apply(&state, vec![StoreAction::SetCurrentAlias(Some("a9".into()))]);
        assert_eq!(current_identity(&unknown_alias).display_name(), "ada");

        assert!(current_identity(&StoreState::default()).is_anonymous());
    }

    #[test]
    fn rooms_are_partitioned_and_sorted_case_insensitively() {
        let groups = room_groups(&world());
        assert_eq!(names(&groups.followed), vec!["Alpha"]);
        assert_eq!(names(&groups.unfollowed), vec!["beta", "Gamma", "zeta"]);
        assert_eq!(names(&groups.whispers), vec!["", "Bob"]);
    }

    #[test]
    fn following_is_read_from_the_acting_alias() {
        let state = apply(
            &world(),
            vec![
                Change::update(Alias {
                    id: "a1".into(),
                    following_rooms: Some(vec!["r1".into()]),
                    ..Alias::default()
                })
                .into(),
                StoreAction::SetCurrentAlias(Some("a1".into())),
            ],
        );
        let groups = room_groups(&state);
        assert_eq!(names(&groups.followed), vec!["zeta"]);
    }

    #[test]
    fn broadcast_messages_fan_out_to_every_room() {
        let state = apply(
            &world(),
            vec![Change::batch(
                ChangeType::Create,
                vec![
                    message("m1", "r1", "2024-01-01T10:00:00Z"),
                    message("m2", "broadcast", "2024-01-01T09:00:00Z"),
                    message("m3", "r2", "2024-01-01T08:00:00Z"),
                ],
            )
            .into()],
        );

        let ids = messages_for_room(&state, "r1")
            .iter()
            .map(|m| m.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["m2".to_string(), "m1".to_string()]);
    }

    #[test]
    fn owned_wallets_include_alias_wallets() {
        let state = apply(
            &world(),
            vec![Change::batch(
                ChangeType::Create,
                vec![
                    Wallet {
                        id: "w-user".into(),
                        owner_id: Some("u1".into()),
                        ..Wallet::default()
                    },
                    Wallet {
                        id: "w-alias".into(),
                        owner_id: Some("u9".into()),
                        owner_alias_id: Some("a1".into()),
                        ..Wallet::default()
                    },
                    Wallet {
                        id: "w-bob".into(),
                        owner_id: Some("u2".into()),
                        ..Wallet::default()
                    },
                ],
            )
            .into()],
        );

        assert_eq!(
            owned_wallet_ids(&state),
            vec![EntityId::from("w-alias"), EntityId::from("w-user")]
        );
        assert!(owned_wallet_ids(&StoreState::default()).is_empty());
    }

    #[test]
    fn transactions_match_either_side() {
        let tx = |id: &str, from: &str, to: &str| Transaction {
            id: id.into(),
            from_wallet_id: Some(from.into()),
            to_wallet_id: Some(to.into()),
            ..Transaction::default()
        };
        let state = apply(
            &StoreState::default(),
            vec![Change::batch(
                ChangeType::Create,
                vec![tx("t1", "w1", "w2"), tx("t2", "w3", "w1"), tx("t3", "w2", "w3")],
            )
            .into()],
        );
        let ids = transactions_for_wallet(&state, "w1")
            .iter()
            .map(|t| t.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["t1".to_string(), "t2".to_string()]);
    }

    #[test]
    fn cache_reuses_results_until_inputs_change() {
        let state = world();
        let mut cache = SelectorCache::default();

        let first = cache.room_groups(&state);
        let unrelated = apply(
            &state,
            vec![Change::create(Wallet::with_id("w1")).into()],
        );
        let second = cache.room_groups(&unrelated);
        assert!(Rc::ptr_eq(&first, &second));

        let renamed = apply(&unrelated, vec![Change::update(room("r1", "Aardvark")).into()]);
        let third = cache.room_groups(&renamed);
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(names(&third.unfollowed)[0], "Aardvark");
    }

    #[test]
    fn message_cache_is_keyed_by_room() {
        let state = apply(
            &world(),
            vec![Change::create(message("m1", "r1", "2024-01-01T00:00:00Z")).into()],
        );
        let mut cache = SelectorCache::default();
        let r1 = cache.messages_for_room(&state, "r1");
        let r2 = cache.messages_for_room(&state, "r2");
        assert_eq!(r1.len(), 1);
        assert!(r2.is_empty());
        assert!(Rc::ptr_eq(&r1, &cache.messages_for_room(&state, "r1")));
    }

    #[test]
    fn message_cache_forgets_rooms_after_messages_change() {
        let state = world();
        let mut cache = SelectorCache::default();
        for room_id in ["r1", "r2", "r3", "gone"] {
            cache.messages_for_room(&state, room_id);
        }
        assert_eq!(cache.messages.len(), 4);

        let next = apply(
            &state,
            vec![Change::create(message("m1", "r1", "2024-01-01T00:00:00Z")).into()],
        );
        assert_eq!(cache.messages_for_room(&next, "r1").len(), 1);
        assert_eq!(cache.messages.len(), 1);
    }
}
