//! Entity kinds synchronized from the server and their shallow-merge rules.
//!
//! Every entity carries a required `id` and treats every other field as optional: a field that
//! is `None` was simply not carried by the partial that produced the value. Unknown top-level
//! wire fields are kept in `extra` so they survive merges as well.

use std::{borrow::Borrow, fmt};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    collection::{Change, EntityCollection},
    model::StoreState,
    reducer::EntityChange,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Opaque identifier, unique within one entity kind.
pub struct EntityId(pub String);

impl EntityId {
    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is missing (empty).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Every entity kind the store keeps a collection for.
pub enum EntityKind {
    Users,
    Aliases,
    Rooms,
    Messages,
    Wallets,
    Transactions,
    DocFiles,
    Teams,
    Devices,
    Forums,
    ForumThreads,
    ForumPosts,
    Positions,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [EntityKind; 13] = [
        Self::Users,
        Self::Aliases,
        Self::Rooms,
        Self::Messages,
        Self::Wallets,
        Self::Transactions,
        Self::DocFiles,
        Self::Teams,
        Self::Devices,
        Self::Forums,
        Self::ForumThreads,
        Self::ForumPosts,
        Self::Positions,
    ];

    /// Wire name used by socket events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Aliases => "aliases",
            Self::Rooms => "rooms",
            Self::Messages => "messages",
            Self::Wallets => "wallets",
            Self::Transactions => "transactions",
            Self::DocFiles => "docFiles",
            Self::Teams => "teams",
            Self::Devices => "devices",
            Self::Forums => "forums",
            Self::ForumThreads => "forumThreads",
            Self::ForumPosts => "forumPosts",
            Self::Positions => "positions",
        }
    }

    /// Parses a wire kind name. Singular forms (`"room"`, `"docFile"`) are accepted too.
    pub fn from_wire(name: &str) -> Option<Self> {
        let kind = match name {
            "users" | "user" => Self::Users,
            "aliases" | "alias" => Self::Aliases,
            "rooms" | "room" => Self::Rooms,
            "messages" | "message" => Self::Messages,
            "wallets" | "wallet" => Self::Wallets,
            "transactions" | "transaction" => Self::Transactions,
            "docFiles" | "docFile" => Self::DocFiles,
            "teams" | "team" => Self::Teams,
            "devices" | "device" => Self::Devices,
            "forums" | "forum" => Self::Forums,
            "forumThreads" | "forumThread" => Self::ForumThreads,
            "forumPosts" | "forumPost" => Self::ForumPosts,
            "positions" | "position" => Self::Positions,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A uniquely identified record kept in an [`EntityCollection`].
pub trait Entity: Clone + PartialEq + fmt::Debug + Default + Serialize + DeserializeOwned {
    /// Kind tag of the collection this entity lives in.
    const KIND: EntityKind;

    /// Stable identifier.
    fn id(&self) -> &EntityId;

    /// Shallow merge by top-level key: every field present in `incoming` overwrites the
    /// corresponding field of `self`; absent fields are kept. Nested values are replaced whole,
    /// never merged, and `null` counts as absent.
    fn merge_from(&mut self, incoming: &Self);

    /// A bare entity carrying only `id`, used to address removals.
    fn with_id(id: impl Into<EntityId>) -> Self;

    /// The collection holding this kind in a snapshot.
    fn collection(state: &StoreState) -> &EntityCollection<Self>;

    /// Tags a typed change with its kind.
    fn tag_change(change: Change<Self>) -> EntityChange;
}

macro_rules! entity {
    (
        $(#[$meta:meta])*
        pub struct $name:ident ($variant:ident, $slot:ident) {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            #[serde(default)]
            pub id: EntityId,
            $(
                $(#[$fmeta])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        impl Entity for $name {
            const KIND: EntityKind = EntityKind::$variant;

            fn id(&self) -> &EntityId {
                &self.id
            }

            fn merge_from(&mut self, incoming: &Self) {
                $(
                    if let Some(value) = &incoming.$field {
                        self.$field = Some(value.clone());
                    }
                )*
                for (key, value) in &incoming.extra {
                    if !value.is_null() {
                        self.extra.insert(key.clone(), value.clone());
                    }
                }
            }

            fn with_id(id: impl Into<EntityId>) -> Self {
                Self {
                    id: id.into(),
                    ..Self::default()
                }
            }

            fn collection(state: &StoreState) -> &EntityCollection<Self> {
                &state.$slot
            }

            fn tag_change(change: Change<Self>) -> EntityChange {
                EntityChange::$variant(change)
            }
        }
    };
}

entity! {
    /// A registered account.
    pub struct User (Users, users) {
        pub username: String,
        pub full_name: String,
        pub alias_ids: Vec<EntityId>,
        pub following_rooms: Vec<EntityId>,
        pub team_ids: Vec<EntityId>,
        pub access_level: u32,
        pub is_online: bool,
        pub is_banned: bool,
        pub last_online: String,
    }
}

entity! {
    /// An alternate public identity owned by a user.
    pub struct Alias (Aliases, aliases) {
        pub alias_name: String,
        pub owner_id: EntityId,
        pub following_rooms: Vec<EntityId>,
        pub access_level: u32,
        pub is_public: bool,
    }
}

entity! {
    /// A chat room. Whisper rooms are direct conversations between their participants.
    pub struct Room (Rooms, rooms) {
        pub room_name: String,
        pub topic: String,
        pub owner_id: EntityId,
        pub owner_alias_id: EntityId,
        pub is_whisper: bool,
        pub participant_ids: Vec<EntityId>,
        pub access_level: u32,
        pub password_protected: bool,
        pub last_message_at: String,
    }
}

entity! {
    /// A chat message posted to a room.
    pub struct Message (Messages, messages) {
        pub room_id: EntityId,
        pub owner_id: EntityId,
        pub owner_alias_id: EntityId,
        pub text: Vec<String>,
        /// ISO-8601 UTC timestamp; orders lexicographically.
        pub time_created: String,
        pub message_type: String,
    }
}

entity! {
    /// A currency balance owned by a user or one of their aliases.
    pub struct Wallet (Wallets, wallets) {
        pub owner_id: EntityId,
        pub owner_alias_id: EntityId,
        pub amount: i64,
        pub is_protected: bool,
    }
}

entity! {
    /// A transfer between two wallets.
    pub struct Transaction (Transactions, transactions) {
        pub from_wallet_id: EntityId,
        pub to_wallet_id: EntityId,
        pub amount: i64,
        pub note: String,
        pub time_created: String,
    }
}

entity! {
    /// A user-authored document.
    pub struct DocFile (DocFiles, doc_files) {
        pub title: String,
        pub text: Vec<String>,
        pub owner_id: EntityId,
        pub owner_alias_id: EntityId,
        pub is_public: bool,
        pub code: String,
    }
}

entity! {
    /// A group of users sharing a team room and wallet.
    pub struct Team (Teams, teams) {
        pub team_name: String,
        pub short_name: String,
        pub owner_id: EntityId,
        pub member_ids: Vec<EntityId>,
        pub is_verified: bool,
    }
}

entity! {
    /// A client device that has connected on behalf of a user.
    pub struct Device (Devices, devices) {
        pub device_name: String,
        pub owner_id: EntityId,
        pub last_user_id: EntityId,
        pub last_alias_id: EntityId,
    }
}

entity! {
    /// A top-level discussion board.
    pub struct Forum (Forums, forums) {
        pub title: String,
        pub text: Vec<String>,
        pub owner_id: EntityId,
        pub is_public: bool,
    }
}

entity! {
    /// A thread inside a forum.
    pub struct ForumThread (ForumThreads, forum_threads) {
        pub forum_id: EntityId,
        pub title: String,
        pub text: Vec<String>,
        pub owner_id: EntityId,
        pub owner_alias_id: EntityId,
    }
}

entity! {
    /// A post inside a forum thread.
    pub struct ForumPost (ForumPosts, forum_posts) {
        pub thread_id: EntityId,
        pub parent_post_id: EntityId,
        pub text: Vec<String>,
        pub owner_id: EntityId,
        pub owner_alias_id: EntityId,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Geographic point with accuracy radius in metres.
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f64,
}

entity! {
    /// A named location on the world map.
    pub struct Position (Positions, positions) {
        pub position_name: String,
        pub position_type: String,
        pub owner_id: EntityId,
        pub coordinates: Coordinates,
        pub is_static: bool,
    }
}
