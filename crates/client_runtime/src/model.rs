use std::{collections::BTreeMap, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    collection::EntityCollection,
    entities::{
        Alias, Device, DocFile, EntityId, Forum, ForumPost, ForumThread, Message, Position, Room,
        Team, Transaction, User, Wallet,
    },
    window_order::WindowOrder,
};

/// Display name of the identity used when nobody is logged in.
pub const ANONYMOUS_NAME: &str = "anonymous";
/// Id of the identity used when nobody is logged in.
pub const ANONYMOUS_ID: &str = "anonymous";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Online,
    #[default]
    Offline,
    Reconnecting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum UiMode {
    #[default]
    Normal,
    /// Help overlay, optionally pointed at one panel.
    Help { target: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Access level thresholds delivered by the server.
pub struct AccessLevels {
    pub anonymous: u32,
    pub standard: u32,
    pub pro: u32,
    pub moderator: u32,
    pub admin: u32,
    pub superuser: u32,
}

impl Default for AccessLevels {
    fn default() -> Self {
        Self {
            anonymous: 0,
            standard: 1,
            pro: 2,
            moderator: 11,
            admin: 12,
            superuser: 13,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultRooms {
    pub public_room_id: EntityId,
    /// Messages posted here show up in every room's message list.
    pub broadcast_room_id: EntityId,
}

impl Default for DefaultRooms {
    fn default() -> Self {
        Self {
            public_room_id: EntityId::from("public"),
            broadcast_room_id: EntityId::from("broadcast"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Server-delivered constants.
pub struct ClientConfig {
    pub access_levels: AccessLevels,
    pub default_rooms: DefaultRooms,
    pub feature_flags: BTreeMap<String, bool>,
}

impl ClientConfig {
    /// Unknown flags are off.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.feature_flags.get(flag).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted local values read at boot. All absent means anonymous.
pub struct BootSession {
    pub device_id: Option<String>,
    pub auth_token: Option<String>,
    pub user_id: Option<EntityId>,
    pub alias_id: Option<EntityId>,
}

impl BootSession {
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// "A user or one of their aliases", or nobody.
pub enum Identity {
    User(Rc<User>),
    Alias(Rc<Alias>),
    Anonymous,
}

impl Identity {
    pub fn id(&self) -> &str {
        match self {
            Self::User(user) => user.id.as_str(),
            Self::Alias(alias) => alias.id.as_str(),
            Self::Anonymous => ANONYMOUS_ID,
        }
    }

    /// Username or alias name. Entities that have not received their name yet render as `""`.
    pub fn display_name(&self) -> &str {
        match self {
            Self::User(user) => user.username.as_deref().unwrap_or_default(),
            Self::Alias(alias) => alias.alias_name.as_deref().unwrap_or_default(),
            Self::Anonymous => ANONYMOUS_NAME,
        }
    }

    pub fn following_rooms(&self) -> &[EntityId] {
        match self {
            Self::User(user) => user.following_rooms.as_deref().unwrap_or_default(),
            Self::Alias(alias) => alias.following_rooms.as_deref().unwrap_or_default(),
            Self::Anonymous => &[],
        }
    }

    pub fn access_level(&self) -> u32 {
        match self {
            Self::User(user) => user.access_level.unwrap_or(0),
            Self::Alias(alias) => alias.access_level.unwrap_or(0),
            Self::Anonymous => 0,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// One immutable snapshot of the whole client state.
///
/// Every slice is reference counted, so cloning a snapshot is cheap and slices untouched by a
/// dispatch stay pointer-equal between snapshots.
pub struct StoreState {
    pub users: EntityCollection<User>,
    pub aliases: EntityCollection<Alias>,
    pub rooms: EntityCollection<Room>,
    pub messages: EntityCollection<Message>,
    pub wallets: EntityCollection<Wallet>,
    pub transactions: EntityCollection<Transaction>,
    pub doc_files: EntityCollection<DocFile>,
    pub teams: EntityCollection<Team>,
    pub devices: EntityCollection<Device>,
    pub forums: EntityCollection<Forum>,
    pub forum_threads: EntityCollection<ForumThread>,
    pub forum_posts: EntityCollection<ForumPost>,
    pub positions: EntityCollection<Position>,
    pub current_user_id: Option<EntityId>,
    pub current_alias_id: Option<EntityId>,
    pub device_id: Option<String>,
    pub connection_status: ConnectionStatus,
    pub ui_mode: UiMode,
    pub config: Rc<ClientConfig>,
    pub windows: WindowOrder,
    /// Id of the window most recently brought to front that is still open.
    pub last_window: Option<String>,
}

impl StoreState {
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: Rc::new(config),
            ..Self::default()
        }
    }

    /// Whether `other` shares every slice with `self`, i.e. nothing observable changed.
    pub fn same_slices(&self, other: &Self) -> bool {
        self.users.ptr_eq(&other.users)
            && self.aliases.ptr_eq(&other.aliases)
            && self.rooms.ptr_eq(&other.rooms)
            && self.messages.ptr_eq(&other.messages)
            && self.wallets.ptr_eq(&other.wallets)
            && self.transactions.ptr_eq(&other.transactions)
            && self.doc_files.ptr_eq(&other.doc_files)
            && self.teams.ptr_eq(&other.teams)
            && self.devices.ptr_eq(&other.devices)
            && self.forums.ptr_eq(&other.forums)
            && self.forum_threads.ptr_eq(&other.forum_threads)
            && self.forum_posts.ptr_eq(&other.forum_posts)
            && self.positions.ptr_eq(&other.positions)
            && self.current_user_id == other.current_user_id
            && self.current_alias_id == other.current_alias_id
            && self.device_id == other.device_id
            && self.connection_status == other.connection_status
            && self.ui_mode == other.ui_mode
            && Rc::ptr_eq(&self.config, &other.config)
            && self.windows.ptr_eq(&other.windows)
            && self.last_window == other.last_window
    }
}
