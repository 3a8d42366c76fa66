mod address;
mod batch;
mod name;
mod room;
mod snapshot;
mod user;

use std::fmt;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use address::Address;
pub use batch::Batch;
pub use name::Name;
pub use room::Room;
pub use snapshot::{Snapshot, SnapshotError, SnapshotFilter};
pub use user::User;

/// The entity kinds pulled from the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Address,
    Name,
    Batch,
    Room,
    User,
}

impl EntityKind {
    /// Model segment of the remote endpoint: `{base}/api/{model}`.
    pub fn model(self) -> &'static str {
        match self {
            EntityKind::Address => "address",
            EntityKind::Name => "name",
            EntityKind::Batch => "batch",
            EntityKind::Room => "room",
            EntityKind::User => "user",
        }
    }

    /// Table holding the persisted rows of this kind.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Address => "addresses",
            EntityKind::Name => "names",
            EntityKind::Batch => "batches",
            EntityKind::Room => "rooms",
            EntityKind::User => "users",
        }
    }

    /// Serialized name of the key field.
    pub fn key_field(self) -> &'static str {
        match self {
            EntityKind::Address => "addressId",
            EntityKind::Name => "nameId",
            EntityKind::Batch => "batchId",
            EntityKind::Room => "roomId",
            EntityKind::User => "userId",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.model())
    }
}

/// Bookkeeping dates shared by every reconciled row.
///
/// Neither field is tracked: `created` is written once on insert and
/// `deleted` once on disappearance. Remote payloads usually omit both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lifecycle {
    #[serde(default)]
    pub created: Option<NaiveDate>,
    #[serde(default)]
    pub deleted: Option<NaiveDate>,
}

/// A remotely sourced row that can be diffed against its persisted copy.
pub trait Entity:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    fn key(&self) -> &str;

    fn lifecycle(&self) -> &Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// True when every tracked field matches. References compare by key.
    fn tracked_eq(&self, other: &Self) -> bool;

    /// Overwrite tracked fields with `other`'s, leaving key and lifecycle alone.
    fn copy_tracked(&mut self, other: &Self);

    fn is_active(&self) -> bool {
        self.lifecycle().deleted.is_none()
    }
}
