//! Housing records pulled from the remote API, and the diff that decides
//! how a fetched collection changes the persisted one.

pub mod diff;
pub mod models;

pub use diff::{diff, Change, Changeset};
pub use models::{
    Address, Batch, Entity, EntityKind, Lifecycle, Name, Room, Snapshot, SnapshotError,
    SnapshotFilter, User,
};
