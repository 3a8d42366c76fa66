mod memory;
mod surreal;

use async_trait::async_trait;
use housing_core::{Entity, EntityKind, Snapshot, SnapshotError, SnapshotFilter};
use thiserror::Error;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Db(String),

	#[error("{kind} {key} already exists")]
	Conflict { kind: EntityKind, key: String },

	#[error("{kind} {key} does not exist")]
	Missing { kind: EntityKind, key: String },

	#[error("failed to decode {what}: {reason}")]
	Decode { what: String, reason: String },

	#[error("invalid snapshot: {0}")]
	InvalidSnapshot(#[from] SnapshotError),
}

/// Writes for one entity kind, queued until [`RecordStore::commit`].
#[derive(Debug, Clone)]
pub struct UnitOfWork<T> {
	updates: Vec<T>,
	adds: Vec<T>,
}

impl<T> Default for UnitOfWork<T> {
	fn default() -> Self {
		Self { updates: Vec::new(), adds: Vec::new() }
	}
}

impl<T: Entity> UnitOfWork<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue a new row. Committing fails if the key is already stored.
	pub fn add(&mut self, record: T) {
		self.adds.push(record);
	}

	/// Queue a full rewrite of an existing row.
	pub fn update(&mut self, record: T) {
		self.updates.push(record);
	}

	pub fn updates(&self) -> &[T] {
		&self.updates
	}

	pub fn adds(&self) -> &[T] {
		&self.adds
	}

	pub fn len(&self) -> usize {
		self.updates.len() + self.adds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Persistent home of reconciled rows and snapshots.
///
/// `commit` is all-or-nothing: afterwards either every queued write of the
/// unit is visible to reads or none is. Updates are applied before adds.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
	async fn find_by_key<T: Entity>(&self, key: &str) -> Result<Option<T>, StoreError>;

	/// Every row of the kind, deleted ones included, ordered by key.
	async fn all<T: Entity>(&self) -> Result<Vec<T>, StoreError>;

	async fn all_active<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
		let rows = self.all::<T>().await?;
		Ok(rows.into_iter().filter(|r| r.is_active()).collect())
	}

	async fn commit<T: Entity>(&self, work: UnitOfWork<T>) -> Result<(), StoreError>;

	/// Validates, then appends. Snapshots are never rewritten.
	async fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

	/// Matching snapshots ordered by date, then location.
	async fn snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, StoreError>;

	/// Distinct snapshot locations, sorted.
	async fn snapshot_locations(&self) -> Result<Vec<String>, StoreError>;
}

fn decode<T: serde::de::DeserializeOwned>(
	what: &str,
	value: serde_json::Value,
) -> Result<T, StoreError> {
	serde_json::from_value(value)
		.map_err(|e| StoreError::Decode { what: what.to_string(), reason: e.to_string() })
}

fn encode<T: serde::Serialize + ?Sized>(
	what: &str,
	value: &T,
) -> Result<serde_json::Value, StoreError> {
	serde_json::to_value(value)
		.map_err(|e| StoreError::Decode { what: what.to_string(), reason: e.to_string() })
}

fn sort_snapshots(snapshots: &mut [Snapshot]) {
	snapshots.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.location.cmp(&b.location)));
}
