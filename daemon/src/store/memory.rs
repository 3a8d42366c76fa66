use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use housing_core::{Entity, EntityKind, Snapshot, SnapshotFilter};
use parking_lot::Mutex;

use super::{decode, encode, sort_snapshots, RecordStore, StoreError, UnitOfWork};

type Table = BTreeMap<String, serde_json::Value>;

/// In-process store with the same commit contract as the database:
/// every queued write is checked before any is applied.
#[derive(Default)]
pub struct MemoryStore {
	tables: Mutex<HashMap<EntityKind, Table>>,
	snapshots: Mutex<Vec<Snapshot>>,
	commits: Mutex<u64>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed rows directly, bypassing reconciliation.
	pub fn seed<T: Entity>(&self, rows: impl IntoIterator<Item = T>) -> Result<(), StoreError> {
		let mut tables = self.tables.lock();
		let table = tables.entry(T::KIND).or_default();
		for row in rows {
			table.insert(row.key().to_string(), encode(T::KIND.model(), &row)?);
		}
		Ok(())
	}

	/// Number of successful non-empty commits so far.
	pub fn commit_count(&self) -> u64 {
		*self.commits.lock()
	}
}

#[async_trait]
impl RecordStore for MemoryStore {
	async fn find_by_key<T: Entity>(&self, key: &str) -> Result<Option<T>, StoreError> {
		let value = self.tables.lock().get(&T::KIND).and_then(|t| t.get(key).cloned());
		value.map(|v| decode(T::KIND.model(), v)).transpose()
	}

	async fn all<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
		let values: Vec<serde_json::Value> = self
			.tables
			.lock()
			.get(&T::KIND)
			.map(|t| t.values().cloned().collect())
			.unwrap_or_default();
		values.into_iter().map(|v| decode(T::KIND.model(), v)).collect()
	}

	async fn commit<T: Entity>(&self, work: UnitOfWork<T>) -> Result<(), StoreError> {
		if work.is_empty() {
			return Ok(());
		}

		let mut encoded = Vec::with_capacity(work.len());
		for row in work.updates().iter().chain(work.adds()) {
			encoded.push((row.key().to_string(), encode(T::KIND.model(), row)?));
		}

		let mut tables = self.tables.lock();
		let table = tables.entry(T::KIND).or_default();

		for row in work.updates() {
			if !table.contains_key(row.key()) {
				return Err(StoreError::Missing { kind: T::KIND, key: row.key().to_string() });
			}
		}
		let mut added = HashSet::new();
		for row in work.adds() {
			if table.contains_key(row.key()) || !added.insert(row.key()) {
				return Err(StoreError::Conflict { kind: T::KIND, key: row.key().to_string() });
			}
		}

		for (key, value) in encoded {
			table.insert(key, value);
		}
		*self.commits.lock() += 1;
		Ok(())
	}

	async fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		snapshot.validate()?;
		let mut snapshots = self.snapshots.lock();
		if snapshots.iter().any(|s| s.id == snapshot.id) {
			return Err(StoreError::Db(format!("snapshot {} already exists", snapshot.id)));
		}
		snapshots.push(snapshot.clone());
		Ok(())
	}

	async fn snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, StoreError> {
		let mut found: Vec<Snapshot> =
			self.snapshots.lock().iter().filter(|s| filter.matches(s)).cloned().collect();
		sort_snapshots(&mut found);
		Ok(found)
	}

	async fn snapshot_locations(&self) -> Result<Vec<String>, StoreError> {
		let locations: BTreeSet<String> =
			self.snapshots.lock().iter().filter_map(|s| s.location.clone()).collect();
		Ok(locations.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;
	use housing_core::{Lifecycle, Name};

	use super::*;

	fn name(id: &str, first: &str) -> Name {
		Name {
			name_id: id.into(),
			first: Some(first.into()),
			middle: None,
			last: Some("Doe".into()),
			lifecycle: Lifecycle::default(),
		}
	}

	#[tokio::test]
	async fn commit_applies_updates_and_adds() {
		let store = MemoryStore::new();
		store.seed([name("n1", "Ann")]).unwrap();

		let mut work = UnitOfWork::new();
		work.update(name("n1", "Anna"));
		work.add(name("n2", "Bo"));
		store.commit(work).await.unwrap();

		let n1: Name = store.find_by_key("n1").await.unwrap().unwrap();
		assert_eq!(n1.first.as_deref(), Some("Anna"));
		assert_eq!(store.all::<Name>().await.unwrap().len(), 2);
		assert_eq!(store.commit_count(), 1);
	}

	#[tokio::test]
	async fn conflicting_add_leaves_store_untouched() {
		let store = MemoryStore::new();
		store.seed([name("n1", "Ann")]).unwrap();

		let mut work = UnitOfWork::new();
		work.update(name("n1", "Changed"));
		work.add(name("n1", "Dup"));
		let err = store.commit(work).await.unwrap_err();

		assert!(matches!(err, StoreError::Conflict { kind: EntityKind::Name, .. }));
		let n1: Name = store.find_by_key("n1").await.unwrap().unwrap();
		assert_eq!(n1.first.as_deref(), Some("Ann"));
		assert_eq!(store.commit_count(), 0);
	}

	#[tokio::test]
	async fn update_of_unknown_key_is_rejected() {
		let store = MemoryStore::new();
		let mut work = UnitOfWork::new();
		work.add(name("n2", "Bo"));
		work.update(name("n1", "Ghost"));

		let err = store.commit(work).await.unwrap_err();
		assert!(matches!(err, StoreError::Missing { .. }));
		assert!(store.all::<Name>().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn all_active_hides_deleted_rows() {
		let store = MemoryStore::new();
		let mut gone = name("n2", "Bo");
		gone.lifecycle.deleted = NaiveDate::from_ymd_opt(2026, 5, 1);
		store.seed([name("n1", "Ann"), gone]).unwrap();

		assert_eq!(store.all::<Name>().await.unwrap().len(), 2);
		let active = store.all_active::<Name>().await.unwrap();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].name_id, "n1");
	}

	#[tokio::test]
	async fn invalid_snapshot_is_not_appended() {
		let store = MemoryStore::new();
		let mut snap = Snapshot::new(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(), "Tampa", 1, 1);
		snap.user_count = -1;

		let err = store.append_snapshot(&snap).await.unwrap_err();
		assert!(matches!(err, StoreError::InvalidSnapshot(_)));
		assert!(store.snapshots(&SnapshotFilter::all()).await.unwrap().is_empty());
	}
}
