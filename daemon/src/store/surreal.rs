use std::collections::BTreeSet;

use async_trait::async_trait;
use housing_core::{Entity, Snapshot, SnapshotFilter};

use super::{decode, encode, sort_snapshots, RecordStore, StoreError, UnitOfWork};
use crate::db::{DbHandle, SNAPSHOT_TABLE};

/// SurrealDB-backed store. Each kind lives in its own table, with the
/// entity key doubling as the record id.
#[derive(Clone)]
pub struct SurrealStore {
	handle: DbHandle,
}

impl SurrealStore {
	pub fn new(handle: DbHandle) -> Self {
		Self { handle }
	}
}

#[async_trait]
impl RecordStore for SurrealStore {
	async fn find_by_key<T: Entity>(&self, key: &str) -> Result<Option<T>, StoreError> {
		let table = T::KIND.table();
		let mut response = self
			.handle
			.db
			.query(format!("SELECT * OMIT id FROM type::record('{table}', $key)"))
			.bind(("key", key.to_string()))
			.await
			.map_err(|e| StoreError::Db(e.to_string()))?;

		let row: Option<serde_json::Value> = response
			.take(0)
			.map_err(|e| StoreError::Db(e.to_string()))?;

		row.map(|v| decode(T::KIND.model(), v)).transpose()
	}

	async fn all<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
		let kind = T::KIND;
		let mut response = self
			.handle
			.db
			.query(format!(
				"SELECT * OMIT id FROM {table} ORDER BY {key}",
				table = kind.table(),
				key = kind.key_field(),
			))
			.await
			.map_err(|e| StoreError::Db(e.to_string()))?;

		let rows: Vec<serde_json::Value> = response
			.take(0)
			.map_err(|e| StoreError::Db(e.to_string()))?;

		rows.into_iter().map(|v| decode(kind.model(), v)).collect()
	}

	/// One transaction per unit. A `CREATE` on an existing record id fails,
	/// which rolls back every other statement in the unit.
	async fn commit<T: Entity>(&self, work: UnitOfWork<T>) -> Result<(), StoreError> {
		if work.is_empty() {
			return Ok(());
		}

		let kind = T::KIND;
		let updates = encode(kind.model(), work.updates())?;
		let adds = encode(kind.model(), work.adds())?;

		self.handle
			.db
			.query(format!(
				"BEGIN TRANSACTION;
				FOR $row IN $updates {{
					UPDATE type::record('{table}', $row.{key}) CONTENT $row;
				}};
				FOR $row IN $adds {{
					CREATE type::record('{table}', $row.{key}) CONTENT $row;
				}};
				COMMIT TRANSACTION;",
				table = kind.table(),
				key = kind.key_field(),
			))
			.bind(("updates", updates))
			.bind(("adds", adds))
			.await
			.map_err(|e| StoreError::Db(e.to_string()))?
			.check()
			.map_err(|e| StoreError::Db(format!("{kind} commit aborted: {e}")))?;

		Ok(())
	}

	async fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		snapshot.validate()?;
		let content = encode("snapshot", snapshot)?;

		self.handle
			.db
			.query(format!("CREATE type::record('{SNAPSHOT_TABLE}', $id) CONTENT $content"))
			.bind(("id", snapshot.id.clone()))
			.bind(("content", content))
			.await
			.map_err(|e| StoreError::Db(e.to_string()))?
			.check()
			.map_err(|e| StoreError::Db(e.to_string()))?;

		Ok(())
	}

	async fn snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, StoreError> {
		let mut conditions = Vec::new();
		if filter.location.is_some() {
			conditions.push("location = $location");
		}
		if filter.from.is_some() {
			conditions.push("date >= $from");
		}
		if filter.to.is_some() {
			conditions.push("date <= $to");
		}
		let where_clause = if conditions.is_empty() {
			String::new()
		} else {
			format!(" WHERE {}", conditions.join(" AND "))
		};

		// ISO dates compare correctly as strings.
		let mut query = self
			.handle
			.db
			.query(format!("SELECT * OMIT id FROM {SNAPSHOT_TABLE}{where_clause}"));
		if let Some(location) = &filter.location {
			query = query.bind(("location", location.clone()));
		}
		if let Some(from) = filter.from {
			query = query.bind(("from", from.to_string()));
		}
		if let Some(to) = filter.to {
			query = query.bind(("to", to.to_string()));
		}

		let mut response = query.await.map_err(|e| StoreError::Db(e.to_string()))?;
		let rows: Vec<serde_json::Value> = response
			.take(0)
			.map_err(|e| StoreError::Db(e.to_string()))?;

		let mut snapshots = rows
			.into_iter()
			.map(|v| decode("snapshot", v))
			.collect::<Result<Vec<Snapshot>, _>>()?;
		sort_snapshots(&mut snapshots);
		Ok(snapshots)
	}

	async fn snapshot_locations(&self) -> Result<Vec<String>, StoreError> {
		let mut response = self
			.handle
			.db
			.query(format!("SELECT VALUE location FROM {SNAPSHOT_TABLE}"))
			.await
			.map_err(|e| StoreError::Db(e.to_string()))?;

		let values: Vec<serde_json::Value> = response
			.take(0)
			.map_err(|e| StoreError::Db(e.to_string()))?;

		let locations: BTreeSet<String> = values
			.into_iter()
			.filter_map(|v| v.as_str().map(str::to_string))
			.collect();
		Ok(locations.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::NaiveDate;
	use housing_core::{EntityKind, Lifecycle, Room};

	use super::*;
	use crate::{
		db,
		engine::{reconcile, SweepPolicy, SyncService},
		testing::CannedSource,
	};

	fn room(id: &str, vacancy: i64) -> Room {
		Room {
			room_id: id.into(),
			address_id: Some("a1".into()),
			location: Some("Reston".into()),
			occupancy: 4,
			gender: None,
			vacancy,
			lifecycle: Lifecycle { created: NaiveDate::from_ymd_opt(2026, 1, 1), deleted: None },
		}
	}

	async fn store() -> SurrealStore {
		SurrealStore::new(db::open_in_memory().await.unwrap())
	}

	#[tokio::test]
	async fn commit_then_read_back() {
		let store = store().await;
		let mut work = UnitOfWork::new();
		work.add(room("R1", 10));
		work.add(room("R2", 3));
		store.commit(work).await.unwrap();

		let mut work = UnitOfWork::new();
		work.update(room("R1", 5));
		store.commit(work).await.unwrap();

		let r1: Room = store.find_by_key("R1").await.unwrap().unwrap();
		assert_eq!(r1.vacancy, 5);
		assert_eq!(r1.gender, None);
		assert_eq!(r1.lifecycle.created, NaiveDate::from_ymd_opt(2026, 1, 1));

		let all = store.all::<Room>().await.unwrap();
		let keys: Vec<&str> = all.iter().map(|r| r.room_id.as_str()).collect();
		assert_eq!(keys, vec!["R1", "R2"]);
	}

	#[tokio::test]
	async fn duplicate_add_rolls_back_the_whole_unit() {
		let store = store().await;
		let mut work = UnitOfWork::new();
		work.add(room("R1", 10));
		store.commit(work).await.unwrap();

		let mut work = UnitOfWork::new();
		work.update(room("R1", 1));
		work.add(room("R2", 2));
		work.add(room("R1", 3));
		assert!(store.commit(work).await.is_err());

		let r1: Room = store.find_by_key("R1").await.unwrap().unwrap();
		assert_eq!(r1.vacancy, 10);
		assert!(store.find_by_key::<Room>("R2").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn snapshot_queries_filter_and_order() {
		let store = store().await;
		let day = |d| NaiveDate::from_ymd_opt(2026, 4, d).unwrap();
		for (d, loc) in [(3, "Tampa"), (1, "Reston"), (2, "Tampa"), (1, "Tampa")] {
			store.append_snapshot(&Snapshot::new(day(d), loc, 4, 2)).await.unwrap();
		}

		let all = store.snapshots(&SnapshotFilter::all()).await.unwrap();
		let order: Vec<(NaiveDate, &str)> =
			all.iter().map(|s| (s.date.unwrap(), s.location.as_deref().unwrap())).collect();
		assert_eq!(
			order,
			vec![(day(1), "Reston"), (day(1), "Tampa"), (day(2), "Tampa"), (day(3), "Tampa")]
		);

		let tampa =
			store.snapshots(&SnapshotFilter::at_between("Tampa", day(2), day(3))).await.unwrap();
		assert_eq!(tampa.len(), 2);

		let first = store.snapshots(&SnapshotFilter::on(day(1))).await.unwrap();
		assert_eq!(first.len(), 2);

		assert_eq!(store.snapshot_locations().await.unwrap(), vec!["Reston", "Tampa"]);
	}

	#[tokio::test]
	async fn reconcile_through_the_database_is_idempotent() {
		let store = store().await;
		let mut work = UnitOfWork::new();
		work.add(room("R1", 10));
		work.add(room("R2", 3));
		store.commit(work).await.unwrap();

		let source = CannedSource::default();
		source.serve(
			EntityKind::Room,
			serde_json::json!([{
				"roomId": "R1",
				"addressId": "a1",
				"location": "Reston",
				"occupancy": 4,
				"vacancy": 5
			}]),
		);
		let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
		let policy = SweepPolicy::default();

		let first = reconcile::<Room, _, _>(&store, &source, policy, today).await.unwrap();
		assert_eq!((first.updated, first.deleted), (1, 1));

		let second = reconcile::<Room, _, _>(&store, &source, policy, today).await.unwrap();
		assert_eq!(second.writes(), 0);

		let r1: Room = store.find_by_key("R1").await.unwrap().unwrap();
		assert_eq!(r1.vacancy, 5);
		assert_eq!(r1.lifecycle.deleted, None);
		let r2: Room = store.find_by_key("R2").await.unwrap().unwrap();
		assert_eq!(r2.lifecycle.deleted, Some(today));
	}

	#[tokio::test]
	async fn full_cycle_against_the_database() {
		let store = Arc::new(store().await);
		let source = Arc::new(CannedSource::default());
		let bodies = [
			(EntityKind::Address, serde_json::json!([{ "addressId": "a1", "city": "Reston" }])),
			(EntityKind::Name, serde_json::json!([{ "nameId": "n1", "first": "Ann" }])),
			(EntityKind::User, serde_json::json!([{ "userId": "u1", "location": "Reston" }])),
			(
				EntityKind::Room,
				serde_json::json!([{ "roomId": "r1", "location": "Reston", "occupancy": 2 }]),
			),
			(
				EntityKind::Batch,
				serde_json::json!([{ "batchId": "b1", "startDate": "2026-09-01" }]),
			),
		];
		for (kind, body) in bodies {
			source.serve(kind, body);
		}
		let service =
			SyncService::new(store.clone(), source, SweepPolicy::default()).with_snapshots(true);
		let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

		let first = service.run_cycle(today).await.unwrap();
		assert_eq!((first.writes(), first.snapshots), (5, 1));

		let second = service.run_cycle(today).await.unwrap();
		assert_eq!((second.writes(), second.snapshots), (0, 0));

		let snaps = store.snapshots(&SnapshotFilter::on(today)).await.unwrap();
		assert_eq!((snaps[0].room_occupancy_count, snaps[0].user_count), (2, 1));
	}
}
