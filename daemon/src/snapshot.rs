use std::{collections::BTreeSet, sync::Arc};

use chrono::NaiveDate;
use housing_core::{Room, Snapshot, SnapshotFilter, User};
use tracing::{debug, info, warn};

use crate::store::{RecordStore, StoreError};

/// Outcome of [`SnapshotProjector::project_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
	pub created: Vec<Snapshot>,
	/// Locations whose snapshot failed validation.
	pub rejected: Vec<String>,
}

/// Derives per-location snapshots from committed rows and serves the
/// snapshot read model.
pub struct SnapshotProjector<S> {
	store: Arc<S>,
}

impl<S: RecordStore> SnapshotProjector<S> {
	pub fn new(store: Arc<S>) -> Self {
		Self { store }
	}

	/// Snapshot one location for `date`. Returns `None` if that pair was
	/// already recorded.
	pub async fn project(
		&self,
		date: NaiveDate,
		location: &str,
	) -> Result<Option<Snapshot>, StoreError> {
		let existing =
			self.store.snapshots(&SnapshotFilter::at_between(location, date, date)).await?;
		if !existing.is_empty() {
			debug!(%date, location, "snapshot already recorded");
			return Ok(None);
		}

		let rooms = self.store.all_active::<Room>().await?;
		let users = self.store.all_active::<User>().await?;
		let snapshot = build(date, location, &rooms, &users);
		self.store.append_snapshot(&snapshot).await?;

		Ok(Some(snapshot))
	}

	/// Snapshot every location that currently has an active room or user.
	///
	/// A location whose counts fail validation is logged and left out; the
	/// other locations are still recorded.
	pub async fn project_all(&self, date: NaiveDate) -> Result<Projection, StoreError> {
		let rooms = self.store.all_active::<Room>().await?;
		let users = self.store.all_active::<User>().await?;

		let recorded: BTreeSet<String> = self
			.store
			.snapshots(&SnapshotFilter::on(date))
			.await?
			.into_iter()
			.filter_map(|s| s.location)
			.collect();

		let mut projection = Projection::default();
		for location in locations(&rooms, &users) {
			if recorded.contains(&location) {
				continue;
			}
			let snapshot = build(date, &location, &rooms, &users);
			if let Err(e) = snapshot.validate() {
				warn!(%date, location = %location, error = %e, "skipping invalid snapshot");
				projection.rejected.push(location);
				continue;
			}
			self.store.append_snapshot(&snapshot).await?;
			projection.created.push(snapshot);
		}

		if !projection.created.is_empty() {
			info!(%date, count = projection.created.len(), "snapshots recorded");
		}
		Ok(projection)
	}

	pub async fn all(&self) -> Result<Vec<Snapshot>, StoreError> {
		self.store.snapshots(&SnapshotFilter::all()).await
	}

	pub async fn on(&self, date: NaiveDate) -> Result<Vec<Snapshot>, StoreError> {
		self.store.snapshots(&SnapshotFilter::on(date)).await
	}

	pub async fn between(
		&self,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<Snapshot>, StoreError> {
		self.store.snapshots(&SnapshotFilter::between(from, to)).await
	}

	pub async fn at(&self, location: &str) -> Result<Vec<Snapshot>, StoreError> {
		self.store.snapshots(&SnapshotFilter::at(location)).await
	}

	pub async fn at_between(
		&self,
		location: &str,
		from: NaiveDate,
		to: NaiveDate,
	) -> Result<Vec<Snapshot>, StoreError> {
		self.store.snapshots(&SnapshotFilter::at_between(location, from, to)).await
	}

	pub async fn locations(&self) -> Result<Vec<String>, StoreError> {
		self.store.snapshot_locations().await
	}
}

fn build(date: NaiveDate, location: &str, rooms: &[Room], users: &[User]) -> Snapshot {
	let at = |l: &Option<String>| l.as_deref().map(str::trim) == Some(location);
	let room_occupancy_count = rooms
		.iter()
		.filter(|r| at(&r.location))
		.fold(0i64, |total, r| total.saturating_add(r.occupancy));
	let users_here = users.iter().filter(|u| at(&u.location)).count();
	let user_count = i64::try_from(users_here).unwrap_or(i64::MAX);

	Snapshot::new(date, location, room_occupancy_count, user_count)
}

fn locations(rooms: &[Room], users: &[User]) -> BTreeSet<String> {
	rooms
		.iter()
		.filter_map(|r| r.location.as_deref())
		.chain(users.iter().filter_map(|u| u.location.as_deref()))
		.map(str::trim)
		.filter(|l| !l.is_empty())
		.map(str::to_string)
		.collect()
}
