//! Scripted collaborators shared by the engine tests.

use std::{
	collections::HashMap,
	sync::atomic::{AtomicBool, AtomicUsize, Ordering},
	time::Duration,
};

use async_trait::async_trait;
use housing_core::{Entity, EntityKind, Snapshot, SnapshotFilter};
use parking_lot::Mutex;

use crate::{
	fetcher::{FetchError, RemoteSource},
	store::{MemoryStore, RecordStore, StoreError, UnitOfWork},
};

/// Serves canned JSON per kind; a kind with no body fails like an outage.
#[derive(Default)]
pub struct CannedSource {
	bodies: Mutex<HashMap<EntityKind, serde_json::Value>>,
	delay: Mutex<Option<Duration>>,
	panic_on: Mutex<Option<EntityKind>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
	calls: AtomicUsize,
}

impl CannedSource {
	pub fn serve(&self, kind: EntityKind, body: serde_json::Value) {
		self.bodies.lock().insert(kind, body);
	}

	pub fn slow_down(&self, delay: Duration) {
		*self.delay.lock() = Some(delay);
	}

	pub fn panic_on(&self, kind: EntityKind) {
		*self.panic_on.lock() = Some(kind);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl RemoteSource for CannedSource {
	async fn fetch<T: Entity>(&self) -> Result<Vec<T>, FetchError> {
		let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(now, Ordering::SeqCst);
		self.calls.fetch_add(1, Ordering::SeqCst);

		let delay = *self.delay.lock();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		self.in_flight.fetch_sub(1, Ordering::SeqCst);

		let panic_on = *self.panic_on.lock();
		if panic_on == Some(T::KIND) {
			panic!("scripted panic while fetching {}", T::KIND);
		}

		let body = self.bodies.lock().get(&T::KIND).cloned();
		match body {
			Some(body) => serde_json::from_value(body).map_err(|e| FetchError::Decode {
				url: T::KIND.model().into(),
				reason: e.to_string(),
			}),
			None => Err(FetchError::Status { url: T::KIND.model().into(), status: 500 }),
		}
	}
}

/// MemoryStore whose commits for one kind fail while `broken` is set.
pub struct FlakyStore {
	pub inner: MemoryStore,
	pub kind: EntityKind,
	pub broken: AtomicBool,
}

impl FlakyStore {
	pub fn new(kind: EntityKind) -> Self {
		Self { inner: MemoryStore::new(), kind, broken: AtomicBool::new(true) }
	}

	pub fn repair(&self) {
		self.broken.store(false, Ordering::SeqCst);
	}
}

#[async_trait]
impl RecordStore for FlakyStore {
	async fn find_by_key<T: Entity>(&self, key: &str) -> Result<Option<T>, StoreError> {
		self.inner.find_by_key(key).await
	}

	async fn all<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
		self.inner.all().await
	}

	async fn commit<T: Entity>(&self, work: UnitOfWork<T>) -> Result<(), StoreError> {
		if T::KIND == self.kind && self.broken.load(Ordering::SeqCst) {
			return Err(StoreError::Db("connection reset".into()));
		}
		self.inner.commit(work).await
	}

	async fn append_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		self.inner.append_snapshot(snapshot).await
	}

	async fn snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, StoreError> {
		self.inner.snapshots(filter).await
	}

	async fn snapshot_locations(&self) -> Result<Vec<String>, StoreError> {
		self.inner.snapshot_locations().await
	}
}
