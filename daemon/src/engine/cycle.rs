use std::sync::Arc;

use chrono::NaiveDate;
use housing_core::{Address, Batch, Entity, EntityKind, Name, Room, User};
use thiserror::Error;

use super::reconciler::{reconcile, KindReport, SweepPolicy};
use crate::{
	fetcher::RemoteSource,
	snapshot::SnapshotProjector,
	store::{RecordStore, StoreError},
};

/// Kinds in the order one cycle reconciles them. Referenced kinds come
/// first so a new user rarely points at a room that is not stored yet.
pub const CYCLE_ORDER: [EntityKind; 5] = [
	EntityKind::Address,
	EntityKind::Name,
	EntityKind::User,
	EntityKind::Room,
	EntityKind::Batch,
];

#[derive(Debug, Error)]
pub enum SyncError {
	#[error("reconciling {kind} failed: {source}")]
	Reconcile { kind: EntityKind, source: StoreError },

	#[error("snapshot projection failed: {0}")]
	Snapshot(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
	pub date: NaiveDate,
	pub kinds: Vec<KindReport>,
	pub snapshots: usize,
}

impl CycleReport {
	pub fn writes(&self) -> usize {
		self.kinds.iter().map(KindReport::writes).sum()
	}

	pub fn skipped(&self) -> impl Iterator<Item = &KindReport> {
		self.kinds.iter().filter(|k| k.skipped.is_some())
	}
}

/// One full pass over every kind, shared by the poller and one-shot runs.
pub struct SyncService<S, R> {
	store: Arc<S>,
	source: Arc<R>,
	policy: SweepPolicy,
	snapshots_after_cycle: bool,
}

impl<S: RecordStore, R: RemoteSource> SyncService<S, R> {
	pub fn new(store: Arc<S>, source: Arc<R>, policy: SweepPolicy) -> Self {
		Self { store, source, policy, snapshots_after_cycle: false }
	}

	pub fn with_snapshots(mut self, enabled: bool) -> Self {
		self.snapshots_after_cycle = enabled;
		self
	}

	pub fn store(&self) -> &Arc<S> {
		&self.store
	}

	/// Reconcile every kind in [`CYCLE_ORDER`]. The first store error
	/// abandons the rest of the cycle; kinds already committed stay committed.
	pub async fn run_cycle(&self, today: NaiveDate) -> Result<CycleReport, SyncError> {
		let mut kinds = Vec::with_capacity(CYCLE_ORDER.len());
		for kind in CYCLE_ORDER {
			let report = match kind {
				EntityKind::Address => self.reconcile::<Address>(today).await?,
				EntityKind::Name => self.reconcile::<Name>(today).await?,
				EntityKind::User => self.reconcile::<User>(today).await?,
				EntityKind::Room => self.reconcile::<Room>(today).await?,
				EntityKind::Batch => self.reconcile::<Batch>(today).await?,
			};
			kinds.push(report);
		}

		let snapshots = if self.snapshots_after_cycle {
			SnapshotProjector::new(self.store.clone())
				.project_all(today)
				.await
				.map_err(SyncError::Snapshot)?
				.created
				.len()
		} else {
			0
		};

		Ok(CycleReport { date: today, kinds, snapshots })
	}

	async fn reconcile<T: Entity>(&self, today: NaiveDate) -> Result<KindReport, SyncError> {
		reconcile::<T, S, R>(&self.store, &self.source, self.policy, today)
			.await
			.map_err(|source| SyncError::Reconcile { kind: T::KIND, source })
	}
}
