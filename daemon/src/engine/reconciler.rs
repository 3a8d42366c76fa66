use chrono::NaiveDate;
use housing_core::{diff, Entity, EntityKind};
use tracing::{debug, info, warn};

use crate::{
	fetcher::RemoteSource,
	store::{RecordStore, StoreError, UnitOfWork},
};

/// Guards against a remote that answers successfully but with nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
	pub sweep_on_empty: bool,
}

impl Default for SweepPolicy {
	fn default() -> Self {
		Self { sweep_on_empty: true }
	}
}

/// What one kind's reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
	pub kind: EntityKind,
	pub inserted: usize,
	pub updated: usize,
	pub deleted: usize,
	/// Deletions withheld by [`SweepPolicy`].
	pub suppressed: usize,
	pub duplicates: usize,
	/// Set when the fetch failed and the kind was left untouched.
	pub skipped: Option<String>,
}

impl KindReport {
	fn new(kind: EntityKind) -> Self {
		Self {
			kind,
			inserted: 0,
			updated: 0,
			deleted: 0,
			suppressed: 0,
			duplicates: 0,
			skipped: None,
		}
	}

	pub fn writes(&self) -> usize {
		self.inserted + self.updated + self.deleted
	}
}

/// Fetch, diff and commit one entity kind.
///
/// A failed fetch skips the kind entirely so an outage can never read as
/// "everything was deleted". Store errors propagate.
pub async fn reconcile<T, S, R>(
	store: &S,
	source: &R,
	policy: SweepPolicy,
	today: NaiveDate,
) -> Result<KindReport, StoreError>
where
	T: Entity,
	S: RecordStore,
	R: RemoteSource,
{
	let kind = T::KIND;
	let mut report = KindReport::new(kind);

	let remote = match source.fetch::<T>().await {
		Ok(rows) => rows,
		Err(e) => {
			warn!(kind = %kind, error = %e, "fetch failed, leaving kind untouched this cycle");
			report.skipped = Some(e.to_string());
			return Ok(report);
		}
	};
	let remote_empty = remote.is_empty();

	let local = store.all::<T>().await?;
	let mut changes = diff(remote, &local, today);

	if remote_empty && !policy.sweep_on_empty {
		report.suppressed = changes.drop_deletions();
		if report.suppressed > 0 {
			warn!(
				kind = %kind,
				suppressed = report.suppressed,
				"remote returned nothing, not sweeping"
			);
		}
	}

	report.duplicates = changes.duplicates;
	if changes.duplicates > 0 {
		warn!(
			kind = %kind,
			duplicates = changes.duplicates,
			"remote collection repeats keys, kept first"
		);
	}

	if changes.is_empty() {
		debug!(kind = %kind, "no changes");
		return Ok(report);
	}

	report.updated = changes.update_count();
	report.deleted = changes.delete_count();
	report.inserted = changes.to_insert.len();

	let mut work = UnitOfWork::new();
	for (_, row) in changes.existing {
		work.update(row);
	}
	for row in changes.to_insert {
		work.add(row);
	}
	store.commit(work).await?;

	info!(
		kind = %kind,
		inserted = report.inserted,
		updated = report.updated,
		deleted = report.deleted,
		"reconciled"
	);

	Ok(report)
}
