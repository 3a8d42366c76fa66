use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{error, info, warn};

use super::cycle::SyncService;
use crate::{fetcher::RemoteSource, store::RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
	Stopped,
	Running,
	Stopping,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollerError {
	#[error("cannot {action} a poller that is {state:?}")]
	InvalidState { action: &'static str, state: PollerState },
}

enum Lifecycle {
	Stopped,
	Running { shutdown_tx: oneshot::Sender<()>, task: JoinHandle<()> },
	/// `task` is `None` while a `stop` call is joining the loop. It holds the
	/// handle again if that call was dropped before the loop exited.
	Stopping { task: Option<JoinHandle<()>> },
}

impl Lifecycle {
	fn state(&self) -> PollerState {
		match self {
			Lifecycle::Stopped => PollerState::Stopped,
			Lifecycle::Running { .. } => PollerState::Running,
			Lifecycle::Stopping { .. } => PollerState::Stopping,
		}
	}

	/// An abandoned stop whose loop has since exited counts as stopped.
	fn settle(&mut self) {
		let finished =
			matches!(self, Lifecycle::Stopping { task: Some(task) } if task.is_finished());
		if finished {
			*self = Lifecycle::Stopped;
		}
	}
}

/// Gives the loop handle back to the lifecycle when a `stop` future is
/// dropped before the join completes.
struct PendingJoin<'a> {
	lifecycle: &'a Mutex<Lifecycle>,
	task: Option<JoinHandle<()>>,
}

impl PendingJoin<'_> {
	async fn wait(&mut self) {
		if let Some(task) = self.task.as_mut() {
			if let Err(e) = task.await {
				error!(error = %e, "poll loop task failed during shutdown");
			}
		}
		self.task = None;
	}
}

impl Drop for PendingJoin<'_> {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			*self.lifecycle.lock() = Lifecycle::Stopping { task: Some(task) };
		}
	}
}

/// Runs [`SyncService::run_cycle`] every `interval` on a background task.
///
/// Cycles are strictly sequential: wait, cycle, wait. Stopping only
/// interrupts the wait, so an in-flight cycle always finishes its writes.
pub struct Poller<S, R> {
	service: Arc<SyncService<S, R>>,
	interval: Duration,
	lifecycle: Mutex<Lifecycle>,
	cycles: Arc<AtomicU64>,
}

impl<S: RecordStore, R: RemoteSource> Poller<S, R> {
	pub fn new(service: SyncService<S, R>, interval: Duration) -> Self {
		Self {
			service: Arc::new(service),
			interval,
			lifecycle: Mutex::new(Lifecycle::Stopped),
			cycles: Arc::new(AtomicU64::new(0)),
		}
	}

	pub fn status(&self) -> PollerState {
		let mut lifecycle = self.lifecycle.lock();
		lifecycle.settle();
		lifecycle.state()
	}

	/// Cycles finished since construction, failed ones included.
	pub fn completed_cycles(&self) -> u64 {
		self.cycles.load(Ordering::SeqCst)
	}

	/// Spawn the loop. Must be called from within a tokio runtime.
	pub fn start(&self) -> Result<(), PollerError> {
		let mut lifecycle = self.lifecycle.lock();
		lifecycle.settle();
		if !matches!(*lifecycle, Lifecycle::Stopped) {
			return Err(PollerError::InvalidState { action: "start", state: lifecycle.state() });
		}

		let (shutdown_tx, shutdown_rx) = oneshot::channel();
		let task = tokio::spawn(poll_loop(
			self.service.clone(),
			self.interval,
			shutdown_rx,
			self.cycles.clone(),
		));
		*lifecycle = Lifecycle::Running { shutdown_tx, task };

		info!(interval_secs = self.interval.as_secs(), "poller started");
		Ok(())
	}

	/// Signal shutdown and wait until the loop has exited.
	///
	/// Dropping the returned future leaves the poller `Stopping`; a later
	/// `stop` finishes the join, and the poller settles to `Stopped` on its
	/// own once the loop exits.
	pub async fn stop(&self) -> Result<(), PollerError> {
		let task = {
			let mut lifecycle = self.lifecycle.lock();
			lifecycle.settle();
			match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping { task: None }) {
				Lifecycle::Running { shutdown_tx, task } => {
					if shutdown_tx.send(()).is_err() {
						warn!("poll loop already gone when stop was requested");
					}
					task
				}
				Lifecycle::Stopping { task: Some(task) } => task,
				other => {
					let state = other.state();
					*lifecycle = other;
					return Err(PollerError::InvalidState { action: "stop", state });
				}
			}
		};

		let mut join = PendingJoin { lifecycle: &self.lifecycle, task: Some(task) };
		join.wait().await;

		*self.lifecycle.lock() = Lifecycle::Stopped;
		info!("poller stopped");
		Ok(())
	}
}

async fn poll_loop<S: RecordStore, R: RemoteSource>(
	service: Arc<SyncService<S, R>>,
	interval: Duration,
	mut shutdown_rx: oneshot::Receiver<()>,
	cycles: Arc<AtomicU64>,
) {
	loop {
		tokio::select! {
			biased;
			_ = &mut shutdown_rx => break,
			_ = tokio::time::sleep(interval) => {}
		}

		let today = Utc::now().date_naive();
		let cycle_service = service.clone();

		// A child task contains panics; awaiting it keeps cycles from overlapping.
		let outcome = tokio::spawn(async move { cycle_service.run_cycle(today).await }).await;
		match outcome {
			Ok(Ok(report)) => {
				let skipped = report.skipped().count();
				info!(
					%today,
					writes = report.writes(),
					skipped,
					snapshots = report.snapshots,
					"poll cycle finished"
				);
			}
			Ok(Err(e)) => error!(error = %e, "poll cycle failed"),
			Err(e) => error!(error = %e, "poll cycle panicked"),
		}
		cycles.fetch_add(1, Ordering::SeqCst);
	}
}
