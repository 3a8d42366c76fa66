mod cycle;
mod poller;
mod reconciler;

pub use cycle::{CycleReport, SyncError, SyncService, CYCLE_ORDER};
pub use poller::{Poller, PollerError, PollerState};
pub use reconciler::{reconcile, KindReport, SweepPolicy};
