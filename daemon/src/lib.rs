//! Housing sync daemon: pulls entity collections from the housing API,
//! mirrors them into the local store with soft deletes, and records
//! per-location occupancy snapshots.

pub mod config;
pub mod db;
pub mod engine;
pub mod fetcher;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod testing;
