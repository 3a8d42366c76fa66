use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::Entity;

/// What happens to an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Update,
    Delete,
}

/// Result of diffing a fetched collection against persisted rows.
///
/// `existing` holds rewrites of stored rows in stored order; `to_insert`
/// holds new rows in remote order. Every row carries its final lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset<T> {
    pub existing: Vec<(Change, T)>,
    pub to_insert: Vec<T>,
    /// Remote rows dropped because an earlier row had the same key.
    pub duplicates: usize,
}

impl<T> Default for Changeset<T> {
    fn default() -> Self {
        Self { existing: Vec::new(), to_insert: Vec::new(), duplicates: 0 }
    }
}

impl<T> Changeset<T> {
    pub fn updates(&self) -> impl Iterator<Item = &T> {
        self.existing.iter().filter(|(c, _)| *c == Change::Update).map(|(_, r)| r)
    }

    pub fn deletions(&self) -> impl Iterator<Item = &T> {
        self.existing.iter().filter(|(c, _)| *c == Change::Delete).map(|(_, r)| r)
    }

    pub fn update_count(&self) -> usize {
        self.updates().count()
    }

    pub fn delete_count(&self) -> usize {
        self.deletions().count()
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.to_insert.is_empty()
    }

    /// Strip soft deletions, returning how many were dropped.
    pub fn drop_deletions(&mut self) -> usize {
        let before = self.existing.len();
        self.existing.retain(|(c, _)| *c != Change::Delete);
        before - self.existing.len()
    }
}

/// Three-way diff of `remote` against `local`.
///
/// - local active rows missing remotely are soft-deleted on `today`
/// - remote rows with unknown keys are inserted with `created = today`
/// - known keys whose tracked fields differ get the remote values
///
/// Rows already deleted still claim their key but are never rewritten.
pub fn diff<T: Entity>(remote: Vec<T>, local: &[T], today: NaiveDate) -> Changeset<T> {
    let mut changes = Changeset::default();

    let mut order = Vec::with_capacity(remote.len());
    let mut incoming: HashMap<String, T> = HashMap::with_capacity(remote.len());
    for row in remote {
        if incoming.contains_key(row.key()) {
            changes.duplicates += 1;
            continue;
        }
        order.push(row.key().to_string());
        incoming.insert(row.key().to_string(), row);
    }

    let mut known = HashSet::with_capacity(local.len());
    for current in local {
        known.insert(current.key());

        if !current.is_active() {
            continue;
        }

        match incoming.get(current.key()) {
            Some(fetched) if !current.tracked_eq(fetched) => {
                let mut updated = current.clone();
                updated.copy_tracked(fetched);
                changes.existing.push((Change::Update, updated));
            }
            Some(_) => {}
            None => {
                let mut gone = current.clone();
                gone.lifecycle_mut().deleted = Some(today);
                changes.existing.push((Change::Delete, gone));
            }
        }
    }

    for key in order {
        if known.contains(key.as_str()) {
            continue;
        }
        if let Some(mut fresh) = incoming.remove(&key) {
            let lifecycle = fresh.lifecycle_mut();
            lifecycle.created = Some(today);
            lifecycle.deleted = None;
            changes.to_insert.push(fresh);
        }
    }

    changes
}
