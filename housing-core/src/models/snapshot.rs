use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot id is empty")]
    MissingId,

    #[error("snapshot date is not set")]
    MissingDate,

    #[error("snapshot location is empty")]
    MissingLocation,

    #[error("snapshot {field} is negative: {value}")]
    NegativeCount { field: &'static str, value: i64 },
}

/// Occupancy and head count for one location on one date.
/// Append-only: never updated or deleted once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "snapshotId")]
    pub id: String,
    pub date: Option<NaiveDate>,
    pub created: DateTime<Utc>,
    pub location: Option<String>,
    pub room_occupancy_count: i64,
    pub user_count: i64,
}

impl Snapshot {
    pub fn new(
        date: NaiveDate,
        location: impl Into<String>,
        room_occupancy_count: i64,
        user_count: i64,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            date: Some(date),
            created: Utc::now(),
            location: Some(location.into()),
            room_occupancy_count,
            user_count,
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.id.trim().is_empty() {
            return Err(SnapshotError::MissingId);
        }
        if self.date.is_none() {
            return Err(SnapshotError::MissingDate);
        }
        match self.location.as_deref() {
            Some(l) if !l.trim().is_empty() => {}
            _ => return Err(SnapshotError::MissingLocation),
        }
        if self.room_occupancy_count < 0 {
            return Err(SnapshotError::NegativeCount {
                field: "room_occupancy_count",
                value: self.room_occupancy_count,
            });
        }
        if self.user_count < 0 {
            return Err(SnapshotError::NegativeCount {
                field: "user_count",
                value: self.user_count,
            });
        }
        Ok(())
    }
}

/// Read-side filter over stored snapshots. Empty filter matches everything;
/// date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub location: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SnapshotFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn on(date: NaiveDate) -> Self {
        Self::between(date, date)
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self { location: None, from: Some(from), to: Some(to) }
    }

    pub fn at(location: impl Into<String>) -> Self {
        Self { location: Some(location.into()), from: None, to: None }
    }

    pub fn at_between(location: impl Into<String>, from: NaiveDate, to: NaiveDate) -> Self {
        Self { location: Some(location.into()), from: Some(from), to: Some(to) }
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        if let Some(location) = &self.location {
            if snapshot.location.as_deref() != Some(location.as_str()) {
                return false;
            }
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = snapshot.date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn populated_snapshot_is_valid() {
        let snap = Snapshot::new(day(1), "Reston", 12, 0);
        assert_eq!(snap.validate(), Ok(()));
    }

    #[test]
    fn empty_id_is_invalid() {
        let mut snap = Snapshot::new(day(1), "Reston", 1, 1);
        snap.id = String::new();
        assert_eq!(snap.validate(), Err(SnapshotError::MissingId));
    }

    #[test]
    fn unset_date_is_invalid() {
        let mut snap = Snapshot::new(day(1), "Reston", 1, 1);
        snap.date = None;
        assert_eq!(snap.validate(), Err(SnapshotError::MissingDate));
    }

    #[test]
    fn missing_or_blank_location_is_invalid() {
        let mut snap = Snapshot::new(day(1), "Reston", 1, 1);
        snap.location = None;
        assert_eq!(snap.validate(), Err(SnapshotError::MissingLocation));
        snap.location = Some("  ".into());
        assert_eq!(snap.validate(), Err(SnapshotError::MissingLocation));
    }

    #[test]
    fn negative_counts_are_invalid() {
        let snap = Snapshot::new(day(1), "Reston", -1, 1);
        assert!(matches!(
            snap.validate(),
            Err(SnapshotError::NegativeCount { field: "room_occupancy_count", .. })
        ));

        let snap = Snapshot::new(day(1), "Reston", 1, -3);
        assert_eq!(
            snap.validate(),
            Err(SnapshotError::NegativeCount { field: "user_count", value: -3 })
        );
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let snap = Snapshot::new(day(5), "Tampa", 1, 1);
        assert!(SnapshotFilter::between(day(5), day(9)).matches(&snap));
        assert!(SnapshotFilter::between(day(1), day(5)).matches(&snap));
        assert!(!SnapshotFilter::between(day(6), day(9)).matches(&snap));
        assert!(SnapshotFilter::on(day(5)).matches(&snap));
    }

    #[test]
    fn filter_by_location() {
        let snap = Snapshot::new(day(5), "Tampa", 1, 1);
        assert!(SnapshotFilter::at("Tampa").matches(&snap));
        assert!(!SnapshotFilter::at("Reston").matches(&snap));
        assert!(!SnapshotFilter::at_between("Tampa", day(1), day(2)).matches(&snap));
        assert!(SnapshotFilter::all().matches(&snap));
    }

    #[test]
    fn serializes_id_under_its_own_field() {
        let snap = Snapshot::new(day(5), "Tampa", 1, 1);
        let value = serde_json::to_value(&snap).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["snapshotId"], snap.id.as_str());
        assert_eq!(value["roomOccupancyCount"], 1);
    }
}
