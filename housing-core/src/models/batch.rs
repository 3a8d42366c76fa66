use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Lifecycle};

/// A training cohort housed together for a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: String,
    #[serde(default)]
    pub address_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub occupancy: i64,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Entity for Batch {
    const KIND: EntityKind = EntityKind::Batch;

    fn key(&self) -> &str {
        &self.batch_id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn tracked_eq(&self, other: &Self) -> bool {
        self.address_id == other.address_id
            && self.name == other.name
            && self.occupancy == other.occupancy
            && self.skill == other.skill
            && self.start_date == other.start_date
            && self.end_date == other.end_date
    }

    fn copy_tracked(&mut self, other: &Self) {
        self.address_id = other.address_id.clone();
        self.name = other.name.clone();
        self.occupancy = other.occupancy;
        self.skill = other.skill.clone();
        self.start_date = other.start_date;
        self.end_date = other.end_date;
    }
}
