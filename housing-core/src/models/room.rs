use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Lifecycle};

/// A bookable room. `occupancy` is capacity, `vacancy` the free beds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    #[serde(default)]
    pub address_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub occupancy: i64,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub vacancy: i64,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Entity for Room {
    const KIND: EntityKind = EntityKind::Room;

    fn key(&self) -> &str {
        &self.room_id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn tracked_eq(&self, other: &Self) -> bool {
        self.address_id == other.address_id
            && self.location == other.location
            && self.occupancy == other.occupancy
            && self.gender == other.gender
            && self.vacancy == other.vacancy
    }

    fn copy_tracked(&mut self, other: &Self) {
        self.address_id = other.address_id.clone();
        self.location = other.location.clone();
        self.occupancy = other.occupancy;
        self.gender = other.gender.clone();
        self.vacancy = other.vacancy;
    }
}
