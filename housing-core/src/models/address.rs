use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Lifecycle};

/// A street address a room or batch lives at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address_id: String,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Entity for Address {
    const KIND: EntityKind = EntityKind::Address;

    fn key(&self) -> &str {
        &self.address_id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn tracked_eq(&self, other: &Self) -> bool {
        self.address1 == other.address1
            && self.address2 == other.address2
            && self.city == other.city
            && self.country == other.country
            && self.postal_code == other.postal_code
            && self.state == other.state
    }

    fn copy_tracked(&mut self, other: &Self) {
        self.address1 = other.address1.clone();
        self.address2 = other.address2.clone();
        self.city = other.city.clone();
        self.country = other.country.clone();
        self.postal_code = other.postal_code.clone();
        self.state = other.state.clone();
    }
}
