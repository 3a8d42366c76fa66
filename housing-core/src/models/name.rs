use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Lifecycle};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    pub name_id: String,
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub middle: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Entity for Name {
    const KIND: EntityKind = EntityKind::Name;

    fn key(&self) -> &str {
        &self.name_id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn tracked_eq(&self, other: &Self) -> bool {
        self.first == other.first && self.middle == other.middle && self.last == other.last
    }

    fn copy_tracked(&mut self, other: &Self) {
        self.first = other.first.clone();
        self.middle = other.middle.clone();
        self.last = other.last.clone();
    }
}
