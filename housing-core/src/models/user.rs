use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Lifecycle};

/// A housed person. Address, batch, name and room are held by key only;
/// their contents are reconciled through their own kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub address_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub name_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn key(&self) -> &str {
        &self.user_id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn tracked_eq(&self, other: &Self) -> bool {
        self.address_id == other.address_id
            && self.batch_id == other.batch_id
            && self.email == other.email
            && self.gender == other.gender
            && self.location == other.location
            && self.name_id == other.name_id
            && self.room_id == other.room_id
            && self.user_type == other.user_type
    }

    fn copy_tracked(&mut self, other: &Self) {
        self.address_id = other.address_id.clone();
        self.batch_id = other.batch_id.clone();
        self.email = other.email.clone();
        self.gender = other.gender.clone();
        self.location = other.location.clone();
        self.name_id = other.name_id.clone();
        self.room_id = other.room_id.clone();
        self.user_type = other.user_type.clone();
    }
}
