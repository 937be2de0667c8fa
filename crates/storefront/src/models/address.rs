//! Delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carsi_core::{AddressId, RecordStatus, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub title: String,
    pub address_line: String,
    pub city: String,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub is_default: bool,
    #[serde(skip)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating or replacing an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub title: String,
    pub address_line: String,
    pub city: String,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Name of the first required field that is blank, if any.
    #[must_use]
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("address_line", &self.address_line),
            ("city", &self.city),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}
