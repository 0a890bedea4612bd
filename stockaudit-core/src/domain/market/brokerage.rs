// stockaudit-core/src/domain/market/brokerage.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::normalize_key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brokerage {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Brokerage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize_key(&self.name)
    }
}
