// stockaudit-core/src/ports/repository.rs

// What the engine needs from storage, without knowing how it's done.
// Reads for the three entity kinds; writes only for stock ratings.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::market::{Brokerage, Company, EntityKind, StockRating};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// Optimistic-concurrency or serialization failure; safe to retry.
    #[error("Write conflict on {entity} {id}: {reason}")]
    Conflict {
        entity: EntityKind,
        id: Uuid,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Company>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait BrokerageRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Brokerage>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Brokerage>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait StockRatingRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StockRating>, RepositoryError>;
    async fn list(&self) -> Result<Vec<StockRating>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// Replaces the stored row with the same id.
    async fn update(&self, rating: &StockRating) -> Result<(), RepositoryError>;
}
