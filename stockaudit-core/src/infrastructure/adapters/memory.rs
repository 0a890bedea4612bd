// stockaudit-core/src/infrastructure/adapters/memory.rs
//
// Process-local store implementing the three repository ports. Used by the
// unit tests and by embedders that already hold their data in memory.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::market::{Brokerage, Company, EntityKind, StockRating};
use crate::ports::repository::{
    BrokerageRepository, CompanyRepository, RepositoryError, StockRatingRepository,
};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    companies: Mutex<BTreeMap<Uuid, Company>>,
    brokerages: Mutex<BTreeMap<Uuid, Brokerage>>,
    ratings: Mutex<BTreeMap<Uuid, StockRating>>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    m.lock()
        .map_err(|_| RepositoryError::Storage("In-memory store mutex poisoned".into()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers (poisoned guards are recovered)

    pub fn insert_company(&self, company: Company) {
        let mut map = self.companies.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(company.id, company);
    }

    pub fn insert_brokerage(&self, brokerage: Brokerage) {
        let mut map = self.brokerages.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(brokerage.id, brokerage);
    }

    pub fn insert_rating(&self, rating: StockRating) {
        let mut map = self.ratings.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(rating.id, rating);
    }

    pub fn rating(&self, id: Uuid) -> Option<StockRating> {
        let map = self.ratings.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&id).cloned()
    }

    pub fn rating_count(&self) -> usize {
        self.ratings.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl CompanyRepository for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        Ok(lock(&self.companies)?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        Ok(lock(&self.companies)?.values().cloned().collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(lock(&self.companies)?.len() as u64)
    }
}

#[async_trait]
impl BrokerageRepository for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Brokerage>, RepositoryError> {
        Ok(lock(&self.brokerages)?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Brokerage>, RepositoryError> {
        Ok(lock(&self.brokerages)?.values().cloned().collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(lock(&self.brokerages)?.len() as u64)
    }
}

#[async_trait]
impl StockRatingRepository for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StockRating>, RepositoryError> {
        Ok(lock(&self.ratings)?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<StockRating>, RepositoryError> {
        Ok(lock(&self.ratings)?.values().cloned().collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(lock(&self.ratings)?.len() as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        match lock(&self.ratings)?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound {
                entity: EntityKind::StockRating,
                id,
            }),
        }
    }

    async fn update(&self, rating: &StockRating) -> Result<(), RepositoryError> {
        let mut map = lock(&self.ratings)?;
        match map.get_mut(&rating.id) {
            Some(slot) => {
                *slot = rating.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: EntityKind::StockRating,
                id: rating.id,
            }),
        }
    }
}
