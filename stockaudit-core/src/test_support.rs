// stockaudit-core/src/test_support.rs
//
// Hand-written doubles shared by the unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::market::{Brokerage, Company, EntityKind, StockRating};
use crate::infrastructure::adapters::memory::InMemoryStore;
use crate::ports::logger::{ValidationEvent, ValidationLogger};
use crate::ports::repository::{
    BrokerageRepository, CompanyRepository, RepositoryError, StockRatingRepository,
};

#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<ValidationEvent>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<ValidationEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ValidationLogger for RecordingLogger {
    fn log(&self, event: ValidationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// Store holding one clean company ("AAPL") and one brokerage ("Goldman Sachs").
pub fn seeded_store() -> (Arc<InMemoryStore>, Company, Brokerage) {
    let store = Arc::new(InMemoryStore::new());
    let company = Company::new("AAPL", "Apple Inc.");
    let brokerage = Brokerage::new("Goldman Sachs");
    store.insert_company(company.clone());
    store.insert_brokerage(brokerage.clone());
    (store, company, brokerage)
}

/// Every call fails with a storage error.
pub struct FailingReads;

fn boom() -> RepositoryError {
    RepositoryError::Storage("disk on fire".into())
}

#[async_trait]
impl CompanyRepository for FailingReads {
    async fn get_by_id(&self, _id: Uuid) -> Result<Option<Company>, RepositoryError> {
        Err(boom())
    }
    async fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        Err(boom())
    }
    async fn count(&self) -> Result<u64, RepositoryError> {
        Err(boom())
    }
}

#[async_trait]
impl BrokerageRepository for FailingReads {
    async fn get_by_id(&self, _id: Uuid) -> Result<Option<Brokerage>, RepositoryError> {
        Err(boom())
    }
    async fn list(&self) -> Result<Vec<Brokerage>, RepositoryError> {
        Err(boom())
    }
    async fn count(&self) -> Result<u64, RepositoryError> {
        Err(boom())
    }
}

#[async_trait]
impl StockRatingRepository for FailingReads {
    async fn get_by_id(&self, _id: Uuid) -> Result<Option<StockRating>, RepositoryError> {
        Err(boom())
    }
    async fn list(&self) -> Result<Vec<StockRating>, RepositoryError> {
        Err(boom())
    }
    async fn count(&self) -> Result<u64, RepositoryError> {
        Err(boom())
    }
    async fn delete(&self, _id: Uuid) -> Result<(), RepositoryError> {
        Err(boom())
    }
    async fn update(&self, _rating: &StockRating) -> Result<(), RepositoryError> {
        Err(boom())
    }
}

/// Company reads that stall for `delay` before answering from the store.
pub struct StalledCompanies {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

impl StalledCompanies {
    pub fn new(inner: Arc<InMemoryStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CompanyRepository for StalledCompanies {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        CompanyRepository::get_by_id(self.inner.as_ref(), id).await
    }
    async fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        CompanyRepository::list(self.inner.as_ref()).await
    }
    async fn count(&self) -> Result<u64, RepositoryError> {
        CompanyRepository::count(self.inner.as_ref()).await
    }
}

/// Ratings repository whose writes fail: `conflicts` transient conflicts
/// first, then either success (delegating to the store) or, when
/// `permanent` is set, a storage error on every later call.
pub struct FlakyRatings {
    inner: Arc<InMemoryStore>,
    conflicts_left: AtomicU32,
    permanent: bool,
    pub write_calls: AtomicUsize,
}

impl FlakyRatings {
    pub fn conflicting(inner: Arc<InMemoryStore>, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts_left: AtomicU32::new(conflicts),
            permanent: false,
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn broken(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            conflicts_left: AtomicU32::new(0),
            permanent: true,
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn gate(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.conflicts_left.load(Ordering::SeqCst);
        if left > 0 {
            self.conflicts_left.store(left - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict {
                entity: EntityKind::StockRating,
                id,
                reason: "concurrent writer".into(),
            });
        }
        if self.permanent {
            return Err(RepositoryError::Storage("read-only replica".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StockRatingRepository for FlakyRatings {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StockRating>, RepositoryError> {
        StockRatingRepository::get_by_id(self.inner.as_ref(), id).await
    }
    async fn list(&self) -> Result<Vec<StockRating>, RepositoryError> {
        StockRatingRepository::list(self.inner.as_ref()).await
    }
    async fn count(&self) -> Result<u64, RepositoryError> {
        StockRatingRepository::count(self.inner.as_ref()).await
    }
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.gate(id)?;
        StockRatingRepository::delete(self.inner.as_ref(), id).await
    }
    async fn update(&self, rating: &StockRating) -> Result<(), RepositoryError> {
        self.gate(rating.id)?;
        StockRatingRepository::update(self.inner.as_ref(), rating).await
    }
}
