// stockaudit-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{Config, Connection, params};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};
use uuid::Uuid;

// Imports Hexagonaux
use crate::domain::market::{Brokerage, Company, EntityKind, StockRating};
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::repository::{
    BrokerageRepository, CompanyRepository, RepositoryError, StockRatingRepository,
};

// Ids and timestamps are kept as VARCHAR (uuid / RFC 3339). No foreign keys:
// dangling references must be storable for the orphan detector to find them.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id VARCHAR PRIMARY KEY,
    ticker VARCHAR NOT NULL,
    name VARCHAR NOT NULL,
    sector VARCHAR,
    exchange VARCHAR,
    created_at VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS brokerages (
    id VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS stock_ratings (
    id VARCHAR PRIMARY KEY,
    company_id VARCHAR NOT NULL,
    brokerage_id VARCHAR NOT NULL,
    action VARCHAR NOT NULL,
    rating_from VARCHAR NOT NULL,
    rating_to VARCHAR NOT NULL,
    target_from DOUBLE,
    target_to DOUBLE,
    time VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);
"#;

const COMPANY_COLUMNS: &str = "id, ticker, name, sector, exchange, created_at";
const BROKERAGE_COLUMNS: &str = "id, name, created_at";
const RATING_COLUMNS: &str = "id, company_id, brokerage_id, action, rating_from, rating_to, \
                              target_from, target_to, time, created_at";

pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates the three tables if they are missing.
    #[instrument(skip(self))]
    pub fn init_schema(&self) -> Result<(), InfrastructureError> {
        let conn = self.infra_lock()?;
        conn.execute_batch(SCHEMA)?;
        debug!("Schema ready");
        Ok(())
    }

    pub fn insert_company(&self, company: &Company) -> Result<(), InfrastructureError> {
        let conn = self.infra_lock()?;
        conn.execute(
            &format!("INSERT INTO companies ({}) VALUES (?, ?, ?, ?, ?, ?)", COMPANY_COLUMNS),
            params![
                company.id.to_string(),
                company.ticker,
                company.name,
                company.sector,
                company.exchange,
                company.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_brokerage(&self, brokerage: &Brokerage) -> Result<(), InfrastructureError> {
        let conn = self.infra_lock()?;
        conn.execute(
            &format!("INSERT INTO brokerages ({}) VALUES (?, ?, ?)", BROKERAGE_COLUMNS),
            params![
                brokerage.id.to_string(),
                brokerage.name,
                brokerage.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_rating(&self, rating: &StockRating) -> Result<(), InfrastructureError> {
        let conn = self.infra_lock()?;
        conn.execute(
            &format!(
                "INSERT INTO stock_ratings ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                RATING_COLUMNS
            ),
            params![
                rating.id.to_string(),
                rating.company_id.to_string(),
                rating.brokerage_id.to_string(),
                rating.action,
                rating.rating_from,
                rating.rating_to,
                rating.target_from,
                rating.target_to,
                rating.time.to_rfc3339(),
                rating.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn infra_lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn.lock().map_err(|_| {
            InfrastructureError::Io(std::io::Error::other("DuckDB Mutex Poisoned"))
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Storage("DuckDB Mutex Poisoned".into()))
    }

    fn count_rows(&self, table: &str) -> Result<u64, RepositoryError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .map_err(read_error)?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    fn select_companies(&self, filter: Option<Uuid>) -> Result<Vec<Company>, RepositoryError> {
        let conn = self.lock()?;
        let (sql, args) = select_sql("companies", COMPANY_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql).map_err(read_error)?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(args), |row| {
                Ok(RawCompany {
                    id: row.get(0)?,
                    ticker: row.get(1)?,
                    name: row.get(2)?,
                    sector: row.get(3)?,
                    exchange: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(read_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(read_error)?.into_domain()?);
        }
        Ok(out)
    }

    fn select_brokerages(&self, filter: Option<Uuid>) -> Result<Vec<Brokerage>, RepositoryError> {
        let conn = self.lock()?;
        let (sql, args) = select_sql("brokerages", BROKERAGE_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql).map_err(read_error)?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(args), |row| {
                Ok(RawBrokerage {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(read_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(read_error)?.into_domain()?);
        }
        Ok(out)
    }

    fn select_ratings(&self, filter: Option<Uuid>) -> Result<Vec<StockRating>, RepositoryError> {
        let conn = self.lock()?;
        let (sql, args) = select_sql("stock_ratings", RATING_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql).map_err(read_error)?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(args), |row| {
                Ok(RawRating {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    brokerage_id: row.get(2)?,
                    action: row.get(3)?,
                    rating_from: row.get(4)?,
                    rating_to: row.get(5)?,
                    target_from: row.get(6)?,
                    target_to: row.get(7)?,
                    time: row.get(8)?,
                    created_at: row.get(9)?,
                })
            })
            .map_err(read_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(read_error)?.into_domain()?);
        }
        Ok(out)
    }
}

fn select_sql(table: &str, columns: &str, filter: Option<Uuid>) -> (String, Vec<String>) {
    match filter {
        Some(id) => (
            format!("SELECT {} FROM {} WHERE id = ?", columns, table),
            vec![id.to_string()],
        ),
        None => (format!("SELECT {} FROM {} ORDER BY id", columns, table), vec![]),
    }
}

// --- ERROR MAPPING ---

fn read_error(e: duckdb::Error) -> RepositoryError {
    RepositoryError::Storage(DatabaseError::DuckDB(e).to_string())
}

/// DuckDB reports optimistic-concurrency aborts as "conflict" failures;
/// those are the only ones worth retrying.
fn write_error(id: Uuid, e: duckdb::Error) -> RepositoryError {
    let message = e.to_string();
    if message.to_lowercase().contains("conflict") {
        RepositoryError::Conflict {
            entity: EntityKind::StockRating,
            id,
            reason: message,
        }
    } else {
        RepositoryError::Storage(DatabaseError::DuckDB(e).to_string())
    }
}

fn corrupted(table: &str, reason: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(
        DatabaseError::CorruptedRow {
            table: table.to_string(),
            reason: reason.to_string(),
        }
        .to_string(),
    )
}

fn parse_id(table: &str, raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw).map_err(|e| corrupted(table, format!("bad uuid '{}': {}", raw, e)))
}

fn parse_time(table: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupted(table, format!("bad timestamp '{}': {}", raw, e)))
}

// --- RAW ROWS ---
// Rows are read as plain strings inside the DuckDB callback and converted
// afterwards, so conversion errors don't have to be duckdb::Error.

struct RawCompany {
    id: String,
    ticker: String,
    name: String,
    sector: Option<String>,
    exchange: Option<String>,
    created_at: String,
}

impl RawCompany {
    fn into_domain(self) -> Result<Company, RepositoryError> {
        Ok(Company {
            id: parse_id("companies", &self.id)?,
            ticker: self.ticker,
            name: self.name,
            sector: self.sector,
            exchange: self.exchange,
            created_at: parse_time("companies", &self.created_at)?,
        })
    }
}

struct RawBrokerage {
    id: String,
    name: String,
    created_at: String,
}

impl RawBrokerage {
    fn into_domain(self) -> Result<Brokerage, RepositoryError> {
        Ok(Brokerage {
            id: parse_id("brokerages", &self.id)?,
            name: self.name,
            created_at: parse_time("brokerages", &self.created_at)?,
        })
    }
}

struct RawRating {
    id: String,
    company_id: String,
    brokerage_id: String,
    action: String,
    rating_from: String,
    rating_to: String,
    target_from: Option<f64>,
    target_to: Option<f64>,
    time: String,
    created_at: String,
}

impl RawRating {
    fn into_domain(self) -> Result<StockRating, RepositoryError> {
        const TABLE: &str = "stock_ratings";
        Ok(StockRating {
            id: parse_id(TABLE, &self.id)?,
            company_id: parse_id(TABLE, &self.company_id)?,
            brokerage_id: parse_id(TABLE, &self.brokerage_id)?,
            action: self.action,
            rating_from: self.rating_from,
            rating_to: self.rating_to,
            target_from: self.target_from,
            target_to: self.target_to,
            time: parse_time(TABLE, &self.time)?,
            created_at: parse_time(TABLE, &self.created_at)?,
        })
    }
}

// --- PORTS ---

#[async_trait]
impl CompanyRepository for DuckDbStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        Ok(self.select_companies(Some(id))?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Company>, RepositoryError> {
        self.select_companies(None)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.count_rows("companies")
    }
}

#[async_trait]
impl BrokerageRepository for DuckDbStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Brokerage>, RepositoryError> {
        Ok(self.select_brokerages(Some(id))?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Brokerage>, RepositoryError> {
        self.select_brokerages(None)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.count_rows("brokerages")
    }
}

#[async_trait]
impl StockRatingRepository for DuckDbStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StockRating>, RepositoryError> {
        Ok(self.select_ratings(Some(id))?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<StockRating>, RepositoryError> {
        self.select_ratings(None)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.count_rows("stock_ratings")
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| write_error(id, e))?;
        let affected = tx
            .execute(
                "DELETE FROM stock_ratings WHERE id = ?",
                params![id.to_string()],
            )
            .map_err(|e| write_error(id, e))?;
        if affected == 0 {
            // dropping the transaction rolls it back
            return Err(RepositoryError::NotFound {
                entity: EntityKind::StockRating,
                id,
            });
        }
        tx.commit().map_err(|e| write_error(id, e))?;
        Ok(())
    }

    #[instrument(skip(self, rating), fields(id = %rating.id))]
    async fn update(&self, rating: &StockRating) -> Result<(), RepositoryError> {
        let id = rating.id;
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| write_error(id, e))?;
        let affected = tx
            .execute(
                "UPDATE stock_ratings SET company_id = ?, brokerage_id = ?, action = ?, \
                 rating_from = ?, rating_to = ?, target_from = ?, target_to = ?, time = ? \
                 WHERE id = ?",
                params![
                    rating.company_id.to_string(),
                    rating.brokerage_id.to_string(),
                    rating.action,
                    rating.rating_from,
                    rating.rating_to,
                    rating.target_from,
                    rating.target_to,
                    rating.time.to_rfc3339(),
                    id.to_string(),
                ],
            )
            .map_err(|e| write_error(id, e))?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: EntityKind::StockRating,
                id,
            });
        }
        tx.commit().map_err(|e| write_error(id, e))?;
        Ok(())
    }
}
