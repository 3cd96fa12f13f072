//! Attendee persistence.

use super::{Attendee, ContactMethod, NewAttendee};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SQL_CREATE_ATTENDEES: &str = r#"
CREATE TABLE IF NOT EXISTS attendees (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    full_name VARCHAR(255) NOT NULL,
    contact_method VARCHAR(16) NOT NULL,
    contact_info VARCHAR(255) NOT NULL,
    guests TINYINT UNSIGNED NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE KEY uq_attendees_contact_info (contact_info)
)
"#;

const SQL_FIND_BY_CONTACT: &str = r#"
SELECT id, full_name, contact_method, contact_info, guests, created_at
FROM attendees
WHERE contact_info = ?
LIMIT 1
"#;

const SQL_INSERT_ATTENDEE: &str = r#"
INSERT INTO attendees (full_name, contact_method, contact_info, guests, created_at)
VALUES (?, ?, ?, ?, ?)
"#;

#[derive(Debug, FromRow)]
struct AttendeeRow {
    id: u64,
    full_name: String,
    contact_method: String,
    contact_info: String,
    guests: u8,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttendeeRow> for Attendee {
    type Error = StoreError;

    fn try_from(row: AttendeeRow) -> Result<Self, Self::Error> {
        let contact_method = row
            .contact_method
            .parse::<ContactMethod>()
            .map_err(StoreError::Database)?;

        Ok(Attendee {
            id: row.id,
            full_name: row.full_name,
            contact_method,
            contact_info: row.contact_info,
            guests: row.guests,
            created_at: row.created_at,
        })
    }
}

/// MySQL-backed attendee table.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connect, then make sure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let store = Self {
            pool: Self::pool_options(config).connect_with(Self::connect_options(config)).await?,
        };
        store.init().await?;

        info!(
            host = %config.host,
            database = %config.name,
            pool_size = config.pool_size,
            "Connected to attendee database"
        );
        Ok(store)
    }

    /// Build a pool that only connects on first use. Skips schema setup.
    pub fn connect_lazy(config: &DatabaseConfig) -> Self {
        Self {
            pool: Self::pool_options(config).connect_lazy_with(Self::connect_options(config)),
        }
    }

    fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout)
    }

    fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password.expose_secret())
            .database(&config.name)
            .charset("utf8mb4")
    }

    /// Whether every connection the pool may open is open and checked out.
    fn saturated(&self) -> bool {
        self.pool.size() >= self.pool.options().get_max_connections()
            && self.pool.num_idle() == 0
    }

    /// An acquire timeout against a full pool is exhaustion; against a pool that
    /// cannot open connections it is an unreachable database.
    fn classify(&self, e: sqlx::Error) -> StoreError {
        match e {
            sqlx::Error::PoolTimedOut if self.saturated() => StoreError::PoolExhausted,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            other => StoreError::from(other),
        }
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(SQL_CREATE_ATTENDEES)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(())
    }

    pub async fn find_by_contact(&self, contact_info: &str) -> Result<Option<Attendee>, StoreError> {
        sqlx::query_as::<_, AttendeeRow>(SQL_FIND_BY_CONTACT)
            .bind(contact_info)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify(e))?
            .map(Attendee::try_from)
            .transpose()
    }

    pub async fn insert(&self, record: NewAttendee) -> Result<Attendee, StoreError> {
        let created_at = Utc::now();

        let result = sqlx::query(SQL_INSERT_ATTENDEE)
            .bind(&record.full_name)
            .bind(record.contact_method.as_str())
            .bind(&record.contact_info)
            .bind(record.guests)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match self.classify(e) {
                StoreError::Duplicate(_) => StoreError::Duplicate(record.contact_info.clone()),
                other => other,
            })?;

        Ok(Attendee::from_new(result.last_insert_id(), record, created_at))
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// In-process attendee table, keyed by contact info.
///
/// Keys compare case-insensitively, like the MySQL column's default collation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryTable>,
}

#[derive(Default)]
struct MemoryTable {
    next_id: u64,
    by_contact: HashMap<String, Attendee>,
}

fn contact_key(contact_info: &str) -> String {
    contact_info.to_lowercase()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_contact(&self, contact_info: &str) -> Result<Option<Attendee>, StoreError> {
        let table = self.inner.lock().await;
        Ok(table.by_contact.get(&contact_key(contact_info)).cloned())
    }

    /// Insert if absent, under one lock.
    pub async fn insert(&self, record: NewAttendee) -> Result<Attendee, StoreError> {
        let key = contact_key(&record.contact_info);
        let mut table = self.inner.lock().await;
        if table.by_contact.contains_key(&key) {
            return Err(StoreError::Duplicate(record.contact_info));
        }

        table.next_id += 1;
        let attendee = Attendee::from_new(table.next_id, record, Utc::now());
        table.by_contact.insert(key, attendee.clone());
        Ok(attendee)
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.by_contact.len()
    }
}

/// Attendee storage backend.
pub enum AttendeeStore {
    /// MySQL table
    MySql(MySqlStore),
    /// In-memory only (no persistence)
    Memory(MemoryStore),
}

impl AttendeeStore {
    /// Connect to MySQL and prepare the schema.
    pub async fn mysql(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Ok(AttendeeStore::MySql(MySqlStore::connect(config).await?))
    }

    /// Force memory store.
    pub fn memory() -> Self {
        AttendeeStore::Memory(MemoryStore::new())
    }

    /// Point lookup by contact info.
    pub async fn find_by_contact(&self, contact_info: &str) -> Result<Option<Attendee>, StoreError> {
        debug!("Looking up attendee by contact");
        match self {
            AttendeeStore::MySql(s) => s.find_by_contact(contact_info).await,
            AttendeeStore::Memory(s) => s.find_by_contact(contact_info).await,
        }
    }

    /// Create a new attendee. A contact that already exists yields
    /// [`StoreError::Duplicate`], even when two inserts race.
    pub async fn insert(&self, record: NewAttendee) -> Result<Attendee, StoreError> {
        match self {
            AttendeeStore::MySql(s) => s.insert(record).await,
            AttendeeStore::Memory(s) => s.insert(record).await,
        }
    }

    /// Whether the backend is reachable.
    pub async fn ping(&self) -> bool {
        match self {
            AttendeeStore::MySql(s) => s.ping().await,
            AttendeeStore::Memory(_) => true,
        }
    }
}
