//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ScanRecorder` port from the `core` crate. It handles all interactions
//! with the SQLite scan history using `sqlx`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use quickscan_core::domain::{ExtractedPayment, StoredScan};
use quickscan_core::ports::{PortError, PortResult, ScanRecorder};
use sqlx::{FromRow, SqlitePool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ScanRecorder` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ScanRecord {
    id: i64,
    phone_number: String,
    amount: f64,
    name: String,
    timestamp: NaiveDateTime,
}
impl ScanRecord {
    fn to_domain(self) -> StoredScan {
        StoredScan {
            id: self.id,
            payment: ExtractedPayment {
                name: self.name,
                phone_number: self.phone_number,
                amount: self.amount,
            },
            recorded_at: self.timestamp.and_utc(),
        }
    }
}

//=========================================================================================
// `ScanRecorder` Trait Implementation
//=========================================================================================

#[async_trait]
impl ScanRecorder for DbAdapter {
    async fn record_scan(&self, payment: &ExtractedPayment) -> PortResult<i64> {
        let result = sqlx::query("INSERT INTO scans (phone_number, amount, name) VALUES (?, ?, ?)")
            .bind(&payment.phone_number)
            .bind(payment.amount)
            .bind(&payment.name)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(result.last_insert_rowid())
    }

    async fn list_scans(&self) -> PortResult<Vec<StoredScan>> {
        let records = sqlx::query_as::<_, ScanRecord>(
            "SELECT id, phone_number, amount, name, timestamp FROM scans ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let scans = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(scans)
    }
}
