use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{normalize_email, LicenseStore};
use crate::error::{AppError, Result};
use crate::models::{License, Plan};

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn create_pool(database_path: &str) -> std::result::Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

/// Initialize the licenses schema. Idempotent.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- One record per purchase email. Records are never deleted;
        -- revocation sets active = 0.
        CREATE TABLE IF NOT EXISTS licenses (
            email TEXT PRIMARY KEY,
            plan TEXT NOT NULL CHECK (plan IN ('monthly', 'lifetime')),
            active INTEGER NOT NULL DEFAULT 0,
            customer_id TEXT,
            subscription_id TEXT,
            activated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_customer ON licenses(customer_id);
        "#,
    )
}

const LICENSE_COLS: &str = "email, plan, active, customer_id, subscription_id, activated_at";

fn license_from_row(row: &Row) -> rusqlite::Result<License> {
    let plan: String = row.get(1)?;
    let plan = plan.parse::<Plan>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(1, "plan".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(License {
        email: row.get(0)?,
        plan,
        active: row.get::<_, i32>(2)? != 0,
        customer_id: row.get(3)?,
        subscription_id: row.get(4)?,
        activated_at: row.get(5)?,
    })
}

/// SQLite-backed license store, pooled for concurrent handlers.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open a store at `database_path` and ensure the schema exists.
    pub fn open(database_path: &str) -> Result<Self> {
        let pool = create_pool(database_path)
            .map_err(|e| AppError::Internal(format!("Failed to create database pool: {}", e)))?;
        let conn = pool.get()?;
        init_db(&conn)?;
        Ok(Self::new(pool))
    }
}

impl LicenseStore for SqliteStore {
    fn get(&self, email: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM licenses WHERE email = ?1", LICENSE_COLS),
            params![normalize_email(email)],
            license_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn get_by_customer_id(&self, customer_id: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM licenses WHERE customer_id = ?1",
                LICENSE_COLS
            ),
            params![customer_id],
            license_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn upsert(&self, record: &License) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO licenses (email, plan, active, customer_id, subscription_id, activated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(email) DO UPDATE SET
                 plan = excluded.plan,
                 active = excluded.active,
                 customer_id = excluded.customer_id,
                 subscription_id = excluded.subscription_id,
                 activated_at = excluded.activated_at",
            params![
                normalize_email(&record.email),
                record.plan.as_str(),
                record.active as i32,
                record.customer_id,
                record.subscription_id,
                record.activated_at,
            ],
        )?;
        Ok(())
    }

    fn set_active(&self, email: &str, active: bool) -> Result<bool> {
        let conn = self.pool.get()?;
        let affected = conn.execute(
            "UPDATE licenses SET active = ?1 WHERE email = ?2",
            params![active as i32, normalize_email(email)],
        )?;
        Ok(affected > 0)
    }
}
