use std::collections::HashMap;
use std::sync::RwLock;

use super::{normalize_email, LicenseStore};
use crate::error::{AppError, Result};
use crate::models::License;

/// In-process license store. State does not survive a restart; use
/// [`super::SqliteStore`] outside of development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, License>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> AppError {
        AppError::Internal("license store lock poisoned".into())
    }
}

impl LicenseStore for MemoryStore {
    fn get(&self, email: &str) -> Result<Option<License>> {
        let records = self.records.read().map_err(|_| Self::lock_poisoned())?;
        Ok(records.get(&normalize_email(email)).cloned())
    }

    fn get_by_customer_id(&self, customer_id: &str) -> Result<Option<License>> {
        let records = self.records.read().map_err(|_| Self::lock_poisoned())?;
        Ok(records
            .values()
            .find(|r| r.customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    fn upsert(&self, record: &License) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::lock_poisoned())?;
        let email = normalize_email(&record.email);
        let mut record = record.clone();
        record.email = email.clone();
        records.insert(email, record);
        Ok(())
    }

    fn set_active(&self, email: &str, active: bool) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| Self::lock_poisoned())?;
        match records.get_mut(&normalize_email(email)) {
            Some(record) => {
                record.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
