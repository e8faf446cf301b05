//! License persistence.
//!
//! The store is an injected trait object with two interchangeable backends:
//! [`MemoryStore`] (dev/tests) and [`SqliteStore`] (production). Both key
//! records by lower-cased email and support reverse lookup by the Stripe
//! customer id, which is how webhook events find their record.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{create_pool, init_db, DbPool, SqliteStore};

use crate::error::Result;
use crate::models::License;

/// Lower-case an email for use as a store key. All lookups and writes go
/// through this so `A@B.com` and `a@b.com` address the same record.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Key-value access to license records.
///
/// `upsert` is a whole-record, last-write-wins write keyed by normalized
/// email; `set_active` is the field-merge used by webhook reconciliation.
/// Implementations must be safe to call from concurrent handlers.
pub trait LicenseStore: Send + Sync {
    fn get(&self, email: &str) -> Result<Option<License>>;

    /// Reverse lookup by Stripe customer id.
    fn get_by_customer_id(&self, customer_id: &str) -> Result<Option<License>>;

    /// Create or overwrite the record for `record.email`.
    fn upsert(&self, record: &License) -> Result<()>;

    /// Flip the `active` flag, leaving every other field untouched.
    /// Returns false when no record exists for the email.
    fn set_active(&self, email: &str, active: bool) -> Result<bool>;
}
