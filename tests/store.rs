//! License store contract tests, run against both backends.

mod common;

use common::*;

fn stores() -> Vec<(&'static str, Box<dyn LicenseStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new()) as Box<dyn LicenseStore>),
        ("sqlite", Box::new(sqlite_store()) as Box<dyn LicenseStore>),
    ]
}

#[test]
fn upsert_then_get_returns_last_write() {
    for (name, store) in stores() {
        let first = monthly_license("user@example.com", "cus_1");
        store.upsert(&first).unwrap();

        let mut second = first.clone();
        second.plan = Plan::Lifetime;
        second.active = false;
        second.subscription_id = None;
        store.upsert(&second).unwrap();

        let found = store.get("user@example.com").unwrap().unwrap();
        assert_eq!(found, second, "last write should win ({})", name);
    }
}

#[test]
fn lookups_are_case_insensitive() {
    for (name, store) in stores() {
        store
            .upsert(&monthly_license("User@Example.COM", "cus_1"))
            .unwrap();

        let lower = store.get("user@example.com").unwrap();
        let upper = store.get("USER@EXAMPLE.COM").unwrap();
        assert!(lower.is_some(), "lower-case lookup should hit ({})", name);
        assert_eq!(lower, upper, "case variants address one record ({})", name);
        assert_eq!(lower.unwrap().email, "user@example.com");
    }
}

#[test]
fn reverse_lookup_by_customer_id() {
    for (name, store) in stores() {
        store
            .upsert(&monthly_license("a@example.com", "cus_a"))
            .unwrap();
        store
            .upsert(&lifetime_license("b@example.com", "cus_b"))
            .unwrap();

        let found = store.get_by_customer_id("cus_b").unwrap().unwrap();
        assert_eq!(found.email, "b@example.com", "({})", name);
        assert!(store.get_by_customer_id("cus_missing").unwrap().is_none());
    }
}

#[test]
fn set_active_merges_without_touching_other_fields() {
    for (name, store) in stores() {
        let original = monthly_license("user@example.com", "cus_1");
        store.upsert(&original).unwrap();

        assert!(store.set_active("USER@example.com", false).unwrap());

        let found = store.get("user@example.com").unwrap().unwrap();
        assert!(!found.active, "({})", name);
        assert_eq!(found.plan, original.plan);
        assert_eq!(found.customer_id, original.customer_id);
        assert_eq!(found.subscription_id, original.subscription_id);
        assert_eq!(found.activated_at, original.activated_at);
    }
}

#[test]
fn set_active_reports_missing_record() {
    for (_, store) in stores() {
        assert!(!store.set_active("ghost@example.com", true).unwrap());
    }
}

#[test]
fn reapplying_an_upsert_is_idempotent() {
    for (name, store) in stores() {
        let record = lifetime_license("user@example.com", "cus_1");
        store.upsert(&record).unwrap();
        store.upsert(&record).unwrap();

        let found = store.get("user@example.com").unwrap().unwrap();
        assert_eq!(found, record, "({})", name);
    }
}
