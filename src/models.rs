use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Billing tier. `Monthly` is a recurring subscription, `Lifetime` is a
/// one-time payment with permanent entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Lifetime,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Lifetime => "lifetime",
        }
    }

    /// Stripe Checkout mode for this plan.
    pub fn checkout_mode(&self) -> &'static str {
        match self {
            Plan::Monthly => "subscription",
            Plan::Lifetime => "payment",
        }
    }
}

impl FromStr for Plan {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Plan::Monthly),
            "lifetime" => Ok(Plan::Lifetime),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted entitlement state for one purchase email.
///
/// The email is the unique key and is always stored lower-cased.
/// `customer_id` is the Stripe customer and the join key webhook events use
/// to find their way back to a record. Records are never deleted;
/// revocation flips `active` to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub email: String,
    pub plan: Plan,
    pub active: bool,
    pub customer_id: Option<String>,
    /// None for lifetime/one-time purchases.
    pub subscription_id: Option<String>,
    /// Unix seconds of the most recent activation.
    pub activated_at: i64,
}
