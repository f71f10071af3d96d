use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Credits, Role};

/// Accounts are identified by an opaque string assigned by whatever system
/// manages sign-up (a username, an external uid, ...). The ledger never
/// interprets it.
pub type AccountId = String;

/// Display-name profile for an account. Informational only: credit
/// operations never depend on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: AccountId,
    pub display_name: String,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(account_id: impl Into<AccountId>, display_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            updated_at: Utc::now(),
        }
    }
}

/// A role assignment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub account_id: AccountId,
    pub role: Role,
    pub updated_at: DateTime<Utc>,
}

/// An account's current balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRow {
    pub account_id: AccountId,
    pub balance: Credits,
    pub updated_at: DateTime<Utc>,
}
