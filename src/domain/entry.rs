use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Credits};

pub type EntryId = Uuid;

/// An audit record for one credit adjustment. Entries are append-only and
/// immutable: once recorded they are never updated or deleted.
///
/// Invariant: the newest entry's `balance_after` for an account equals the
/// account's stored balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEntry {
    pub id: EntryId,
    /// Gapless ledger-wide ordering, assigned by the store at commit time.
    pub sequence: i64,
    pub account_id: AccountId,
    /// Signed delta applied to the balance.
    pub amount: Credits,
    pub balance_after: Credits,
    pub description: String,
    /// Who performed the adjustment.
    pub actor_id: AccountId,
    pub recorded_at: DateTime<Utc>,
}

impl CreditEntry {
    /// Build an entry for an adjustment about to be committed. The sequence
    /// is assigned by the repository when the entry is persisted.
    pub fn new(
        account_id: impl Into<AccountId>,
        amount: Credits,
        balance_after: Credits,
        actor_id: impl Into<AccountId>,
    ) -> Self {
        let description = if amount >= 0 {
            "credit added"
        } else {
            "credit removed"
        };

        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            account_id: account_id.into(),
            amount,
            balance_after,
            description: description.to_string(),
            actor_id: actor_id.into(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_follows_sign() {
        let added = CreditEntry::new("acct-1", 50, 50, "admin-1");
        assert_eq!(added.description, "credit added");

        let removed = CreditEntry::new("acct-1", -20, 30, "admin-1");
        assert_eq!(removed.description, "credit removed");
    }

    #[test]
    fn test_new_entry_has_fresh_id() {
        let a = CreditEntry::new("acct-1", 10, 10, "admin-1");
        let b = CreditEntry::new("acct-1", 10, 20, "admin-1");
        assert_ne!(a.id, b.id);
    }
}
