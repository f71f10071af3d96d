use super::{CreditEntry, Credits};

/// Raw counts gathered by the repository for an integrity check.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub account_count: i64,
    pub entry_count: i64,
    pub has_sequence_gaps: bool,
    /// Accounts whose newest entry's `balance_after` differs from the
    /// stored balance.
    pub head_mismatches: i64,
    pub negative_balances: i64,
    /// Entries referencing an account with no balance row.
    pub orphaned_entries: i64,
}

/// Human-readable integrity report built from the stats.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub account_count: i64,
    pub entry_count: i64,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Turn raw stats into a report listing every violated invariant.
pub fn build_integrity_report(stats: &IntegrityStats) -> IntegrityReport {
    let mut issues = Vec::new();

    if stats.head_mismatches > 0 {
        issues.push(format!(
            "{} account(s) whose balance does not match the newest audit entry",
            stats.head_mismatches
        ));
    }
    if stats.negative_balances > 0 {
        issues.push(format!(
            "{} account(s) with a negative balance",
            stats.negative_balances
        ));
    }
    if stats.has_sequence_gaps {
        issues.push("gaps in the audit entry sequence".to_string());
    }
    if stats.orphaned_entries > 0 {
        issues.push(format!(
            "{} audit entr(ies) for accounts without a balance row",
            stats.orphaned_entries
        ));
    }

    IntegrityReport {
        account_count: stats.account_count,
        entry_count: stats.entry_count,
        issues,
    }
}

/// Replay a slice of entries (oldest first) and return the balance they
/// imply for one account, or 0 if the account has none.
pub fn replay_balance(account_id: &str, entries: &[CreditEntry]) -> Credits {
    entries.iter().fold(0, |balance, entry| {
        if entry.account_id == account_id {
            balance + entry.amount
        } else {
            balance
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_stats() -> IntegrityStats {
        IntegrityStats {
            account_count: 3,
            entry_count: 10,
            has_sequence_gaps: false,
            head_mismatches: 0,
            negative_balances: 0,
            orphaned_entries: 0,
        }
    }

    #[test]
    fn test_clean_ledger_is_healthy() {
        let report = build_integrity_report(&clean_stats());
        assert!(report.is_healthy());
        assert_eq!(report.account_count, 3);
        assert_eq!(report.entry_count, 10);
    }

    #[test]
    fn test_head_mismatch_is_reported() {
        let stats = IntegrityStats {
            head_mismatches: 2,
            ..clean_stats()
        };
        let report = build_integrity_report(&stats);
        assert!(!report.is_healthy());
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("newest audit entry"));
    }

    #[test]
    fn test_multiple_issues_accumulate() {
        let stats = IntegrityStats {
            has_sequence_gaps: true,
            negative_balances: 1,
            orphaned_entries: 4,
            ..clean_stats()
        };
        let report = build_integrity_report(&stats);
        assert_eq!(report.issues.len(), 3);
    }

    #[test]
    fn test_replay_balance() {
        let entries = vec![
            CreditEntry::new("a", 100, 100, "admin"),
            CreditEntry::new("b", 30, 30, "admin"),
            CreditEntry::new("a", -40, 60, "admin"),
        ];

        assert_eq!(replay_balance("a", &entries), 60);
        assert_eq!(replay_balance("b", &entries), 30);
        assert_eq!(replay_balance("missing", &entries), 0);
    }
}
