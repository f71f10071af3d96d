use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::Result as DbResult;
use chrono::{DateTime, Utc};

use crate::domain::{
    build_integrity_report, AccountId, CreditEntry, Credits, IntegrityReport, Profile, Role,
    RoleAssignment,
};
use crate::storage::Repository;

use super::AppError;

/// Upper bound on compare-and-swap retries before reporting a conflict.
const MAX_ADJUST_ATTEMPTS: u32 = 32;

/// Base delay between compare-and-swap retries. The actual delay grows
/// with the attempt count and carries per-writer jitter.
const RETRY_BACKOFF: Duration = Duration::from_millis(2);

/// Deadline applied to every individual store operation.
const STORE_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Application service providing high-level operations for the credit
/// ledger. This is the primary interface for any client (CLI, API, ...).
#[derive(Clone)]
pub struct CreditService {
    repo: Repository,
}

/// Result of a successful credit adjustment
pub struct AdjustResult {
    pub entry: CreditEntry,
    pub new_balance: Credits,
    /// Display name of the target account, when a profile exists.
    pub display_name: Option<String>,
}

/// Balance plus display name for one account
pub struct BalanceSummary {
    pub account_id: AccountId,
    pub balance: Credits,
    pub display_name: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CreditService {
    /// Create a new credit service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Resolve the caller identity. The surrounding authentication system
    /// is out of scope; this only rejects calls that arrive with no
    /// identity at all.
    pub fn authenticate(&self, actor: Option<&str>) -> Result<AccountId, AppError> {
        match actor.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(AppError::Unauthenticated(
                "no actor identity supplied".to_string(),
            )),
        }
    }

    // ========================
    // Credit operations
    // ========================

    /// Adjust an account's credit balance by a signed amount and append an
    /// audit entry.
    ///
    /// Validation order: non-zero amount, actor role gate, then the
    /// balance precondition. The balance write and the audit entry commit
    /// together, conditional on the balance observed in the same attempt;
    /// a concurrent writer triggers a re-read and retry, so no update is
    /// ever lost.
    pub async fn adjust_credit(
        &self,
        actor_id: &str,
        account_id: &str,
        amount: Credits,
    ) -> Result<AdjustResult, AppError> {
        if amount == 0 {
            return Err(AppError::InvalidAmount(
                "amount must be non-zero".to_string(),
            ));
        }

        let role = self.role_of(actor_id).await?;
        if !role.may_manage_credits() {
            return Err(AppError::Forbidden {
                actor_id: actor_id.to_string(),
                role,
            });
        }

        let mut attempts = 0;
        let entry = loop {
            attempts += 1;

            let current = self
                .store_call("read balance", self.repo.get_balance(account_id))
                .await?;
            let current_balance = current.unwrap_or(0);

            let new_balance = current_balance.checked_add(amount).ok_or_else(|| {
                AppError::InvalidAmount("amount overflows the balance range".to_string())
            })?;
            if new_balance < 0 {
                return Err(AppError::InsufficientCredits {
                    account_id: account_id.to_string(),
                    balance: current_balance,
                    requested: amount,
                });
            }

            let mut entry = CreditEntry::new(account_id, amount, new_balance, actor_id);
            let applied = self
                .store_call(
                    "apply adjustment",
                    self.repo.try_apply_entry(account_id, current, &mut entry),
                )
                .await?;

            if applied {
                break entry;
            }
            if attempts >= MAX_ADJUST_ATTEMPTS {
                return Err(AppError::Conflict {
                    account_id: account_id.to_string(),
                    attempts,
                });
            }

            // Losers back off with per-writer jitter (drawn from the
            // discarded entry id) so contending writers do not retry in
            // lockstep and starve each other out of attempts.
            let jitter = (entry.id.as_u128() % (attempts as u128 + 1)) as u32;
            tokio::time::sleep(RETRY_BACKOFF * (attempts + jitter)).await;
        };

        let display_name = self.display_name_of(account_id).await;

        Ok(AdjustResult {
            new_balance: entry.balance_after,
            entry,
            display_name,
        })
    }

    /// Get an account's balance. Accounts that were never adjusted read
    /// as 0.
    pub async fn balance_of(&self, account_id: &str) -> Result<BalanceSummary, AppError> {
        let balance = self
            .store_call("read balance", self.repo.get_balance(account_id))
            .await?
            .unwrap_or(0);

        let display_name = self.display_name_of(account_id).await;

        Ok(BalanceSummary {
            account_id: account_id.to_string(),
            balance,
            display_name,
            updated_at: None,
        })
    }

    /// Get balances for every account with a balance row.
    pub async fn list_balances(&self) -> Result<Vec<BalanceSummary>, AppError> {
        let rows = self
            .store_call("list balances", self.repo.list_balances())
            .await?;
        let names = self
            .store_call("list profiles", self.repo.get_display_names())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let display_name = names.get(&row.account_id).cloned();
                BalanceSummary {
                    account_id: row.account_id,
                    balance: row.balance,
                    display_name,
                    updated_at: Some(row.updated_at),
                }
            })
            .collect())
    }

    /// List audit entries for an account, newest first.
    pub async fn history(
        &self,
        account_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CreditEntry>, AppError> {
        self.store_call("list entries", self.repo.list_entries(account_id, limit))
            .await
    }

    /// List every audit entry in the ledger, ordered by sequence.
    pub async fn all_entries(&self) -> Result<Vec<CreditEntry>, AppError> {
        self.store_call("list entries", self.repo.list_all_entries())
            .await
    }

    // ========================
    // Role operations
    // ========================

    /// Look up an account's role. Missing assignments read as `Unknown`.
    pub async fn role_of(&self, account_id: &str) -> Result<Role, AppError> {
        let role = self
            .store_call("read role", self.repo.get_role(account_id))
            .await?;
        Ok(role.unwrap_or(Role::Unknown))
    }

    /// Assign a role to an account. This seeds the role-lookup table and
    /// is the bootstrap path for the first admin.
    pub async fn assign_role(&self, account_id: &str, role: Role) -> Result<(), AppError> {
        self.store_call("set role", self.repo.set_role(account_id, role))
            .await
    }

    /// List all role assignments.
    pub async fn list_roles(&self) -> Result<Vec<RoleAssignment>, AppError> {
        self.store_call("list roles", self.repo.list_roles()).await
    }

    // ========================
    // Profile operations
    // ========================

    /// Get an account's profile, failing if it has none.
    pub async fn get_profile(&self, account_id: &str) -> Result<Profile, AppError> {
        self.store_call("read profile", self.repo.get_profile(account_id))
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(account_id.to_string()))
    }

    /// Set an account's display name.
    pub async fn set_profile(
        &self,
        account_id: &str,
        display_name: &str,
    ) -> Result<Profile, AppError> {
        let profile = Profile::new(account_id, display_name);
        self.store_call("upsert profile", self.repo.upsert_profile(&profile))
            .await?;
        Ok(profile)
    }

    /// List all profiles.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        self.store_call("list profiles", self.repo.list_profiles())
            .await
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self
            .store_call("integrity stats", self.repo.get_integrity_stats())
            .await?;
        Ok(build_integrity_report(&stats))
    }

    /// Get a map of account ids to display names (useful for display).
    pub async fn get_display_names(&self) -> Result<HashMap<AccountId, String>, AppError> {
        self.store_call("list profiles", self.repo.get_display_names())
            .await
    }

    /// Look up an account's display name for responses. Informational
    /// only; lookup failures and timeouts degrade to `None`.
    async fn display_name_of(&self, account_id: &str) -> Option<String> {
        self.store_call("read profile", self.repo.get_profile(account_id))
            .await
            .ok()
            .flatten()
            .map(|p| p.display_name)
    }

    /// Run a repository call under the per-operation deadline.
    async fn store_call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = DbResult<T>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(STORE_OP_TIMEOUT, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Timeout(op)),
        }
    }
}
