use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    AccountId, BalanceRow, CreditEntry, Credits, IntegrityStats, Profile, Role, RoleAssignment,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_ROLES_PROFILES};

/// Repository for balances, audit entries, roles and profiles.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_ROLES_PROFILES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Balance operations
    // ========================

    /// Get the stored balance for an account. Accounts without a balance
    /// row have never been adjusted.
    pub async fn get_balance(&self, account_id: &str) -> Result<Option<Credits>> {
        let row = sqlx::query("SELECT balance FROM balances WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        Ok(row.map(|r| r.get("balance")))
    }

    /// List all balance rows, ordered by account id.
    pub async fn list_balances(&self) -> Result<Vec<BalanceRow>> {
        let rows = sqlx::query(
            "SELECT account_id, balance, updated_at FROM balances ORDER BY account_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list balances")?;

        rows.iter().map(Self::row_to_balance).collect()
    }

    /// Atomically apply one credit adjustment: write the new balance and
    /// append the audit entry in a single transaction, conditional on the
    /// balance still being the one the caller observed.
    ///
    /// `expected` is the balance read before computing `entry.balance_after`
    /// (None when the account had no balance row). Returns false without
    /// writing anything if another writer got there first; the caller
    /// re-reads and retries.
    pub async fn try_apply_entry(
        &self,
        account_id: &str,
        expected: Option<Credits>,
        entry: &mut CreditEntry,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let now = Utc::now().to_rfc3339();

        let affected = match expected {
            // First adjustment for this account: create the row, unless a
            // concurrent call created it in the meantime.
            None => sqlx::query(
                r#"
                INSERT INTO balances (account_id, balance, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT (account_id) DO NOTHING
                "#,
            )
            .bind(account_id)
            .bind(entry.balance_after)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Failed to insert balance")?
            .rows_affected(),

            // Compare-and-swap on the previously observed balance.
            Some(expected) => sqlx::query(
                r#"
                UPDATE balances
                SET balance = ?, updated_at = ?
                WHERE account_id = ? AND balance = ?
                "#,
            )
            .bind(entry.balance_after)
            .bind(&now)
            .bind(account_id)
            .bind(expected)
            .execute(&mut *tx)
            .await
            .context("Failed to update balance")?
            .rows_affected(),
        };

        if affected == 0 {
            // Lost the race; nothing was written.
            return Ok(false);
        }

        let sequence: i64 = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'entry_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next sequence number")?
        .get("value");

        entry.sequence = sequence;

        sqlx::query(
            r#"
            INSERT INTO credit_entries (id, sequence, account_id, amount, balance_after, description, actor_id, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.sequence)
        .bind(&entry.account_id)
        .bind(entry.amount)
        .bind(entry.balance_after)
        .bind(&entry.description)
        .bind(&entry.actor_id)
        .bind(entry.recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to insert credit entry")?;

        tx.commit().await.context("Failed to commit adjustment")?;

        Ok(true)
    }

    // ========================
    // Audit entry operations
    // ========================

    /// List audit entries for an account, newest first.
    pub async fn list_entries(
        &self,
        account_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CreditEntry>> {
        let mut query = String::from(
            "SELECT id, sequence, account_id, amount, balance_after, description, actor_id, recorded_at \
             FROM credit_entries WHERE account_id = ? ORDER BY sequence DESC",
        );
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list credit entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// List every audit entry in the ledger, ordered by sequence.
    pub async fn list_all_entries(&self) -> Result<Vec<CreditEntry>> {
        let rows = sqlx::query(
            "SELECT id, sequence, account_id, amount, balance_after, description, actor_id, recorded_at \
             FROM credit_entries ORDER BY sequence",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list credit entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    // ========================
    // Role operations
    // ========================

    /// Get the role assigned to an account, if any.
    pub async fn get_role(&self, account_id: &str) -> Result<Option<Role>> {
        let row = sqlx::query("SELECT role FROM roles WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch role")?;

        Ok(row.map(|r| Role::from_stored(r.get("role"))))
    }

    /// Assign a role to an account (create-or-update).
    pub async fn set_role(&self, account_id: &str, role: Role) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (account_id, role, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (account_id) DO UPDATE SET role = excluded.role, updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id)
        .bind(role.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to set role")?;

        Ok(())
    }

    /// List all role assignments, ordered by account id.
    pub async fn list_roles(&self) -> Result<Vec<RoleAssignment>> {
        let rows =
            sqlx::query("SELECT account_id, role, updated_at FROM roles ORDER BY account_id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list roles")?;

        rows.iter()
            .map(|row| {
                Ok(RoleAssignment {
                    account_id: row.get("account_id"),
                    role: Role::from_stored(row.get("role")),
                    updated_at: Self::parse_timestamp(row.get("updated_at"))?,
                })
            })
            .collect()
    }

    // ========================
    // Profile operations
    // ========================

    /// Get the display-name profile for an account.
    pub async fn get_profile(&self, account_id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT account_id, display_name, updated_at FROM profiles WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch profile")?;

        match row {
            Some(row) => Ok(Some(Profile {
                account_id: row.get("account_id"),
                display_name: row.get("display_name"),
                updated_at: Self::parse_timestamp(row.get("updated_at"))?,
            })),
            None => Ok(None),
        }
    }

    /// Set an account's display name (create-or-update).
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (account_id, display_name, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (account_id) DO UPDATE
                SET display_name = excluded.display_name, updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.account_id)
        .bind(&profile.display_name)
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to upsert profile")?;

        Ok(())
    }

    /// List all profiles, ordered by account id.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT account_id, display_name, updated_at FROM profiles ORDER BY account_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list profiles")?;

        rows.iter()
            .map(|row| {
                Ok(Profile {
                    account_id: row.get("account_id"),
                    display_name: row.get("display_name"),
                    updated_at: Self::parse_timestamp(row.get("updated_at"))?,
                })
            })
            .collect()
    }

    /// Get a map of account id -> display name (useful for display).
    pub async fn get_display_names(
        &self,
    ) -> Result<std::collections::HashMap<AccountId, String>> {
        let rows = sqlx::query("SELECT account_id, display_name FROM profiles")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list profiles")?;

        Ok(rows
            .iter()
            .map(|row| (row.get("account_id"), row.get("display_name")))
            .collect())
    }

    // ========================
    // Integrity operations
    // ========================

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let account_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM balances")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let entry_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM credit_entries")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        // Check for sequence gaps
        let sequence_check = sqlx::query(
            r#"
            SELECT
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM credit_entries
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let min_seq: Option<i64> = sequence_check.get("min_seq");
        let max_seq: Option<i64> = sequence_check.get("max_seq");
        let count: i64 = sequence_check.get("count");

        let has_sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => (max - min + 1) != count,
            _ => false,
        };

        // Newest entry per account must agree with the stored balance
        let head_mismatches: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM balances b
            JOIN credit_entries e ON e.account_id = b.account_id
            WHERE e.sequence = (
                SELECT MAX(sequence) FROM credit_entries WHERE account_id = b.account_id
            )
            AND e.balance_after != b.balance
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let negative_balances: i64 =
            sqlx::query("SELECT COUNT(*) as count FROM balances WHERE balance < 0")
                .fetch_one(&self.pool)
                .await?
                .get("count");

        let orphaned_entries: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM credit_entries e
            WHERE NOT EXISTS (SELECT 1 FROM balances b WHERE b.account_id = e.account_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(IntegrityStats {
            account_count,
            entry_count,
            has_sequence_gaps,
            head_mismatches,
            negative_balances,
            orphaned_entries,
        })
    }

    // ========================
    // Row mapping
    // ========================

    fn parse_timestamp(s: String) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(&s)
            .context("Invalid timestamp")?
            .with_timezone(&Utc))
    }

    fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> Result<BalanceRow> {
        Ok(BalanceRow {
            account_id: row.get("account_id"),
            balance: row.get("balance"),
            updated_at: Self::parse_timestamp(row.get("updated_at"))?,
        })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CreditEntry> {
        let id_str: String = row.get("id");

        Ok(CreditEntry {
            id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            sequence: row.get("sequence"),
            account_id: row.get("account_id"),
            amount: row.get("amount"),
            balance_after: row.get("balance_after"),
            description: row.get("description"),
            actor_id: row.get("actor_id"),
            recorded_at: Self::parse_timestamp(row.get("recorded_at"))?,
        })
    }
}
