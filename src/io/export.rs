use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::CreditService;
use crate::domain::{BalanceRow, CreditEntry, Profile, RoleAssignment};

/// Ledger snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub balances: Vec<BalanceRow>,
    pub entries: Vec<CreditEntry>,
    pub roles: Vec<RoleAssignment>,
    pub profiles: Vec<Profile>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a CreditService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a CreditService) -> Self {
        Self { service }
    }

    /// Export the audit trail to CSV format
    pub async fn export_entries_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let entries = self.service.all_entries().await?;
        let names = self.service.get_display_names().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "sequence",
            "recorded_at",
            "account",
            "display_name",
            "amount",
            "balance_after",
            "description",
            "actor",
        ])?;

        let mut count = 0;
        for entry in &entries {
            let display_name = names.get(&entry.account_id).cloned().unwrap_or_default();
            csv_writer.write_record([
                entry.sequence.to_string(),
                entry.recorded_at.to_rfc3339(),
                entry.account_id.clone(),
                display_name,
                entry.amount.to_string(),
                entry.balance_after.to_string(),
                entry.description.clone(),
                entry.actor_id.clone(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export account balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let balances = self.service.list_balances().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account", "display_name", "balance"])?;

        let mut count = 0;
        for summary in &balances {
            csv_writer.write_record([
                summary.account_id.clone(),
                summary.display_name.clone().unwrap_or_default(),
                summary.balance.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the whole ledger as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, writer: W) -> Result<LedgerSnapshot> {
        let balances = self
            .service
            .list_balances()
            .await?
            .into_iter()
            .map(|s| BalanceRow {
                account_id: s.account_id,
                balance: s.balance,
                updated_at: s.updated_at.unwrap_or_else(Utc::now),
            })
            .collect();

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balances,
            entries: self.service.all_entries().await?,
            roles: self.service.list_roles().await?,
            profiles: self.service.list_profiles().await?,
        };

        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot)
    }
}
