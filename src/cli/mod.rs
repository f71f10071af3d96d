use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::CreditService;
use crate::domain::{format_delta, parse_credits, Role};

/// Creditum - Credit Ledger Administration
#[derive(Parser)]
#[command(name = "creditum")]
#[command(about = "A local-first credit ledger with role-gated adjustments and an audit trail")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "creditum.db")]
    pub database: String,

    /// Account id of the caller (defaults to the CREDITUM_ACTOR
    /// environment variable)
    #[arg(short, long, global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Credit management commands (admin only)
    #[command(subcommand)]
    Credit(CreditCommands),

    /// Show balance for an account or all accounts
    Balance {
        /// Account id (omit for all accounts)
        account: Option<String>,
    },

    /// Show the audit trail for an account
    History {
        /// Account id
        account: String,

        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Role management commands
    #[command(subcommand)]
    Role(RoleCommands),

    /// Profile management commands
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: entries, balances, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CreditCommands {
    /// Add credits to an account
    Add {
        /// Target account id
        account: String,

        /// Number of credits to add (positive integer)
        amount: String,
    },

    /// Remove credits from an account
    Remove {
        /// Target account id
        account: String,

        /// Number of credits to remove (positive integer)
        amount: String,
    },
}

#[derive(Subcommand)]
pub enum RoleCommands {
    /// Assign a role to an account
    Set {
        /// Account id
        account: String,

        /// Role: admin, master, reseller, client, unknown
        role: String,
    },

    /// Show the role of an account
    Show {
        /// Account id
        account: String,
    },

    /// List all role assignments
    List,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Set the display name of an account
    Set {
        /// Account id
        account: String,

        /// Display name
        name: String,
    },

    /// Show the profile of an account
    Show {
        /// Account id
        account: String,
    },
}

impl Cli {
    /// Caller identity, from the flag or the environment.
    fn actor(&self) -> Option<String> {
        self.actor
            .clone()
            .or_else(|| std::env::var("CREDITUM_ACTOR").ok())
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                CreditService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Credit(credit_cmd) => {
                let service = CreditService::connect(&self.database).await?;
                let actor = service.authenticate(self.actor().as_deref())?;
                run_credit_command(&service, &actor, credit_cmd).await?;
            }

            Commands::Balance { account } => {
                let service = CreditService::connect(&self.database).await?;
                run_balance_command(&service, account.as_deref()).await?;
            }

            Commands::History { account, limit } => {
                let service = CreditService::connect(&self.database).await?;
                run_history_command(&service, account, *limit).await?;
            }

            Commands::Role(role_cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_role_command(&service, role_cmd).await?;
            }

            Commands::Profile(profile_cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_profile_command(&service, profile_cmd).await?;
            }

            Commands::Check => {
                let service = CreditService::connect(&self.database).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = CreditService::connect(&self.database).await?;
                run_export_command(&service, export_type, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_credit_command(
    service: &CreditService,
    actor: &str,
    cmd: &CreditCommands,
) -> Result<()> {
    let (account, amount) = match cmd {
        CreditCommands::Add { account, amount } => {
            let amount = parse_positive_amount(amount)?;
            (account, amount)
        }
        CreditCommands::Remove { account, amount } => {
            let amount = parse_positive_amount(amount)?;
            (account, -amount)
        }
    };

    let result = service.adjust_credit(actor, account, amount).await?;

    let target = result.display_name.as_deref().unwrap_or(account.as_str());
    println!(
        "{}: {} credits for {} (new balance: {})",
        result.entry.description,
        format_delta(result.entry.amount),
        target,
        result.new_balance
    );

    Ok(())
}

fn parse_positive_amount(input: &str) -> Result<i64> {
    let amount =
        parse_credits(input).context("Invalid amount format. Use a whole number like '50'")?;
    if amount <= 0 {
        anyhow::bail!("Amount must be a positive number of credits");
    }
    Ok(amount)
}

async fn run_balance_command(service: &CreditService, account: Option<&str>) -> Result<()> {
    match account {
        Some(account_id) => {
            let summary = service.balance_of(account_id).await?;
            match summary.display_name {
                Some(name) => println!("{} ({}): {}", summary.account_id, name, summary.balance),
                None => println!("{}: {}", summary.account_id, summary.balance),
            }
        }
        None => {
            let summaries = service.list_balances().await?;
            if summaries.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<24} {:<20} {:>10}", "ACCOUNT", "NAME", "BALANCE");
                println!("{}", "-".repeat(56));
                for summary in summaries {
                    println!(
                        "{:<24} {:<20} {:>10}",
                        summary.account_id,
                        summary.display_name.as_deref().unwrap_or(""),
                        summary.balance
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_history_command(
    service: &CreditService,
    account: &str,
    limit: Option<usize>,
) -> Result<()> {
    let entries = service.history(account, limit).await?;

    if entries.is_empty() {
        println!("No entries found for account {}.", account);
    } else {
        println!(
            "{:<6} {:<20} {:>8} {:>10} {:<16} {:<16}",
            "SEQ", "DATE", "AMOUNT", "BALANCE", "DESCRIPTION", "ACTOR"
        );
        println!("{}", "-".repeat(80));
        for entry in entries {
            println!(
                "{:<6} {:<20} {:>8} {:>10} {:<16} {:<16}",
                entry.sequence,
                entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                format_delta(entry.amount),
                entry.balance_after,
                entry.description,
                entry.actor_id
            );
        }
    }
    Ok(())
}

async fn run_role_command(service: &CreditService, cmd: &RoleCommands) -> Result<()> {
    match cmd {
        RoleCommands::Set { account, role } => {
            let parsed = Role::from_str(role).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid role '{}'. Valid roles: admin, master, reseller, client, unknown",
                    role
                )
            })?;

            service.assign_role(account, parsed).await?;
            println!("Assigned role '{}' to account {}", parsed, account);
        }

        RoleCommands::Show { account } => {
            let role = service.role_of(account).await?;
            println!("{}: {}", account, role);
        }

        RoleCommands::List => {
            let assignments = service.list_roles().await?;
            if assignments.is_empty() {
                println!("No role assignments found.");
            } else {
                println!("{:<24} {:<10}", "ACCOUNT", "ROLE");
                println!("{}", "-".repeat(34));
                for assignment in assignments {
                    println!("{:<24} {:<10}", assignment.account_id, assignment.role);
                }
            }
        }
    }
    Ok(())
}

async fn run_profile_command(service: &CreditService, cmd: &ProfileCommands) -> Result<()> {
    match cmd {
        ProfileCommands::Set { account, name } => {
            let profile = service.set_profile(account, name).await?;
            println!("Set display name for {}: {}", account, profile.display_name);
        }

        ProfileCommands::Show { account } => {
            let profile = service.get_profile(account).await?;
            println!("Account: {}", profile.account_id);
            println!("  Name:    {}", profile.display_name);
            println!(
                "  Updated: {}",
                profile.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

async fn run_check_command(service: &CreditService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Accounts: {}", report.account_count);
    println!("Entries:  {}", report.entry_count);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &CreditService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "entries" => {
            let count = exporter.export_entries_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} entries", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} accounts, {} entries, {} roles, {} profiles",
                    snapshot.balances.len(),
                    snapshot.entries.len(),
                    snapshot.roles.len(),
                    snapshot.profiles.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: entries, balances, full",
                export_type
            );
        }
    }

    Ok(())
}
