use thiserror::Error;

use crate::domain::{Credits, Role};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Not authorized: account {actor_id} has role '{role}', credit management requires admin")]
    Forbidden { actor_id: String, role: Role },

    #[error(
        "Insufficient credits for account {account_id}: balance {balance}, requested {requested}"
    )]
    InsufficientCredits {
        account_id: String,
        balance: Credits,
        requested: Credits,
    },

    #[error("Adjustment for account {account_id} conflicted with concurrent writers ({attempts} attempts)")]
    Conflict { account_id: String, attempts: u32 },

    #[error("Store operation timed out: {0}")]
    Timeout(&'static str),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
