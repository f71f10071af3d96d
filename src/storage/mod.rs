mod repository;

pub use repository::*;

/// SQL migration for the initial ledger schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for roles and profiles
pub const MIGRATION_002_ROLES_PROFILES: &str = include_str!("migrations/002_roles_profiles.sql");
