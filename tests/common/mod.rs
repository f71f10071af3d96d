// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use creditum::application::CreditService;
use creditum::domain::Role;
use tempfile::TempDir;

/// Account id used as the acting administrator in most tests
pub const ADMIN: &str = "admin-1";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(CreditService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = CreditService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create a test service with an admin role already assigned
pub async fn test_service_with_admin() -> Result<(CreditService, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    service.assign_role(ADMIN, Role::Admin).await?;
    Ok((service, temp_dir))
}

/// Grant an account an initial balance as the admin
pub async fn grant(service: &CreditService, account: &str, amount: i64) -> Result<()> {
    service.adjust_credit(ADMIN, account, amount).await?;
    Ok(())
}
