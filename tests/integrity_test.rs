mod common;

use anyhow::Result;
use common::{grant, test_service, test_service_with_admin, ADMIN};
use creditum::domain::Role;
use creditum::io::{Exporter, LedgerSnapshot};

#[tokio::test]
async fn test_empty_ledger_is_healthy() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy());
    assert_eq!(report.account_count, 0);
    assert_eq!(report.entry_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_ledger_stays_healthy_after_adjustments() -> Result<()> {
    let (service, _temp) = test_service_with_admin().await?;

    grant(&service, "customer-1", 100).await?;
    grant(&service, "customer-2", 40).await?;
    service.adjust_credit(ADMIN, "customer-1", -25).await?;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "issues: {:?}", report.issues);
    assert_eq!(report.account_count, 2);
    assert_eq!(report.entry_count, 3);

    Ok(())
}

#[tokio::test]
async fn test_failed_adjustments_leave_no_trace() -> Result<()> {
    let (service, _temp) = test_service_with_admin().await?;

    grant(&service, "customer-1", 10).await?;
    let _ = service.adjust_credit(ADMIN, "customer-1", -50).await;
    let _ = service.adjust_credit(ADMIN, "customer-1", 0).await;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy());
    assert_eq!(report.entry_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_export_entries_csv() -> Result<()> {
    let (service, _temp) = test_service_with_admin().await?;

    service.set_profile("customer-1", "Alice").await?;
    grant(&service, "customer-1", 100).await?;
    service.adjust_credit(ADMIN, "customer-1", -30).await?;

    let exporter = Exporter::new(&service);
    let mut buf = Vec::new();
    let count = exporter.export_entries_csv(&mut buf).await?;

    assert_eq!(count, 2);
    let csv = String::from_utf8(buf)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3); // header + 2 entries
    assert!(lines[0].starts_with("sequence,"));
    assert!(lines[1].contains("customer-1"));
    assert!(lines[1].contains("Alice"));
    assert!(lines[2].contains("credit removed"));

    Ok(())
}

#[tokio::test]
async fn test_export_balances_csv() -> Result<()> {
    let (service, _temp) = test_service_with_admin().await?;

    grant(&service, "customer-1", 70).await?;
    grant(&service, "customer-2", 30).await?;

    let exporter = Exporter::new(&service);
    let mut buf = Vec::new();
    let count = exporter.export_balances_csv(&mut buf).await?;

    assert_eq!(count, 2);
    let csv = String::from_utf8(buf)?;
    assert!(csv.contains("customer-1"));
    assert!(csv.contains("70"));

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_roundtrips() -> Result<()> {
    let (service, _temp) = test_service_with_admin().await?;

    service.assign_role("r-1", Role::Reseller).await?;
    service.set_profile("customer-1", "Alice").await?;
    grant(&service, "customer-1", 100).await?;

    let exporter = Exporter::new(&service);
    let mut buf = Vec::new();
    let snapshot = exporter.export_full_json(&mut buf).await?;

    assert_eq!(snapshot.balances.len(), 1);
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.roles.len(), 2); // admin + reseller
    assert_eq!(snapshot.profiles.len(), 1);

    // The written JSON parses back into the same shape
    let parsed: LedgerSnapshot = serde_json::from_slice(&buf)?;
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].balance_after, 100);
    assert_eq!(parsed.profiles[0].display_name, "Alice");

    Ok(())
}
