mod common;

use anyhow::Result;
use common::{test_service, test_service_with_admin, ADMIN};
use creditum::application::AppError;
use creditum::domain::Role;

#[tokio::test]
async fn test_unassigned_account_reads_as_unknown() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert_eq!(service.role_of("stranger").await?, Role::Unknown);

    Ok(())
}

#[tokio::test]
async fn test_assign_and_reassign_role() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.assign_role("acct-1", Role::Reseller).await?;
    assert_eq!(service.role_of("acct-1").await?, Role::Reseller);

    // Each account maps to exactly one role; assignment replaces it
    service.assign_role("acct-1", Role::Client).await?;
    assert_eq!(service.role_of("acct-1").await?, Role::Client);

    let assignments = service.list_roles().await?;
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].role, Role::Client);

    Ok(())
}

#[tokio::test]
async fn test_non_admin_roles_are_forbidden() -> Result<()> {
    let (service, _temp) = test_service().await?;

    for (actor, role) in [
        ("m-1", Role::Master),
        ("r-1", Role::Reseller),
        ("c-1", Role::Client),
        ("u-1", Role::Unknown),
    ] {
        service.assign_role(actor, role).await?;

        let result = service.adjust_credit(actor, "customer-1", 10).await;
        assert!(
            matches!(result, Err(AppError::Forbidden { .. })),
            "role {} must not manage credits",
            role
        );
    }

    // Actor with no role row at all
    let result = service.adjust_credit("nobody", "customer-1", 10).await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    // Nothing was written by any of the attempts
    assert_eq!(service.balance_of("customer-1").await?.balance, 0);
    assert!(service.history("customer-1", None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_forbidden_regardless_of_amount_validity() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.assign_role("c-1", Role::Client).await?;

    // Even an overdraw reports Forbidden, not the precondition failure
    let result = service.adjust_credit("c-1", "customer-1", -500).await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    Ok(())
}

#[tokio::test]
async fn test_revoking_admin_closes_the_gate() -> Result<()> {
    let (service, _temp) = test_service_with_admin().await?;

    service.adjust_credit(ADMIN, "customer-1", 10).await?;

    service.assign_role(ADMIN, Role::Client).await?;
    let result = service.adjust_credit(ADMIN, "customer-1", 10).await;
    assert!(matches!(result, Err(AppError::Forbidden { .. })));

    assert_eq!(service.balance_of("customer-1").await?.balance, 10);

    Ok(())
}

#[tokio::test]
async fn test_profile_lookup() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.get_profile("acct-1").await;
    assert!(matches!(result, Err(AppError::ProfileNotFound(_))));

    service.set_profile("acct-1", "Bob").await?;
    let profile = service.get_profile("acct-1").await?;
    assert_eq!(profile.display_name, "Bob");

    service.set_profile("acct-1", "Robert").await?;
    let profile = service.get_profile("acct-1").await?;
    assert_eq!(profile.display_name, "Robert");

    Ok(())
}
