//! Operator console commands.

use pagermart_client::{LoginRole, Shop};
use pagermart_core::{UnitId, UnitStatus};

/// List sold units, optionally filtered by status.
pub async fn units(
    shop: &Shop,
    username: &str,
    status: Option<UnitStatus>,
) -> std::io::Result<()> {
    if !sign_in(shop, username).await? {
        return Ok(());
    }

    let units = shop.ops().sold_units(status).await;
    super::drain_notification(shop);
    let Some(units) = units else {
        return Ok(());
    };

    if units.is_empty() {
        println!("No sold units.");
        return Ok(());
    }
    for unit in units {
        let status = unit.status.to_string();
        let item = format!("#{}", unit.item_id);
        println!(
            "{}  {status:<9}  {item:>5} {:<28} sold {}  customer {}",
            unit.id,
            unit.item_name,
            unit.purchased_at.format("%Y-%m-%d %H:%M"),
            unit.customer_id,
        );
    }
    Ok(())
}

/// Activate a batch of sold units.
pub async fn activate(shop: &Shop, username: &str, unit_ids: &[UnitId]) -> std::io::Result<()> {
    if !sign_in(shop, username).await? {
        return Ok(());
    }

    let report = shop.ops().activate(unit_ids).await;
    super::drain_notification(shop);
    let Some(report) = report else {
        return Ok(());
    };

    for id in &report.activated_ids {
        println!("activated {id}");
    }
    for error in &report.errors {
        println!("failed: {error}");
    }
    Ok(())
}

async fn sign_in(shop: &Shop, username: &str) -> std::io::Result<bool> {
    let secret = super::obtain_secret("Operator password: ").await?;
    let ok = shop
        .session()
        .login(username, &secret, LoginRole::Operator)
        .await;
    super::drain_notification(shop);
    Ok(ok)
}
