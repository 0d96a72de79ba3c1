//! Account provisioning command.

use pagermart_client::Shop;

/// Create a customer account. Registration never signs the session in;
/// a fresh `pagermart shop` run does that.
pub async fn run(shop: &Shop, username: &str, email: &str) -> std::io::Result<()> {
    let secret = super::obtain_secret("Choose a password: ").await?;
    let created = shop.session().register(username, email, &secret).await;
    super::drain_notification(shop);

    if created {
        println!("Account ready. Sign in with `pagermart shop`.");
    }
    Ok(())
}
