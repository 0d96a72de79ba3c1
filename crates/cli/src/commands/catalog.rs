//! Catalog listing command.

use pagermart_client::Shop;

/// Print the catalog, optionally filtered.
pub async fn run(shop: &Shop, search: Option<&str>) {
    shop.catalog().ensure_loaded().await;
    super::drain_notification(shop);

    let items = match search {
        Some(term) => shop.catalog().search(term),
        None => shop.catalog().items(),
    };
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    for item in items {
        let id = format!("#{}", item.id);
        let price = format!("${}", item.unit_price);
        let description = item.description.as_deref().unwrap_or("-");
        println!("{id:>5}  {:<28} {price:>10}  {description}", item.name);
    }
}
