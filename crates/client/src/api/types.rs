//! Wire and domain types for the shop API.
//!
//! Everything here mirrors what the server sends. Cart lines in particular
//! are always the server's denormalized projection - the client never joins
//! a cart entry against the catalog itself.

use chrono::{DateTime, Utc};
use pagermart_core::{CustomerId, Email, ItemId, OperatorId, UnitId, UnitStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Catalog
// =============================================================================

/// One sellable pager model from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price; travels as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub image_url: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A cart entry exactly as the server returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartEntry {
    pub item_id: ItemId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
    /// Denormalized item details joined in by the server.
    pub item: CatalogItem,
}

/// One line of the local cart mirror.
///
/// Flattened from [`CartEntry`]; the subtotal is derived on demand and never
/// stored, so lines cannot drift out of sync with themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub item_id: ItemId,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<CartEntry> for CartLine {
    fn from(entry: CartEntry) -> Self {
        Self {
            item_id: entry.item_id,
            name: entry.item.name,
            description: entry.item.description,
            unit_price: entry.item.unit_price,
            image_url: entry.item.image_url,
            quantity: entry.quantity,
        }
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Customer account as returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerAccount {
    pub id: CustomerId,
    pub username: String,
    pub email: Email,
}

/// Operator account as returned by operator login.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorAccount {
    pub id: OperatorId,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerLoginReply {
    pub message: String,
    pub customer: CustomerAccount,
}

#[derive(Debug, Deserialize)]
pub struct OperatorLoginReply {
    pub message: String,
    pub operator: OperatorAccount,
}

#[derive(Debug, Deserialize)]
pub struct RegisterReply {
    pub message: String,
    pub customer: CustomerAccount,
}

// =============================================================================
// Checkout and operator console
// =============================================================================

/// Reply to a successful checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutReceipt {
    pub message: String,
    pub units_purchased: u32,
}

/// One unit sold at checkout, as listed for operators.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SoldUnit {
    pub id: UnitId,
    pub item_id: ItemId,
    pub item_name: String,
    pub purchased_at: DateTime<Utc>,
    pub status: UnitStatus,
    pub customer_id: CustomerId,
}

/// Outcome of a bulk activation request.
///
/// Partial failure is normal: `activated_ids` holds what went through and
/// `errors` holds one line per unit that did not.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivationReport {
    pub message: String,
    pub activated_ids: Vec<UnitId>,
    #[serde(default, deserialize_with = "null_to_default")]
    pub errors: Vec<String>,
}

/// Generic `{message}` reply for mutations with no other payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageReply {
    pub message: String,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct CustomerLoginRequest<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct OperatorLoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddCartItemRequest {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivateUnitsRequest<'a> {
    pub unit_ids: &'a [UnitId],
}

/// Deserialize `null` as the type's default; the server sends `errors: null`
/// when an activation run had none.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
