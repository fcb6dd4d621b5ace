//! Catalog product type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use solstice_core::ProductId;

/// A catalog product.
///
/// The catalog itself is managed elsewhere; the storefront reads it for
/// listing pages and carries product snapshots inside cart entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Category slug (e.g., "beats", "merch").
    pub category: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    /// Primary image URL.
    pub image_url: String,
    /// Whether the product is flagged as a new arrival.
    pub is_new: bool,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}
