//! Wire types of the favorites API and shared state enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{ProductId, UserId};

/// Body of the add/remove favorite requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
}

/// One entry of a favorites listing.
///
/// The listing endpoints return either bare product ids or records that carry
/// the product id under one of several keys (`productId`, `idProducto`,
/// `product_id`, a nested `producto.id`, or, as a last resort, `id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFavoriteEntry")]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl FavoriteRecord {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            added_at: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFavoriteEntry {
    Id(ProductId),
    Record(RawFavoriteRecord),
}

#[derive(Deserialize)]
struct RawFavoriteRecord {
    #[serde(rename = "productId")]
    product_id: Option<ProductId>,
    #[serde(rename = "idProducto")]
    id_producto: Option<ProductId>,
    #[serde(rename = "product_id")]
    product_id_snake: Option<ProductId>,
    producto: Option<NestedProduct>,
    id: Option<ProductId>,
    #[serde(alias = "addedAt", alias = "fechaAgregado", alias = "createdAt")]
    added_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct NestedProduct {
    id: ProductId,
}

impl TryFrom<RawFavoriteEntry> for FavoriteRecord {
    type Error = String;

    fn try_from(raw: RawFavoriteEntry) -> Result<Self, Self::Error> {
        match raw {
            RawFavoriteEntry::Id(product_id) => Ok(Self::new(product_id)),
            RawFavoriteEntry::Record(r) => {
                let product_id = r
                    .product_id
                    .or(r.id_producto)
                    .or(r.product_id_snake)
                    .or(r.producto.map(|p| p.id))
                    .or(r.id)
                    .ok_or_else(|| "favorite record carries no product id".to_string())?;
                Ok(Self {
                    product_id,
                    added_at: r.added_at,
                })
            }
        }
    }
}

/// Connectivity state of the favorites client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The last remote call succeeded.
    Online,
    /// The last remote call failed transiently (network, timeout or 5xx).
    Offline,
}
