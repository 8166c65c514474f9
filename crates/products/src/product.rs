use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, FieldAccessor, ProductId};

/// Catalog product as served by the remote catalog (read-only on the client).
///
/// Field names follow the API's camelCase shape; the older Spanish names the
/// landing endpoint still returns are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(alias = "nombre")]
    pub name: String,
    /// Price of the first (smallest) package.
    #[serde(alias = "precioPaquete1")]
    pub price_first_package: Decimal,
    pub stock: i64,
    #[serde(alias = "especificaciones", default)]
    pub description: String,
    /// Publication time, when the catalog provides it (used for "newest first").
    #[serde(alias = "fechaCreacion", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields matched by the product search box: name OR description.
pub const PRODUCT_SEARCH_FIELDS: &[FieldAccessor<Product>] = &[Product::name, Product::description];

impl Product {
    /// Build a validated product.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price_first_package: Decimal,
        stock: i64,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        let product = Self {
            id,
            name: name.into(),
            price_first_package,
            stock,
            description: description.into(),
            created_at: None,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Check the invariants of a product received from the wire.
    pub fn validate(&self) -> DomainResult<()> {
        if self.stock < 0 {
            return Err(DomainError::validation(format!(
                "product {} has negative stock ({})",
                self.id, self.stock
            )));
        }
        if self.price_first_package.is_sign_negative() {
            return Err(DomainError::validation(format!(
                "product {} has a negative price",
                self.id
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// A product can be added to the cart only while it has stock.
    pub fn is_available(&self) -> bool {
        self.stock > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::search;

    fn product(id: &str, name: &str, stock: i64) -> Product {
        Product::new(ProductId::from(id), name, Decimal::new(4500, 2), stock, "").unwrap()
    }

    #[test]
    fn availability_follows_stock() {
        assert!(product("1", "IPA Dorada", 3).is_available());
        assert!(!product("2", "Stout Oscura", 0).is_available());
    }

    #[test]
    fn new_rejects_negative_stock() {
        let err = Product::new(ProductId::from("1"), "IPA", Decimal::ONE, -1, "").unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("negative stock")),
            _ => panic!("Expected Validation error for negative stock"),
        }
    }

    #[test]
    fn new_rejects_negative_price() {
        let err = Product::new(ProductId::from("1"), "IPA", Decimal::new(-1, 0), 1, "").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn deserializes_landing_payload_with_spanish_names() {
        let json = r#"{
            "id": 12,
            "nombre": "Porter Nocturna",
            "precioPaquete1": 129.5,
            "stock": 4,
            "especificaciones": "Notas de cafe y chocolate",
            "imagen": "https://cdn.example/porter.png"
        }"#;

        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, ProductId::from("12"));
        assert_eq!(p.name, "Porter Nocturna");
        assert_eq!(p.price_first_package, Decimal::new(1295, 1));
        assert_eq!(p.description, "Notas de cafe y chocolate");
        assert!(p.created_at.is_none());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let json = r#"{
            "id": "p-7",
            "name": "Weizen",
            "priceFirstPackage": "55.00",
            "stock": 0,
            "description": "Trigo",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;

        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.price_first_package, Decimal::new(5500, 2));
        assert!(!p.is_available());
        assert!(p.created_at.is_some());
    }

    #[test]
    fn search_matches_name_or_description() {
        let mut stout = product("2", "Stout Oscura", 1);
        stout.description = "Cuerpo denso, tostada".to_string();
        let records = vec![product("1", "IPA Dorada", 1), stout];

        let by_name = search(&records, "dorada", PRODUCT_SEARCH_FIELDS);
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, ProductId::from("1"));

        let by_description = search(&records, "TOSTADA", PRODUCT_SEARCH_FIELDS);
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].id, ProductId::from("2"));
    }
}
