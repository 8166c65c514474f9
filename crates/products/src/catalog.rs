//! Catalog listing helpers: search, availability filter and ordering.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use storefront_core::{DomainError, search};

use crate::product::{PRODUCT_SEARCH_FIELDS, Product};

/// Ordering options offered by the catalog picker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// Keep the order the catalog returned.
    #[default]
    All,
    /// Most recently published first; products without a date go last.
    Newest,
    /// Highest first-package price first.
    PriceDesc,
    /// Lowest first-package price first.
    PriceAsc,
}

impl ProductSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSort::All => "all",
            ProductSort::Newest => "newest",
            ProductSort::PriceDesc => "price-desc",
            ProductSort::PriceAsc => "price-asc",
        }
    }

    /// Sort in place. The sort is stable: ties keep their input order.
    pub fn apply(self, products: &mut [&Product]) {
        match self {
            ProductSort::All => {}
            ProductSort::Newest => {
                // `None` orders before `Some`, so compare reversed to push unknown dates last.
                products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            ProductSort::PriceDesc => {
                products.sort_by(|a, b| b.price_first_package.cmp(&a.price_first_package));
            }
            ProductSort::PriceAsc => {
                products.sort_by(|a, b| a.price_first_package.cmp(&b.price_first_package));
            }
        }
    }
}

impl FromStr for ProductSort {
    type Err = DomainError;

    /// Accepts the picker values (`todo`, `nuevo`, `mayorMenor`, `menorMayor`)
    /// as well as the kebab-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" | "all" => Ok(ProductSort::All),
            "nuevo" | "newest" => Ok(ProductSort::Newest),
            "mayorMenor" | "price-desc" => Ok(ProductSort::PriceDesc),
            "menorMayor" | "price-asc" => Ok(ProductSort::PriceAsc),
            other => Err(DomainError::validation(format!("unknown product sort '{other}'"))),
        }
    }
}

/// Criteria applied to the catalog before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub text: String,
    pub available_only: bool,
    pub sort: ProductSort,
}

impl CatalogQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Run search, then the availability filter, then ordering.
    pub fn run<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut found = search(products, &self.text, PRODUCT_SEARCH_FIELDS);
        if self.available_only {
            found.retain(|p| p.is_available());
        }
        self.sort.apply(&mut found);
        found
    }
}
