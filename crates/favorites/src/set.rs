//! The set of favorite product ids and the favorites filter.

use std::collections::HashSet;
use std::collections::hash_set;
use std::sync::Arc;

use storefront_core::ProductId;
use storefront_products::Product;

use crate::types::FavoriteRecord;

/// Set of favorite product ids.
///
/// Backed by a shared hash set with copy-on-write mutation, so snapshots handed
/// to observers and filters are cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: Arc<HashSet<ProductId>>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FavoriteRecord>) -> Self {
        records.into_iter().map(|r| r.product_id).collect()
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.ids.contains(product_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, ProductId> {
        self.ids.iter()
    }

    /// Ids in ascending order (stable output for rendering and logs).
    pub fn sorted(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Force membership of `product_id` to `member`.
    pub(crate) fn set(&mut self, product_id: &ProductId, member: bool) {
        if self.contains(product_id) == member {
            return;
        }
        let ids = Arc::make_mut(&mut self.ids);
        if member {
            ids.insert(product_id.clone());
        } else {
            ids.remove(product_id);
        }
    }

    /// Lazily yield `items`, keeping only favorites when `favorites_only` is set.
    ///
    /// Input order is preserved. The returned iterator holds its own snapshot of
    /// the set and can be cloned to restart it (when the input iterator can).
    pub fn filter_by_favorite<I>(&self, items: I, favorites_only: bool) -> FavoriteFilter<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Favoritable,
    {
        FavoriteFilter {
            favorites: self.clone(),
            inner: items.into_iter(),
            favorites_only,
        }
    }
}

impl FromIterator<ProductId> for FavoriteSet {
    fn from_iter<T: IntoIterator<Item = ProductId>>(iter: T) -> Self {
        Self {
            ids: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl<'a> IntoIterator for &'a FavoriteSet {
    type Item = &'a ProductId;
    type IntoIter = hash_set::Iter<'a, ProductId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Anything the presentation layer lists that maps to a product id.
pub trait Favoritable {
    fn favorite_id(&self) -> &ProductId;
}

impl Favoritable for ProductId {
    fn favorite_id(&self) -> &ProductId {
        self
    }
}

impl Favoritable for Product {
    fn favorite_id(&self) -> &ProductId {
        &self.id
    }
}

impl<T: Favoritable + ?Sized> Favoritable for &T {
    fn favorite_id(&self) -> &ProductId {
        (**self).favorite_id()
    }
}

/// Iterator returned by `filter_by_favorite`.
#[derive(Debug, Clone)]
pub struct FavoriteFilter<I> {
    favorites: FavoriteSet,
    inner: I,
    favorites_only: bool,
}

impl<I> Iterator for FavoriteFilter<I>
where
    I: Iterator,
    I::Item: Favoritable,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.favorites_only {
            return self.inner.next();
        }
        let favorites = &self.favorites;
        self.inner.find(|item| favorites.contains(item.favorite_id()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.inner.size_hint();
        if self.favorites_only { (0, upper) } else { (lower, upper) }
    }
}
