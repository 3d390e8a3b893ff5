//! Catalog management.

use common::ProductId;
use store::{CommerceStore, NewProduct};

use crate::error::DomainError;
use crate::views::{ProductPage, ProductView};

const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Service for managing catalog products.
pub struct CatalogService<S> {
    store: S,
}

impl<S: CommerceStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a product to the catalog.
    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, new: NewProduct) -> Result<ProductView, DomainError> {
        if new.name.trim().is_empty() {
            return Err(DomainError::Invalid(
                "product name must not be empty".to_string(),
            ));
        }
        if new.price.is_negative() {
            return Err(DomainError::Invalid(
                "product price must not be negative".to_string(),
            ));
        }

        let product = self.store.insert_product(new).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product.into())
    }

    /// Returns one page of the catalog ordered by name.
    ///
    /// `limit` defaults to 20 and is capped at 100; a negative `offset`
    /// reads from the start.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<ProductPage, DomainError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);

        let (products, total) = self.store.list_products(limit, offset).await?;
        Ok(ProductPage {
            products: products.into_iter().map(ProductView::from).collect(),
            total,
            limit,
            offset,
        })
    }

    /// Replaces a product's stock quantity with an absolute value.
    #[tracing::instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, stock: u32) -> Result<ProductView, DomainError> {
        let product = self
            .store
            .set_stock(id, stock)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        tracing::info!(product_id = %id, stock, "stock replaced");
        Ok(product.into())
    }

    /// Deletes a product, refusing while any order still references it.
    ///
    /// The referential check is enforced here; the database's RESTRICT
    /// foreign key only backstops races.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), DomainError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;

        if self.store.product_referenced(id).await? {
            return Err(DomainError::ProductReferenced { name: product.name });
        }

        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
