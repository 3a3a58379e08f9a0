//! Product use cases, including the race-tolerant create.

use stockpile_core::store::{InsertOutcome, ProductStore};
use stockpile_core::{NewProduct, Product, ProductError};

#[derive(Clone)]
pub struct ProductService<S> {
    store: S,
}

impl<S: ProductStore> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a product. A unique-name conflict means a concurrent writer
    /// inserted the same name between validation and insert; instead of
    /// failing, the request is folded into the row that won the race.
    pub async fn create(&self, input: NewProduct) -> Result<Product, ProductError> {
        input.validate()?;
        match self.store.insert(input.clone()).await? {
            InsertOutcome::Created(product) => Ok(product),
            InsertOutcome::NameConflict => self.merge_into_existing(input).await,
        }
    }

    /// Conflict recovery: description and price take the losing request's
    /// values, quantities add up (restocking, not replacement).
    async fn merge_into_existing(&self, input: NewProduct) -> Result<Product, ProductError> {
        tracing::info!(name = %input.name, "create lost unique-name race, merging into existing product");
        let Some(mut existing) = self.store.find_by_name(&input.name).await? else {
            // The winning row vanished before the compensating read.
            return Err(ProductError::ConflictUnresolved(input.name));
        };
        existing.description = input.description;
        existing.price = input.price;
        existing.add_quantity(input.quantity)?;
        Ok(self.store.update(existing).await?)
    }

    pub async fn get_all(&self) -> Result<Vec<Product>, ProductError> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Product, ProductError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    pub async fn update(&self, id: i64, input: NewProduct) -> Result<Product, ProductError> {
        input.validate()?;
        let mut product = self.get_by_id(id).await?;
        product.name = input.name;
        product.description = input.description;
        product.price = input.price;
        product.quantity = input.quantity;
        Ok(self.store.update(product).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ProductError> {
        let product = self.get_by_id(id).await?;
        Ok(self.store.delete(product.id).await?)
    }

    pub async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, ProductError> {
        Ok(self.store.search_by_name(fragment).await?)
    }

    pub async fn delete_all(&self) -> Result<u64, ProductError> {
        Ok(self.store.delete_all().await?)
    }
}
