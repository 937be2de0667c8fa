//! Cart operations with catalog checks.

use sqlx::PgPool;
use thiserror::Error;

use carsi_core::{CartItemId, ProductId, UserId, VariantId};

use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::db::products::ProductRepository;
use crate::models::CartView;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("product not found")]
    ProductNotFound,

    #[error("variant does not belong to product")]
    VariantMismatch,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

pub struct CartService<'a> {
    cart: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cart: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Current cart with totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, CartError> {
        let lines = self.cart.active_lines(user_id).await?;
        Ok(CartView::from_lines(lines))
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for missing or removed products,
    /// `CartError::VariantMismatch` if the variant is not the product's, and
    /// `CartError::InsufficientStock` if the resulting quantity exceeds stock.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartItemId, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self
            .products
            .get_available(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        if let Some(variant_id) = variant_id
            && !self.products.variant_belongs_to(variant_id, product_id).await?
        {
            return Err(CartError::VariantMismatch);
        }

        let in_cart = self.cart.quantity_of(user_id, product_id, variant_id).await?;
        if !product.can_fulfil(in_cart.saturating_add(quantity)) {
            return Err(CartError::InsufficientStock(product.name));
        }

        let id = self
            .cart
            .add(user_id, product_id, variant_id, quantity)
            .await?;
        tracing::debug!(user_id = %user_id, product_id = %product_id, quantity, "added to cart");
        Ok(id)
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not the caller's,
    /// `CartError::InsufficientStock` if stock is short.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }
        let line = self
            .cart
            .get_line(user_id, item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        if quantity > line.stock {
            return Err(CartError::InsufficientStock(line.product_name));
        }

        self.cart
            .set_quantity(user_id, item_id, quantity)
            .await
            .map_err(not_found_as_item)
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not the caller's.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<(), CartError> {
        self.cart
            .remove(user_id, item_id)
            .await
            .map_err(not_found_as_item)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the update fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, CartError> {
        Ok(self.cart.clear(user_id).await?)
    }
}

fn not_found_as_item(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::NotFound => CartError::ItemNotFound,
        other => CartError::Repository(other),
    }
}
