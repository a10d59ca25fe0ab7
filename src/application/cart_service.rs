use bigdecimal::{BigDecimal, Zero};
use log::debug;

use crate::domain::cart::{CartLineView, CartView, ItemSummary};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartStore, Catalog};

pub struct CartService<C, K> {
    cart: C,
    catalog: K,
}

/// Parse the `count` form field. Anything that is not a positive integer is
/// rejected.
pub fn parse_quantity(raw: &str) -> Result<i32, DomainError> {
    match raw.trim().parse::<i32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(DomainError::InvalidQuantity(raw.to_string())),
    }
}

impl<C: CartStore, K: Catalog> CartService<C, K> {
    pub fn new(cart: C, catalog: K) -> Self {
        Self { cart, catalog }
    }

    fn item(&self, item_id: i64) -> Result<ItemSummary, DomainError> {
        self.catalog
            .find_item(item_id)?
            .ok_or(DomainError::ItemNotFound(item_id))
    }

    /// Add `quantity` to whatever the cart already holds for the item.
    /// Returns the number of distinct items in the cart.
    pub fn add(&self, user_id: i64, item_id: i64, quantity: i32) -> Result<usize, DomainError> {
        let item = self.item(item_id)?;

        let wanted = match self.cart.get(user_id, item_id)? {
            Some(existing) => existing.saturating_add(quantity),
            None => quantity,
        };
        if wanted > item.stock {
            return Err(DomainError::InsufficientStock {
                item_id,
                requested: wanted,
                available: item.stock,
            });
        }

        self.cart.set(user_id, item_id, wanted)?;
        debug!("cart of user {}: item {} -> {}", user_id, item_id, wanted);
        self.cart.count(user_id)
    }

    /// Replace the quantity held for the item. Returns the total quantity in
    /// the cart.
    pub fn update(&self, user_id: i64, item_id: i64, quantity: i32) -> Result<i64, DomainError> {
        let item = self.item(item_id)?;
        if quantity > item.stock {
            return Err(DomainError::InsufficientStock {
                item_id,
                requested: quantity,
                available: item.stock,
            });
        }

        self.cart.set(user_id, item_id, quantity)?;
        self.cart.total_quantity(user_id)
    }

    /// Drop the item from the cart. Returns the total quantity left.
    pub fn remove(&self, user_id: i64, item_id: i64) -> Result<i64, DomainError> {
        self.item(item_id)?;
        self.cart.delete(user_id, &[item_id])?;
        self.cart.total_quantity(user_id)
    }

    /// Price every line of the cart. Lines whose item has left the catalog
    /// are skipped.
    pub fn show(&self, user_id: i64) -> Result<CartView, DomainError> {
        let quantities = self.cart.all(user_id)?;
        let mut ids: Vec<i64> = quantities.keys().copied().collect();
        ids.sort_unstable();

        let mut lines = Vec::with_capacity(ids.len());
        let mut total_count: i64 = 0;
        let mut total_price = BigDecimal::zero();

        for item in self.catalog.find_items(&ids)? {
            let Some(&quantity) = quantities.get(&item.id) else {
                continue;
            };
            let subtotal = &item.price * BigDecimal::from(quantity);
            total_count += i64::from(quantity);
            total_price += &subtotal;
            lines.push(CartLineView {
                item,
                quantity,
                subtotal,
            });
        }
        lines.sort_by_key(|l| l.item.id);

        Ok(CartView {
            lines,
            total_count,
            total_price,
        })
    }
}
