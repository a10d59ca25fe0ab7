use std::collections::HashMap;

use bigdecimal::BigDecimal;

use super::cart::ItemSummary;
use super::errors::DomainError;
use super::order::{Address, NewOrderHeader, OrderPage, OrderView, ReservedItem, StockSnapshot};

/// Per-user item -> quantity ledger living outside the relational store.
pub trait CartStore: Send + Sync + 'static {
    fn get(&self, user_id: i64, item_id: i64) -> Result<Option<i32>, DomainError>;
    fn set(&self, user_id: i64, item_id: i64, quantity: i32) -> Result<(), DomainError>;
    /// Removing items that are not in the cart is a no-op.
    fn delete(&self, user_id: i64, item_ids: &[i64]) -> Result<(), DomainError>;
    fn all(&self, user_id: i64) -> Result<HashMap<i64, i32>, DomainError>;
    /// Number of distinct items in the cart.
    fn count(&self, user_id: i64) -> Result<usize, DomainError>;

    /// Sum of all quantities in the cart.
    fn total_quantity(&self, user_id: i64) -> Result<i64, DomainError> {
        Ok(self.all(user_id)?.values().map(|q| i64::from(*q)).sum())
    }
}

/// Resolves a session token to the user it was issued for.
pub trait SessionStore: Send + Sync + 'static {
    fn user_for(&self, token: &str) -> Result<Option<i64>, DomainError>;
}

pub trait Catalog: Send + Sync + 'static {
    fn find_item(&self, item_id: i64) -> Result<Option<ItemSummary>, DomainError>;
    fn find_items(&self, item_ids: &[i64]) -> Result<Vec<ItemSummary>, DomainError>;
}

/// Stock rows as seen from inside a transaction.
pub trait StockRows {
    fn read_stock(&mut self, item_id: i64) -> Result<Option<StockSnapshot>, DomainError>;

    /// Take `quantity` off the item's stock and add it to its sales, but only if
    /// the stock still equals `seen.stock`. Returns `false` when another writer
    /// got there first.
    fn compare_and_swap_stock(
        &mut self,
        seen: &StockSnapshot,
        quantity: i32,
    ) -> Result<bool, DomainError>;
}

/// Everything the order builder does while its transaction is open.
pub trait CommitUnit: StockRows {
    fn find_address(&mut self, address_id: i64) -> Result<Option<Address>, DomainError>;
    fn insert_order(&mut self, header: &NewOrderHeader) -> Result<(), DomainError>;
    fn insert_line(&mut self, order_id: &str, item: &ReservedItem) -> Result<(), DomainError>;
    fn update_totals(
        &mut self,
        order_id: &str,
        total_count: i32,
        total_price: &BigDecimal,
    ) -> Result<(), DomainError>;

    /// Run `work` behind a savepoint. If it fails, everything it wrote is
    /// undone while the enclosing transaction stays open.
    fn savepoint(
        &mut self,
        work: &mut dyn FnMut(&mut dyn CommitUnit) -> Result<(), DomainError>,
    ) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Run `work` in one transaction, committing only if it returns `Ok`.
    fn in_transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn CommitUnit) -> Result<T, DomainError>;

    /// Delivery addresses the user can pick at checkout, oldest first.
    fn addresses_for(&self, user_id: i64) -> Result<Vec<Address>, DomainError>;

    fn find_for_user(&self, user_id: i64, order_id: &str)
        -> Result<Option<OrderView>, DomainError>;

    fn list_for_user(&self, user_id: i64, page: i64, limit: i64)
        -> Result<OrderPage, DomainError>;

    /// Move an unpaid online order to paid. Returns `false` if no such order.
    fn mark_paid(&self, user_id: i64, order_id: &str, trade_no: &str)
        -> Result<bool, DomainError>;
}
