//! In-memory adapters for the storefront ports, used by the service tests.
//!
//! A transaction holds the store lock for its whole duration,
//! so commits are serialized; savepoints and rollbacks restore a snapshot of
//! the state taken when they began.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::Utc;

use crate::domain::cart::ItemSummary;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Address, NewOrderHeader, OrderLineView, OrderPage, OrderStatus, OrderView, PayMethod,
    ReservedItem, StockSnapshot,
};
use crate::domain::ports::{
    CartStore, Catalog, CommitUnit, OrderRepository, StockRows,
};

fn poisoned<T>(_: T) -> DomainError {
    DomainError::Internal("in-memory store lock poisoned".to_string())
}

#[derive(Debug, Clone)]
struct StoredItem {
    name: String,
    price: BigDecimal,
    stock: i32,
    sales: i32,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    items: BTreeMap<i64, StoredItem>,
    addresses: HashMap<i64, Address>,
    orders: Vec<OrderView>,
    lines: Vec<(String, ReservedItem)>,
    contended: HashSet<i64>,
}

impl MemoryState {
    fn order_mut(&mut self, order_id: &str) -> Result<&mut OrderView, DomainError> {
        self.orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| DomainError::Internal(format!("order {} does not exist", order_id)))
    }

    fn with_lines(&self, mut order: OrderView) -> OrderView {
        order.lines = self
            .lines
            .iter()
            .filter(|(order_id, _)| *order_id == order.order_id)
            .map(|(_, item)| OrderLineView {
                item_id: item.item_id,
                quantity: item.quantity,
                unit_price: item.unit_price.clone(),
                subtotal: &item.unit_price * BigDecimal::from(item.quantity),
            })
            .collect();
        order
    }
}

/// Items, addresses and orders behind one lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    // Kept outside the state so rollbacks do not erase them.
    swap_attempts: Arc<Mutex<HashMap<i64, u32>>>,
    transactions: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state.lock().map_err(poisoned)
    }

    pub fn add_item(&self, id: i64, name: &str, price: BigDecimal, stock: i32) {
        if let Ok(mut state) = self.lock() {
            state.items.insert(
                id,
                StoredItem {
                    name: name.to_string(),
                    price,
                    stock,
                    sales: 0,
                },
            );
        }
    }

    pub fn add_address(&self, id: i64, user_id: i64) {
        if let Ok(mut state) = self.lock() {
            state.addresses.insert(
                id,
                Address {
                    id,
                    user_id,
                    receiver: format!("receiver {}", user_id),
                    addr: "1 Market Street".to_string(),
                    phone: "13800000000".to_string(),
                },
            );
        }
    }

    /// Make every compare-and-swap on `item_id` lose, as if another writer
    /// kept changing its stock.
    pub fn simulate_contention(&self, item_id: i64) {
        if let Ok(mut state) = self.lock() {
            state.contended.insert(item_id);
        }
    }

    pub fn stock_of(&self, item_id: i64) -> Option<i32> {
        self.lock().ok()?.items.get(&item_id).map(|i| i.stock)
    }

    pub fn sales_of(&self, item_id: i64) -> Option<i32> {
        self.lock().ok()?.items.get(&item_id).map(|i| i.sales)
    }

    pub fn order_count(&self) -> usize {
        self.lock().map(|s| s.orders.len()).unwrap_or(0)
    }

    pub fn line_count(&self) -> usize {
        self.lock().map(|s| s.lines.len()).unwrap_or(0)
    }

    pub fn swap_attempts(&self, item_id: i64) -> u32 {
        self.swap_attempts
            .lock()
            .ok()
            .and_then(|a| a.get(&item_id).copied())
            .unwrap_or(0)
    }

    pub fn transactions_started(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }
}

struct MemoryUnit<'a> {
    state: &'a mut MemoryState,
    swap_attempts: &'a Mutex<HashMap<i64, u32>>,
}

impl StockRows for MemoryUnit<'_> {
    fn read_stock(&mut self, item_id: i64) -> Result<Option<StockSnapshot>, DomainError> {
        Ok(self.state.items.get(&item_id).map(|item| StockSnapshot {
            item_id,
            price: item.price.clone(),
            stock: item.stock,
            sales: item.sales,
        }))
    }

    fn compare_and_swap_stock(
        &mut self,
        seen: &StockSnapshot,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        *self
            .swap_attempts
            .lock()
            .map_err(poisoned)?
            .entry(seen.item_id)
            .or_default() += 1;

        if self.state.contended.contains(&seen.item_id) {
            return Ok(false);
        }
        match self.state.items.get_mut(&seen.item_id) {
            Some(item) if item.stock == seen.stock => {
                item.stock = seen.stock - quantity;
                item.sales += quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl CommitUnit for MemoryUnit<'_> {
    fn find_address(&mut self, address_id: i64) -> Result<Option<Address>, DomainError> {
        Ok(self.state.addresses.get(&address_id).cloned())
    }

    fn insert_order(&mut self, header: &NewOrderHeader) -> Result<(), DomainError> {
        if self.state.orders.iter().any(|o| o.order_id == header.order_id) {
            return Err(DomainError::Internal(format!(
                "duplicate order id {}",
                header.order_id
            )));
        }
        self.state.orders.push(OrderView {
            order_id: header.order_id.clone(),
            user_id: header.user_id,
            address_id: header.address_id,
            pay_method: header.pay_method,
            status: OrderStatus::Unpaid,
            total_count: 0,
            total_price: BigDecimal::from(0),
            shipping_fee: header.shipping_fee.clone(),
            trade_no: None,
            created_at: Utc::now(),
            lines: vec![],
        });
        Ok(())
    }

    fn insert_line(&mut self, order_id: &str, item: &ReservedItem) -> Result<(), DomainError> {
        self.state.order_mut(order_id)?;
        self.state.lines.push((order_id.to_string(), item.clone()));
        Ok(())
    }

    fn update_totals(
        &mut self,
        order_id: &str,
        total_count: i32,
        total_price: &BigDecimal,
    ) -> Result<(), DomainError> {
        let order = self.state.order_mut(order_id)?;
        order.total_count = total_count;
        order.total_price = total_price.clone();
        Ok(())
    }

    fn savepoint(
        &mut self,
        work: &mut dyn FnMut(&mut dyn CommitUnit) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let snapshot = self.state.clone();
        let result = work(&mut *self);
        if result.is_err() {
            *self.state = snapshot;
        }
        result
    }
}

impl OrderRepository for MemoryStore {
    fn in_transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn CommitUnit) -> Result<T, DomainError>,
    {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock()?;
        let snapshot = state.clone();
        let mut unit = MemoryUnit {
            state: &mut *state,
            swap_attempts: &self.swap_attempts,
        };
        let result = work(&mut unit);
        if result.is_err() {
            *state = snapshot;
        }
        result
    }

    fn addresses_for(&self, user_id: i64) -> Result<Vec<Address>, DomainError> {
        let state = self.lock()?;
        let mut mine: Vec<Address> = state
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by_key(|a| a.id);
        Ok(mine)
    }

    fn find_for_user(
        &self,
        user_id: i64,
        order_id: &str,
    ) -> Result<Option<OrderView>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .orders
            .iter()
            .find(|o| o.order_id == order_id && o.user_id == user_id)
            .cloned()
            .map(|o| state.with_lines(o)))
    }

    fn list_for_user(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        let state = self.lock()?;
        let mut mine: Vec<&OrderView> = state.orders.iter().filter(|o| o.user_id == user_id).collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = mine.len() as i64;
        let page = if (page - 1) * limit >= total { 1 } else { page };
        let items = mine
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .map(|o| state.with_lines(o.clone()))
            .collect();

        Ok(OrderPage {
            items,
            total,
            page,
            limit,
        })
    }

    fn mark_paid(&self, user_id: i64, order_id: &str, trade_no: &str) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let Some(order) = state.orders.iter_mut().find(|o| {
            o.order_id == order_id
                && o.user_id == user_id
                && o.pay_method == PayMethod::Online
                && o.status == OrderStatus::Unpaid
        }) else {
            return Ok(false);
        };
        order.status = OrderStatus::Paid;
        order.trade_no = Some(trade_no.to_string());
        Ok(true)
    }
}

impl Catalog for MemoryStore {
    fn find_item(&self, item_id: i64) -> Result<Option<ItemSummary>, DomainError> {
        let state = self.lock()?;
        Ok(state.items.get(&item_id).map(|item| ItemSummary {
            id: item_id,
            name: item.name.clone(),
            price: item.price.clone(),
            stock: item.stock,
        }))
    }

    fn find_items(&self, item_ids: &[i64]) -> Result<Vec<ItemSummary>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .items
            .iter()
            .filter(|(id, _)| item_ids.contains(*id))
            .map(|(id, item)| ItemSummary {
                id: *id,
                name: item.name.clone(),
                price: item.price.clone(),
                stock: item.stock,
            })
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<Mutex<HashMap<i64, HashMap<i64, i32>>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for MemoryCartStore {
    fn get(&self, user_id: i64, item_id: i64) -> Result<Option<i32>, DomainError> {
        let carts = self.carts.lock().map_err(poisoned)?;
        Ok(carts.get(&user_id).and_then(|c| c.get(&item_id)).copied())
    }

    fn set(&self, user_id: i64, item_id: i64, quantity: i32) -> Result<(), DomainError> {
        let mut carts = self.carts.lock().map_err(poisoned)?;
        carts.entry(user_id).or_default().insert(item_id, quantity);
        Ok(())
    }

    fn delete(&self, user_id: i64, item_ids: &[i64]) -> Result<(), DomainError> {
        let mut carts = self.carts.lock().map_err(poisoned)?;
        if let Some(cart) = carts.get_mut(&user_id) {
            for item_id in item_ids {
                cart.remove(item_id);
            }
        }
        Ok(())
    }

    fn all(&self, user_id: i64) -> Result<HashMap<i64, i32>, DomainError> {
        let carts = self.carts.lock().map_err(poisoned)?;
        Ok(carts.get(&user_id).cloned().unwrap_or_default())
    }

    fn count(&self, user_id: i64) -> Result<usize, DomainError> {
        let carts = self.carts.lock().map_err(poisoned)?;
        Ok(carts.get(&user_id).map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleting_absent_cart_items_is_a_no_op() {
        let cart = MemoryCartStore::new();
        cart.set(1, 7, 2).unwrap();

        cart.delete(1, &[9, 11]).expect("absent items are ignored");
        cart.delete(2, &[7]).expect("absent cart is ignored");

        assert_eq!(cart.get(1, 7).unwrap(), Some(2));
        assert_eq!(cart.count(1).unwrap(), 1);
    }

    #[test]
    fn total_quantity_sums_all_lines() {
        let cart = MemoryCartStore::new();
        cart.set(1, 7, 2).unwrap();
        cart.set(1, 9, 5).unwrap();

        assert_eq!(cart.total_quantity(1).unwrap(), 7);
        assert_eq!(cart.total_quantity(2).unwrap(), 0);
    }

    #[test]
    fn failed_transaction_restores_state() {
        let store = MemoryStore::new();
        store.add_item(7, "apple", BigDecimal::from(3), 5);

        let result: Result<(), DomainError> = store.in_transaction(|unit| {
            let seen = unit.read_stock(7)?.expect("item exists");
            assert!(unit.compare_and_swap_stock(&seen, 2)?);
            Err(DomainError::Internal("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.stock_of(7), Some(5));
        assert_eq!(store.swap_attempts(7), 1);
    }
}
