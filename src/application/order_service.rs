use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use log::{info, warn};

use crate::domain::cart::CartLineView;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    order_id_for, CheckoutView, CommitRequest, NewOrderHeader, OrderLineView, OrderPage,
    OrderStatus, OrderView, ReservedItem,
};
use crate::domain::payment::PaymentGateway;
use crate::domain::ports::{CartStore, Catalog, CommitUnit, OrderRepository};

use super::stock_ledger;

pub struct OrderService<R, C, K> {
    repo: R,
    cart: C,
    catalog: K,
    shipping_fee: BigDecimal,
    gateway: PaymentGateway,
}

impl<R: OrderRepository, C: CartStore, K: Catalog> OrderService<R, C, K> {
    pub fn new(
        repo: R,
        cart: C,
        catalog: K,
        shipping_fee: BigDecimal,
        gateway: PaymentGateway,
    ) -> Self {
        Self {
            repo,
            cart,
            catalog,
            shipping_fee,
            gateway,
        }
    }

    /// Price the selected cart lines for the checkout page. Nothing is
    /// reserved; stock is only taken by [`OrderService::commit`].
    pub fn preview(&self, user_id: i64, item_ids: &[i64]) -> Result<CheckoutView, DomainError> {
        if item_ids.is_empty() {
            return Err(DomainError::Validation("no items requested".to_string()));
        }

        let items: HashMap<i64, _> = self
            .catalog
            .find_items(item_ids)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let mut lines = Vec::with_capacity(item_ids.len());
        let mut total_count: i64 = 0;
        let mut total_price = BigDecimal::zero();

        for &item_id in item_ids {
            let item = items
                .get(&item_id)
                .cloned()
                .ok_or(DomainError::ItemNotFound(item_id))?;
            let quantity = self
                .cart
                .get(user_id, item_id)?
                .ok_or(DomainError::ItemNotFound(item_id))?;

            let subtotal = &item.price * BigDecimal::from(quantity);
            total_count += i64::from(quantity);
            total_price += &subtotal;
            lines.push(CartLineView {
                item,
                quantity,
                subtotal,
            });
        }

        Ok(CheckoutView {
            item_ids: item_ids.to_vec(),
            lines,
            addresses: self.repo.addresses_for(user_id)?,
            total_count,
            total_price,
            shipping_fee: self.shipping_fee.clone(),
        })
    }

    /// Turn the requested cart lines into an order.
    ///
    /// The address check, the header, every stock reservation and every line
    /// are written in one transaction; the order-building part runs behind a
    /// savepoint so that any failure leaves no order rows behind. Once the
    /// transaction has committed the purchased items are dropped from the
    /// cart. That cleanup is best-effort: if it fails the order stands and the
    /// cart keeps stale entries.
    pub fn commit(&self, request: CommitRequest) -> Result<OrderView, DomainError> {
        if request.item_ids.is_empty() {
            return Err(DomainError::Validation("no items requested".to_string()));
        }

        let now = Utc::now();
        let header = NewOrderHeader {
            order_id: order_id_for(request.user_id, now),
            user_id: request.user_id,
            address_id: request.address_id,
            pay_method: request.pay_method,
            shipping_fee: self.shipping_fee.clone(),
        };

        let outcome = self.repo.in_transaction(|unit| {
            match unit.find_address(request.address_id)? {
                Some(address) if address.user_id == request.user_id => {}
                _ => return Err(DomainError::AddressNotFound),
            }

            let mut reserved = Vec::with_capacity(request.item_ids.len());
            unit.savepoint(&mut |unit: &mut dyn CommitUnit| {
                reserved.clear();
                self.build_order(unit, &header, &request.item_ids, &mut reserved)
            })?;
            Ok(reserved)
        });

        let reserved = match outcome {
            Ok(reserved) => reserved,
            Err(e) => {
                info!("order {} rolled back: {}", header.order_id, e);
                return Err(e);
            }
        };

        if let Err(e) = self.cart.delete(request.user_id, &request.item_ids) {
            warn!(
                "order {} committed but cart of user {} was not cleaned up: {}",
                header.order_id, request.user_id, e
            );
        }

        let view = committed_view(header, reserved, now);
        info!(
            "order {} committed for user {}: {} items, total {}",
            view.order_id, view.user_id, view.total_count, view.total_price
        );
        Ok(view)
    }

    fn build_order(
        &self,
        unit: &mut dyn CommitUnit,
        header: &NewOrderHeader,
        item_ids: &[i64],
        reserved: &mut Vec<ReservedItem>,
    ) -> Result<(), DomainError> {
        unit.insert_order(header)?;

        let mut total_count: i32 = 0;
        let mut total_price = BigDecimal::zero();

        for &item_id in item_ids {
            let quantity = self
                .cart
                .get(header.user_id, item_id)?
                .ok_or(DomainError::ItemNotFound(item_id))?;

            let item = stock_ledger::reserve(unit, item_id, quantity)?;
            unit.insert_line(&header.order_id, &item)?;

            total_count = total_count
                .checked_add(item.quantity)
                .ok_or_else(|| DomainError::Validation("order quantity is too large".to_string()))?;
            total_price += &item.unit_price * BigDecimal::from(item.quantity);
            reserved.push(item);
        }

        unit.update_totals(&header.order_id, total_count, &total_price)
    }

    pub fn get_order(&self, user_id: i64, order_id: &str) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_for_user(user_id, order_id)
    }

    pub fn list_orders(&self, user_id: i64, page: i64, limit: i64) -> Result<OrderPage, DomainError> {
        self.repo
            .list_for_user(user_id, page.max(1), limit.clamp(1, 100))
    }

    /// Redirect URL for paying an unpaid online order at the provider.
    pub fn payment_url(&self, user_id: i64, order_id: &str) -> Result<String, DomainError> {
        let order = self
            .repo
            .find_for_user(user_id, order_id)?
            .ok_or(DomainError::NotFound)?;
        self.gateway.redirect_url(&order)
    }

    pub fn confirm_payment(
        &self,
        user_id: i64,
        order_id: &str,
        trade_no: &str,
    ) -> Result<(), DomainError> {
        if self.repo.mark_paid(user_id, order_id, trade_no)? {
            info!("order {} paid, trade {}", order_id, trade_no);
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }
}

fn committed_view(
    header: NewOrderHeader,
    reserved: Vec<ReservedItem>,
    now: chrono::DateTime<Utc>,
) -> OrderView {
    let lines: Vec<OrderLineView> = reserved
        .into_iter()
        .map(|item| OrderLineView {
            subtotal: &item.unit_price * BigDecimal::from(item.quantity),
            item_id: item.item_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    OrderView {
        total_count: lines.iter().map(|l| l.quantity).sum(),
        total_price: lines.iter().map(|l| &l.subtotal).sum(),
        order_id: header.order_id,
        user_id: header.user_id,
        address_id: header.address_id,
        pay_method: header.pay_method,
        status: OrderStatus::Unpaid,
        shipping_fee: header.shipping_fee,
        trade_no: None,
        created_at: now,
        lines,
    }
}
