use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use super::cart::CartLineView;
use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayMethod {
    Cash,
    Bank,
    Online,
}

impl PayMethod {
    pub fn code(self) -> i16 {
        match self {
            PayMethod::Cash => 1,
            PayMethod::Bank => 2,
            PayMethod::Online => 3,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(PayMethod::Cash),
            2 => Some(PayMethod::Bank),
            3 => Some(PayMethod::Online),
            _ => None,
        }
    }

    /// Parse the form value sent by the checkout page, e.g. `"3"`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        raw.trim()
            .parse::<i16>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| DomainError::InvalidPayMethod(raw.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            PayMethod::Cash => "cash on delivery",
            PayMethod::Bank => "bank transfer",
            PayMethod::Online => "online payment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Shipped,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn code(self) -> i16 {
        match self {
            OrderStatus::Unpaid => 1,
            OrderStatus::Paid => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Received => 4,
            OrderStatus::Cancelled => 5,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(OrderStatus::Unpaid),
            2 => Some(OrderStatus::Paid),
            3 => Some(OrderStatus::Shipped),
            4 => Some(OrderStatus::Received),
            5 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "awaiting payment",
            OrderStatus::Paid => "awaiting shipment",
            OrderStatus::Shipped => "awaiting receipt",
            OrderStatus::Received => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Validated input of an order commit.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub user_id: i64,
    pub address_id: i64,
    pub pay_method: PayMethod,
    /// Requested item ids in request order. Duplicates are kept.
    pub item_ids: Vec<i64>,
}

impl CommitRequest {
    /// Build a request from the raw form fields of the commit endpoint.
    ///
    /// Everything that can be rejected without touching storage is rejected
    /// here, so that a bad request never opens a transaction.
    pub fn from_form(
        user_id: i64,
        addr_id: Option<&str>,
        pay_method: Option<&str>,
        sku_ids: Option<&str>,
    ) -> Result<Self, DomainError> {
        let (Some(addr_id), Some(pay_method), Some(sku_ids)) = (
            non_blank(addr_id),
            non_blank(pay_method),
            non_blank(sku_ids),
        ) else {
            return Err(DomainError::Validation("incomplete data".to_string()));
        };

        let pay_method = PayMethod::parse(pay_method)?;

        let address_id = addr_id
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::AddressNotFound)?;

        let item_ids = parse_item_ids(sku_ids)?;

        Ok(Self {
            user_id,
            address_id,
            pay_method,
            item_ids,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated `sku_ids` value such as `"7,9"`.
pub fn parse_item_ids(raw: &str) -> Result<Vec<i64>, DomainError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| DomainError::Validation(format!("invalid item id '{}'", s)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(DomainError::Validation("no items requested".to_string()));
    }
    Ok(ids)
}

/// Order ids are the commit time at second granularity followed by the user id,
/// e.g. `2024051314302242` for user 42.
pub fn order_id_for(user_id: i64, now: DateTime<Utc>) -> String {
    format!("{}{}", now.format("%Y%m%d%H%M%S"), user_id)
}

#[derive(Debug, Clone)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub receiver: String,
    pub addr: String,
    pub phone: String,
}

/// Current stock row of an item as read by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSnapshot {
    pub item_id: i64,
    pub price: BigDecimal,
    pub stock: i32,
    pub sales: i32,
}

/// Outcome of a successful reservation: the quantity taken and the price
/// that was current when it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservedItem {
    pub item_id: i64,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewOrderHeader {
    pub order_id: String,
    pub user_id: i64,
    pub address_id: i64,
    pub pay_method: PayMethod,
    pub shipping_fee: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub item_id: i64,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub order_id: String,
    pub user_id: i64,
    pub address_id: i64,
    pub pay_method: PayMethod,
    pub status: OrderStatus,
    pub total_count: i32,
    pub total_price: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub trade_no: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    /// Amount the customer pays: goods plus shipping.
    pub fn total_pay(&self) -> BigDecimal {
        &self.total_price + &self.shipping_fee
    }
}

/// What the checkout page shows before an order is committed.
#[derive(Debug, Clone)]
pub struct CheckoutView {
    pub item_ids: Vec<i64>,
    pub lines: Vec<CartLineView>,
    pub addresses: Vec<Address>,
    pub total_count: i64,
    pub total_price: BigDecimal,
    pub shipping_fee: BigDecimal,
}

impl CheckoutView {
    pub fn total_pay(&self) -> BigDecimal {
        &self.total_price + &self.shipping_fee
    }
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<OrderView>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
