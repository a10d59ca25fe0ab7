use std::collections::HashMap;

use bigdecimal::BigDecimal;
use diesel::dsl::now;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Address, NewOrderHeader, OrderLineView, OrderPage, OrderStatus, OrderView, PayMethod,
    ReservedItem, StockSnapshot,
};
use crate::domain::ports::{CommitUnit, OrderRepository, StockRows};
use crate::schema::{addresses, items, order_lines, orders};

use super::models::{AddressRow, ItemRow, NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row conversions ──────────────────────────────────────────────────────────

fn order_view(row: OrderRow, lines: Vec<OrderLineRow>) -> Result<OrderView, DomainError> {
    let pay_method = PayMethod::from_code(row.pay_method).ok_or_else(|| {
        DomainError::Internal(format!(
            "order {} has unknown pay method {}",
            row.order_id, row.pay_method
        ))
    })?;
    let status = OrderStatus::from_code(row.status).ok_or_else(|| {
        DomainError::Internal(format!(
            "order {} has unknown status {}",
            row.order_id, row.status
        ))
    })?;

    Ok(OrderView {
        order_id: row.order_id,
        user_id: row.user_id,
        address_id: row.address_id,
        pay_method,
        status,
        total_count: row.total_count,
        total_price: row.total_price,
        shipping_fee: row.shipping_fee,
        trade_no: row.trade_no,
        created_at: row.created_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLineView {
                subtotal: &l.unit_price * BigDecimal::from(l.quantity),
                item_id: l.item_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect(),
    })
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Address {
            id: row.id,
            user_id: row.user_id,
            receiver: row.receiver,
            addr: row.addr,
            phone: row.phone,
        }
    }
}

// ── Transaction unit ─────────────────────────────────────────────────────────

/// A connection with an open transaction, handed to the order builder.
struct PgCommitUnit<'c> {
    conn: &'c mut PgConnection,
}

impl StockRows for PgCommitUnit<'_> {
    fn read_stock(&mut self, item_id: i64) -> Result<Option<StockSnapshot>, DomainError> {
        let row = items::table
            .filter(items::id.eq(item_id))
            .select(ItemRow::as_select())
            .first(self.conn)
            .optional()?;

        Ok(row.map(|r| StockSnapshot {
            item_id: r.id,
            price: r.price,
            stock: r.stock,
            sales: r.sales,
        }))
    }

    fn compare_and_swap_stock(
        &mut self,
        seen: &StockSnapshot,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        // UPDATE items SET stock = <seen - q>, sales = sales + q
        //  WHERE id = ? AND stock = <seen>
        let updated = diesel::update(
            items::table
                .filter(items::id.eq(seen.item_id))
                .filter(items::stock.eq(seen.stock)),
        )
        .set((
            items::stock.eq(seen.stock - quantity),
            items::sales.eq(items::sales + quantity),
            items::updated_at.eq(now),
        ))
        .execute(self.conn)?;

        Ok(updated == 1)
    }
}

impl CommitUnit for PgCommitUnit<'_> {
    fn find_address(&mut self, address_id: i64) -> Result<Option<Address>, DomainError> {
        let row = addresses::table
            .filter(addresses::id.eq(address_id))
            .select(AddressRow::as_select())
            .first(self.conn)
            .optional()?;

        Ok(row.map(Address::from))
    }

    fn insert_order(&mut self, header: &NewOrderHeader) -> Result<(), DomainError> {
        diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                order_id: header.order_id.clone(),
                user_id: header.user_id,
                address_id: header.address_id,
                pay_method: header.pay_method.code(),
                status: OrderStatus::Unpaid.code(),
                total_count: 0,
                total_price: BigDecimal::from(0),
                shipping_fee: header.shipping_fee.clone(),
            })
            .execute(self.conn)?;
        Ok(())
    }

    fn insert_line(&mut self, order_id: &str, item: &ReservedItem) -> Result<(), DomainError> {
        diesel::insert_into(order_lines::table)
            .values(&NewOrderLineRow {
                id: Uuid::new_v4(),
                order_id: order_id.to_string(),
                item_id: item.item_id,
                quantity: item.quantity,
                unit_price: item.unit_price.clone(),
            })
            .execute(self.conn)?;
        Ok(())
    }

    fn update_totals(
        &mut self,
        order_id: &str,
        total_count: i32,
        total_price: &BigDecimal,
    ) -> Result<(), DomainError> {
        diesel::update(orders::table.filter(orders::order_id.eq(order_id)))
            .set((
                orders::total_count.eq(total_count),
                orders::total_price.eq(total_price),
                orders::updated_at.eq(now),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn savepoint(
        &mut self,
        work: &mut dyn FnMut(&mut dyn CommitUnit) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        // A transaction opened inside another one is a SAVEPOINT in diesel.
        self.conn
            .transaction::<_, DomainError, _>(|conn| work(&mut PgCommitUnit { conn }))
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn in_transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn CommitUnit) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| work(&mut PgCommitUnit { conn }))
    }

    fn addresses_for(&self, user_id: i64) -> Result<Vec<Address>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = addresses::table
            .filter(addresses::user_id.eq(user_id))
            .select(AddressRow::as_select())
            .order(addresses::id.asc())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    fn find_for_user(
        &self,
        user_id: i64,
        order_id: &str,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::order_id.eq(order_id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = order_lines::table
            .filter(order_lines::order_id.eq(&order.order_id))
            .select(OrderLineRow::as_select())
            .order(order_lines::created_at.asc())
            .load(&mut conn)?;

        order_view(order, lines).map(Some)
    }

    fn list_for_user(
        &self,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            // past the last page: start over, like the order history page does
            let page = if (page - 1) * limit >= total { 1 } else { page };

            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset((page - 1) * limit)
                .load(conn)?;

            let ids: Vec<&str> = rows.iter().map(|r| r.order_id.as_str()).collect();
            let lines = order_lines::table
                .filter(order_lines::order_id.eq_any(ids))
                .select(OrderLineRow::as_select())
                .order(order_lines::created_at.asc())
                .load(conn)?;

            let mut by_order: HashMap<String, Vec<OrderLineRow>> = HashMap::new();
            for line in lines {
                by_order.entry(line.order_id.clone()).or_default().push(line);
            }

            let items = rows
                .into_iter()
                .map(|row| {
                    let lines = by_order.remove(&row.order_id).unwrap_or_default();
                    order_view(row, lines)
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(OrderPage {
                items,
                total,
                page,
                limit,
            })
        })
    }

    fn mark_paid(&self, user_id: i64, order_id: &str, trade_no: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(
            orders::table
                .filter(orders::order_id.eq(order_id))
                .filter(orders::user_id.eq(user_id))
                .filter(orders::pay_method.eq(PayMethod::Online.code()))
                .filter(orders::status.eq(OrderStatus::Unpaid.code())),
        )
        .set((
            orders::status.eq(OrderStatus::Paid.code()),
            orders::trade_no.eq(Some(trade_no)),
            orders::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }
}
