use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::cart::ItemSummary;
use crate::domain::errors::DomainError;
use crate::domain::ports::Catalog;
use crate::schema::items;

use super::models::ItemRow;

impl From<ItemRow> for ItemSummary {
    fn from(row: ItemRow) -> Self {
        ItemSummary {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
        }
    }
}

#[derive(Clone)]
pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Catalog for DieselCatalog {
    fn find_item(&self, item_id: i64) -> Result<Option<ItemSummary>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = items::table
            .filter(items::id.eq(item_id))
            .select(ItemRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(ItemSummary::from))
    }

    fn find_items(&self, item_ids: &[i64]) -> Result<Vec<ItemSummary>, DomainError> {
        if item_ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.pool.get()?;

        let rows = items::table
            .filter(items::id.eq_any(item_ids))
            .select(ItemRow::as_select())
            .order(items::id.asc())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(ItemSummary::from).collect())
    }
}
