use log::debug;

use crate::domain::errors::DomainError;
use crate::domain::order::ReservedItem;
use crate::domain::ports::StockRows;

/// Attempts made before a reservation gives up on a contended item.
pub const RESERVE_ATTEMPTS: u32 = 3;

/// Reserve `quantity` units of an item with an optimistic compare-and-swap on
/// its stock column.
///
/// Each attempt re-reads the row, checks the stock, and writes the new
/// stock/sales only if the stock is still what was read. A lost race retries
/// from the read; after [`RESERVE_ATTEMPTS`] lost races the reservation fails
/// with [`DomainError::ConcurrentUpdateConflict`]. No row lock is taken
/// up front.
pub fn reserve<S>(rows: &mut S, item_id: i64, quantity: i32) -> Result<ReservedItem, DomainError>
where
    S: StockRows + ?Sized,
{
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity(format!(
            "item {} has quantity {}",
            item_id, quantity
        )));
    }

    for attempt in 1..=RESERVE_ATTEMPTS {
        let seen = rows
            .read_stock(item_id)?
            .ok_or(DomainError::ItemNotFound(item_id))?;

        if quantity > seen.stock {
            return Err(DomainError::InsufficientStock {
                item_id,
                requested: quantity,
                available: seen.stock,
            });
        }

        if rows.compare_and_swap_stock(&seen, quantity)? {
            return Ok(ReservedItem {
                item_id,
                quantity,
                unit_price: seen.price,
            });
        }

        debug!(
            "stock of item {} changed under us (attempt {}/{})",
            item_id, attempt, RESERVE_ATTEMPTS
        );
    }

    Err(DomainError::ConcurrentUpdateConflict {
        item_id,
        attempts: RESERVE_ATTEMPTS,
    })
}
