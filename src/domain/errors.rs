use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Unrecognized payment method: {0}")]
    InvalidPayMethod(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Address not found")]
    AddressNotFound,
    #[error("Item {0} not found")]
    ItemNotFound(i64),
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: i64,
        requested: i32,
        available: i32,
    },
    #[error("Stock for item {item_id} kept changing after {attempts} attempts")]
    ConcurrentUpdateConflict { item_id: i64, attempts: u32 },
    #[error("Order not found")]
    NotFound,
    #[error("Internal error: {0}")]
    Internal(String),
}
