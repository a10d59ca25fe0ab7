pub mod cart_service;
pub mod order_service;
pub mod stock_ledger;
