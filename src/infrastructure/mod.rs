pub mod cart_store;
pub mod catalog_repo;
pub mod models;
pub mod order_repo;
pub mod session_store;

#[cfg(test)]
pub(crate) mod memory;
#[cfg(test)]
pub(crate) mod testing;
