pub mod cart_store;
pub mod identity;
pub mod inventory_repo;
pub mod models;
pub mod order_repo;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod memory;
#[cfg(test)]
pub(crate) mod test_support;
