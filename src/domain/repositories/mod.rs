pub mod carts;
pub mod payments;
pub mod users;
