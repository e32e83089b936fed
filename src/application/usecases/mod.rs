pub mod currency;
pub mod payments;
