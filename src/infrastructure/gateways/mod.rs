pub mod exchange_rate;
pub mod paypal;
pub mod stripe;
