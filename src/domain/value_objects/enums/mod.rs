pub mod payment_providers;
pub mod payment_statuses;
