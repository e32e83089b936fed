pub mod enums;
pub mod payments;
