pub mod enums;
pub mod lookup;
pub mod plans;
pub mod subscriptions;
