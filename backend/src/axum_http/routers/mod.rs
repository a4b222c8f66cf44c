pub mod check_access;
pub mod checkout;
pub mod link_session;
pub mod stripe_webhook;
