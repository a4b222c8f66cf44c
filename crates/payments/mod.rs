pub mod gateway;
pub mod stripe_client;
pub mod stripe_types;
pub mod webhook_signature;
