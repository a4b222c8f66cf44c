pub mod kv_rest;
pub mod null;
