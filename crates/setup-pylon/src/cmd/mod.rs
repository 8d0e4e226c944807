//! Command handlers dispatched from `main`.

pub mod cache_key;
pub mod install;
pub mod platform;
pub mod resolve;
