//! API request and response types.

pub mod execution;
pub mod health;
