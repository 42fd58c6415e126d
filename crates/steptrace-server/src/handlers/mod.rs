//! HTTP handler modules.
//!
//! Handlers validate the request and hand it to the configured
//! [`Executor`](crate::executor::Executor); the Trace is returned untouched.

pub mod execution;
pub mod health;
