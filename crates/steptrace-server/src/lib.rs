//! HTTP front for the execution tracer.
//!
//! Accepts trace requests, runs each one under a wall-clock deadline (in a
//! worker process by default) and forwards the Trace verbatim. The tracer
//! itself has no timeout; enforcing one is this crate's job.

pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod state;
