//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator (protected routes only), injects the caller's `Actor`
//! 2. Audit logger, runs after auth so it can record the user id

pub mod audit;
pub mod auth;
