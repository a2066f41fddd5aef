//! API endpoint handlers.
//!
//! Handlers stay thin: open a connection, call the domain function with the
//! caller's `Actor`, map the result to a status code.

pub mod auth;
pub mod companies;
pub mod health;
pub mod lab_results;
pub mod patients;
pub mod payments;
pub mod protocols;
pub mod reference;
