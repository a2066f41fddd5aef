//! Domain types: stored rows, request payloads and nested response views.

pub mod company;
pub mod dates;
pub mod enums;
pub mod filters;
pub mod lab;
pub mod patch;
pub mod patient;
pub mod payment;
pub mod protocol;
pub mod reference;
pub mod submission;
pub mod user;

pub use company::*;
pub use filters::*;
pub use lab::*;
pub use patch::{NullField, Patch};
pub use patient::*;
pub use payment::*;
pub use protocol::*;
pub use reference::*;
pub use submission::*;
pub use user::*;
