//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer.

mod account;

pub use account::AccountService;
