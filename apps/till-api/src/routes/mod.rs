//! HTTP handlers, one module per resource.

pub mod health;
pub mod inventory;
pub mod member;
pub mod sale;
