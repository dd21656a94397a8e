//! Nutriio Core - Shared domain types.
//!
//! This crate provides the types shared by the cart engine, the checkout
//! orchestrator and the HTTP surface of the storefront:
//!
//! - string-keyed identifiers (`ProductId`, `AddressId`, `OrderId`, ...)
//! - money in Indian rupees with conversion to paise
//! - order and payment statuses
//! - validated contact details (`Email`, `Phone`)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
