//! Çarşı Core - Shared domain types.
//!
//! This crate provides the types used across all Çarşı components:
//! - `storefront` - The REST API server
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Checkout arithmetic and the order status state
//! machine live here so they can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, money, and statuses
//! - [`pricing`] - Coupon discounts and order totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{CouponKind, CouponRule, CouponRuleError, CouponValidity, OrderTotals, PricedLine};
pub use types::*;
