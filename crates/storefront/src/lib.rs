//! Çarşı Storefront library.
//!
//! The REST API behind the Çarşı shop: catalog, cart, addresses, checkout,
//! order tracking and the admin panel endpoints. Exposed as a library so the
//! CLI can reuse the migrations and integration tests can drive the services
//! against a real database.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
