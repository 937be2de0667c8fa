//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and `Serialize` so repositories can
//! return them directly and handlers can put them in a response envelope.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod order;
pub mod session;
pub mod user;

pub use address::{Address, AddressInput};
pub use cart::{CartLine, CartView};
pub use catalog::{
    Category, Pagination, Product, ProductDetail, ProductPage, ProductSummary, ProductVariant,
};
pub use coupon::Coupon;
pub use order::{Order, OrderDetail, OrderLine, OrderLineView, OrderSummary};
pub use session::{CurrentUser, session_keys};
pub use user::User;
