//! Business logic services.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod orders;

pub use auth::{AuthError, AuthService, VerificationRequest};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService, PlaceOrderRequest, PlacedOrder};
pub use email::{EmailError, EmailService, Mailer, OrderConfirmation};
pub use orders::{OrderError, OrderService};
