//! Status and role enums.
//!
//! With the `postgres` feature each enum maps to a `PostgreSQL` enum type in
//! the `storefront` schema (see `crates/storefront/migrations`).

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Implements `Display`/`FromStr` from a single table of wire names.
macro_rules! wire_names {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// The `snake_case` name used in JSON and in the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError::new($kind, s)),
                }
            }
        }
    };
}

/// Lifecycle of an order.
///
/// ```text
/// pending -> confirmed -> preparing -> shipped -> delivered
///    \___________\____________\___________\_____-> cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal. All transitions are triggered by
/// an admin; nothing moves an order automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

wire_names!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Preparing => "preparing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The single forward step from this status, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether an admin may move an order from `self` to `target`.
    ///
    /// Allowed moves are the next forward step, or cancellation from any
    /// non-terminal status.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Cancelled || self.next() == Some(target)
    }

    /// Turkish label shown to customers.
    #[must_use]
    pub const fn label_tr(self) -> &'static str {
        match self {
            Self::Pending => "Beklemede",
            Self::Confirmed => "Onaylandı",
            Self::Preparing => "Hazırlanıyor",
            Self::Shipped => "Kargoda",
            Self::Delivered => "Teslim edildi",
            Self::Cancelled => "İptal edildi",
        }
    }
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shops, owns a cart, places orders.
    #[default]
    Customer,
    /// Manages the catalog and orders. Cannot shop.
    Admin,
}

wire_names!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});

/// Account state. Users are never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

wire_names!(UserStatus, "user status", {
    Active => "active",
    Inactive => "inactive",
    Deleted => "deleted",
});

impl UserStatus {
    /// Whether the account may log in.
    #[must_use]
    pub const fn can_login(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Soft-delete flag shared by products, categories, cart items, coupons and
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.record_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Removed,
}

wire_names!(RecordStatus, "record status", {
    Active => "active",
    Removed => "removed",
});

/// How the customer pays. Payment capture itself happens outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    CashOnDelivery,
    BankTransfer,
}

wire_names!(PaymentMethod, "payment method", {
    CreditCard => "credit_card",
    CashOnDelivery => "cash_on_delivery",
    BankTransfer => "bank_transfer",
});

impl PaymentMethod {
    /// Turkish label shown to customers.
    #[must_use]
    pub const fn label_tr(self) -> &'static str {
        match self {
            Self::CreditCard => "Kredi kartı",
            Self::CashOnDelivery => "Kapıda ödeme",
            Self::BankTransfer => "Havale / EFT",
        }
    }
}
