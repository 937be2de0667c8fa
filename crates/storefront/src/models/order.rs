//! Order header, line and projection types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use carsi_core::{
    AddressId, Email, OrderId, OrderLineId, OrderStatus, PaymentMethod, ProductId, UserId,
    VariantId,
};

/// An order header row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub address_id: AddressId,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable order line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// An order line with the product name and variant label joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderLineView {
    pub id: OrderLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_id: Option<VariantId>,
    pub variant_name: Option<String>,
    pub variant_value: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// List projection: the header plus customer and address summary.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub item_count: i64,
    pub address_title: String,
    pub city: String,
    pub customer_name: String,
    pub customer_email: Email,
}

/// Detail projection: header, lines and delivery address.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub status_label: &'static str,
    pub payment_method_label: &'static str,
    pub address_line: String,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub lines: Vec<OrderLineView>,
}
