//! Cart views.

use rust_decimal::Decimal;
use serde::Serialize;

use carsi_core::{CartItemId, PricedLine, ProductId, RecordStatus, VariantId, round_money};

/// An active cart row joined with its product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub variant_name: Option<String>,
    pub variant_value: Option<String>,
    pub quantity: i32,
    pub product_name: String,
    pub unit_price: Decimal,
    pub stock: i32,
    #[serde(skip)]
    pub product_status: RecordStatus,
    pub images: Vec<String>,
}

impl CartLine {
    #[must_use]
    pub const fn priced(&self) -> PricedLine {
        PricedLine {
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub total: Decimal,
}

impl CartView {
    #[must_use]
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let item_count = items.iter().map(|line| i64::from(line.quantity)).sum();
        let total = round_money(items.iter().map(|line| line.priced().line_total()).sum());
        Self {
            items,
            item_count,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(id),
            variant_id: None,
            variant_name: None,
            variant_value: None,
            quantity,
            product_name: format!("Ürün {id}"),
            unit_price: price,
            stock: 10,
            product_status: RecordStatus::Active,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::from_lines(vec![
            line(1, Decimal::new(100, 0), 2),
            line(2, Decimal::new(1_250, 2), 3),
        ]);
        assert_eq!(view.item_count, 5);
        assert_eq!(view.total, Decimal::new(23_750, 2));
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::from_lines(Vec::new());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total, Decimal::ZERO);
    }
}
