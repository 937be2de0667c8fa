//! Coupon rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use carsi_core::{CouponId, CouponKind, CouponRule, CouponValidity, RecordStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub const fn rule(&self) -> CouponRule {
        CouponRule {
            kind: self.kind,
            value: self.value,
        }
    }

    #[must_use]
    pub const fn validity(&self) -> CouponValidity {
        CouponValidity {
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: self.status,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
        }
    }
}
