//! Admin route handlers: dashboard, users, coupons and order management.
//!
//! Product and category management live in their own modules and are
//! mounted under the same `/api/admin` prefix.

use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use carsi_core::{
    CouponKind, CouponRule, OrderId, OrderStatus, UserId, UserRole, UserStatus,
    pricing::{CouponRuleError, CouponValidity},
};

use crate::db::RepositoryError;
use crate::db::coupons::{CouponRepository, NewCoupon};
use crate::db::dashboard::{CategorySales, DashboardRepository, StoreTotals};
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Coupon, Order, OrderDetail, OrderSummary, User};
use crate::routes::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::OrderService;
use crate::state::AppState;

const RECENT_ORDERS: i64 = 10;
const TOP_CATEGORIES: i64 = 5;

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub totals: StoreTotals,
    pub recent_orders: Vec<OrderSummary>,
    pub top_categories: Vec<CategorySales>,
}

/// GET /api/admin/dashboard
#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Dashboard> {
    let repo = DashboardRepository::new(state.pool());
    let totals = repo.totals().await?;
    let top_categories = repo.top_categories(TOP_CATEGORIES).await?;
    let recent_orders = OrderRepository::new(state.pool())
        .recent(RECENT_ORDERS)
        .await?;

    Ok(ApiResponse::data(Dashboard {
        totals,
        recent_orders,
        top_categories,
    }))
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: UserStatus,
}

fn not_found_as_user(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Kullanıcı bulunamadı".to_owned()),
        other => AppError::Database(other),
    }
}

/// An admin demoting or disabling themselves would lock the panel.
fn reject_self(admin_id: UserId, target: UserId) -> Result<(), AppError> {
    if admin_id == target {
        return Err(AppError::BadRequest(
            "Kendi hesabınızın rolünü veya durumunu değiştiremezsiniz".to_owned(),
        ));
    }
    Ok(())
}

/// GET /api/admin/users
#[instrument(skip(state, _admin))]
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<User>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(ApiResponse::data(users))
}

/// PUT /api/admin/users/{id}/role
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> ApiResult<User> {
    reject_self(admin.id, id)?;
    let user = UserRepository::new(state.pool())
        .set_role(id, body.role)
        .await
        .map_err(not_found_as_user)?;
    tracing::info!(user_id = %id, role = %body.role, "user role changed");
    Ok(ApiResponse::data(user).with_message("Kullanıcı rolü güncellendi"))
}

/// PUT /api/admin/users/{id}/status
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_user_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> ApiResult<User> {
    reject_self(admin.id, id)?;
    let user = UserRepository::new(state.pool())
        .set_status(id, body.status)
        .await
        .map_err(not_found_as_user)?;
    tracing::info!(user_id = %id, status = %body.status, "user status changed");
    Ok(ApiResponse::data(user).with_message("Kullanıcı durumu güncellendi"))
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewCouponRequest {
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

impl NewCouponRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.code.trim().is_empty() {
            return Err(AppError::BadRequest("Kupon kodu zorunludur".to_owned()));
        }
        if self.usage_limit.is_some_and(|limit| limit <= 0) {
            return Err(AppError::BadRequest(
                "Kullanım limiti en az 1 olmalıdır".to_owned(),
            ));
        }
        CouponRule::new(self.kind, self.value)
            .map_err(|e| AppError::BadRequest(coupon_rule_message(&e).to_owned()))?;
        CouponValidity::check_window(self.starts_at, self.ends_at)
            .map_err(|e| AppError::BadRequest(coupon_rule_message(&e).to_owned()))?;
        Ok(())
    }
}

const fn coupon_rule_message(e: &CouponRuleError) -> &'static str {
    match e {
        CouponRuleError::NonPositiveValue => "Kupon değeri sıfırdan büyük olmalıdır",
        CouponRuleError::PercentageAboveHundred => "Yüzde indirim 100'ü geçemez",
        CouponRuleError::InvertedWindow => "Bitiş tarihi başlangıç tarihinden önce olamaz",
    }
}

/// GET /api/admin/coupons
#[instrument(skip(state, _admin))]
pub async fn coupons(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<Coupon>> {
    let coupons = CouponRepository::new(state.pool()).list().await?;
    Ok(ApiResponse::data(coupons))
}

/// POST /api/admin/coupons
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, code = %body.code))]
pub async fn create_coupon(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<NewCouponRequest>,
) -> ApiResult<Coupon> {
    body.validate()?;
    let coupon = CouponRepository::new(state.pool())
        .create(&NewCoupon {
            code: &body.code,
            kind: body.kind,
            value: body.value,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            usage_limit: body.usage_limit,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("Bu kupon kodu zaten kullanılıyor".to_owned())
            }
            other => AppError::Database(other),
        })?;

    tracing::info!(coupon_id = %coupon.id, "coupon created");
    Ok(ApiResponse::created(coupon).with_message("Kupon oluşturuldu"))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

/// GET /api/admin/orders
#[instrument(skip(state, _admin))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Vec<OrderSummary>> {
    let orders = OrderService::new(state.pool()).list_all().await?;
    Ok(ApiResponse::data(orders))
}

/// GET /api/admin/orders/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<OrderDetail> {
    let detail = OrderService::new(state.pool()).get_detail(id, &admin).await?;
    Ok(ApiResponse::data(detail))
}

/// PUT /api/admin/orders/{id}/status
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<OrderStatusRequest>,
) -> ApiResult<Order> {
    let order = OrderService::new(state.pool())
        .update_status(id, body.status)
        .await?;
    Ok(ApiResponse::data(order).with_message("Sipariş durumu güncellendi"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon_request() -> NewCouponRequest {
        let now = Utc::now();
        NewCouponRequest {
            code: "YAZ10".to_owned(),
            kind: CouponKind::Percentage,
            value: Decimal::from(10),
            starts_at: now,
            ends_at: now + Duration::days(30),
            usage_limit: Some(100),
        }
    }

    #[test]
    fn test_valid_coupon_request() {
        assert!(coupon_request().validate().is_ok());
    }

    #[test]
    fn test_coupon_request_rejections() {
        let blank = NewCouponRequest {
            code: "  ".to_owned(),
            ..coupon_request()
        };
        assert!(matches!(blank.validate(), Err(AppError::BadRequest(_))));

        let too_much = NewCouponRequest {
            value: Decimal::from(150),
            ..coupon_request()
        };
        assert!(matches!(too_much.validate(), Err(AppError::BadRequest(m)) if m.contains("100")));

        let base = coupon_request();
        let inverted = NewCouponRequest {
            ends_at: base.starts_at - Duration::days(1),
            ..coupon_request()
        };
        assert!(inverted.validate().is_err());

        let zero_limit = NewCouponRequest {
            usage_limit: Some(0),
            ..coupon_request()
        };
        assert!(zero_limit.validate().is_err());
    }

    #[test]
    fn test_reject_self() {
        assert!(reject_self(UserId::new(1), UserId::new(1)).is_err());
        assert!(reject_self(UserId::new(1), UserId::new(2)).is_ok());
    }
}
