//! Create Coupon Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{http::header::LOCATION, oapi::extract::JsonBody, prelude::*};
use serde::{Deserialize, Serialize};

use storefront_app::domain::coupons::{data::NewCoupon, records::CouponUuid};

use crate::{
    coupons::{
        errors::into_status_error,
        models::{CouponResponse, DiscountBody},
    },
    extensions::*,
    state::State,
};

/// Create Coupon Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CreateCouponRequest {
    /// Unique code customers enter
    pub code: String,

    pub discount: DiscountBody,

    /// Minimum cart total, in minor units
    #[serde(default)]
    pub min_order_value: Option<u64>,

    /// RFC 3339 instant after which the coupon stops working
    pub expires_at: String,

    #[serde(default = "default_is_active")]
    pub is_active: bool,

    /// Redemptions allowed across all users; unlimited when absent
    #[serde(default)]
    pub usage_limit: Option<u64>,

    /// Redemptions allowed per user
    #[serde(default = "default_usage_per_user")]
    pub usage_per_user: u64,
}

const fn default_is_active() -> bool {
    true
}

const fn default_usage_per_user() -> u64 {
    1
}

impl CreateCouponRequest {
    fn try_into_new_coupon(self) -> Result<NewCoupon, StatusError> {
        let code = self.code.trim().to_string();

        if code.is_empty() {
            return Err(StatusError::bad_request().brief("Coupon code is required"));
        }

        Ok(NewCoupon {
            uuid: CouponUuid::new(),
            code,
            discount: self.discount.try_into_discount()?,
            min_order_value: self.min_order_value,
            expires_at: self
                .expires_at
                .parse::<Timestamp>()
                .or_400("could not parse \"expires_at\"")?,
            is_active: self.is_active,
            usage_limit: self.usage_limit,
            usage_per_user: self.usage_per_user,
        })
    }
}

/// Create Coupon Handler
#[endpoint(
    tags("admin"),
    summary = "Create Coupon",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Coupon created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid coupon payload"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin access required"),
        (status_code = StatusCode::CONFLICT, description = "Coupon code already exists"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CreateCouponRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CouponResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    depot.admin_or_403()?;

    let coupon = json.into_inner().try_into_new_coupon()?;

    let created = state
        .app
        .coupons
        .create_coupon(coupon)
        .await
        .map_err(into_status_error)?;

    res.add_header(LOCATION, format!("/admin/coupons/{}", created.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    Ok(Json(created.into()))
}
