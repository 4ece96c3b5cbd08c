use anyhow::Context;
use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, QueryResult};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    domain::coupon::{self, ValidatedCoupon},
    models::CouponEntity,
    schema::coupons,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/coupons",
        OpenApiRouter::new().routes(utoipa_axum::routes!(validate_coupon)),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ValidateCouponReq {
    code: String,
    cart_amount: f64,
}

/// Validate a coupon code against the current cart amount.
///
/// Validation is read-only: `used_count` is only incremented when an order is
/// actually placed, so retyping the code never burns a use.
#[utoipa::path(
    post,
    path = "/validate",
    tags = ["Coupons"],
    request_body = ValidateCouponReq,
    responses(
        (status = 200, description = "Coupon accepted", body = StdResponse<ValidatedCoupon, String>),
        (status = 404, description = "Unknown coupon code"),
        (status = 422, description = "Coupon rejected with a reason")
    )
)]
async fn validate_coupon(
    State(state): State<AppState>,
    Json(body): Json<ValidateCouponReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let code = body.code.trim().to_uppercase();
    let entity: QueryResult<CouponEntity> = coupons::table
        .filter(coupons::code.eq(&code))
        .get_result(conn)
        .await;

    let entity = match entity {
        Ok(entity) => entity,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let validated = coupon::validate(&entity.to_domain()?, body.cart_amount, Utc::now())?;

    Ok(StdResponse {
        data: Some(validated),
        message: Some("Coupon applied successfully"),
    })
}
