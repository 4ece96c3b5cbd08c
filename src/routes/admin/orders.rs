use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    domain::fulfillment::{OrderStatus, PaymentStatus},
    models::OrderEntity,
    schema::orders,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(update_order_status))
            .routes(utoipa_axum::routes!(update_payment_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

/// Fetch all orders in the system, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let all_orders: Vec<OrderEntity> = orders::table
        .order_by(orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    Ok(StdResponse {
        data: Some(all_orders),
        message: Some("Get orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    status: String,
}

/// Administrative status change. The engine only renders statuses; this is
/// the one place they move. Stage timestamps are stamped the first time the
/// matching status is entered. Orders already cancelled or refunded are
/// frozen, and the side exits are unreachable once an order is delivered.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Unknown or unreachable status")
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let target = OrderStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("{} is not a valid status", body.status)))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing: OrderEntity = match orders::table.find(id).first(conn).await {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    // First entry into a stage wins; repeating a PATCH keeps the original
    // stamp shown in the customer timeline.
    let stamps = existing.stage_timestamps().stamped(target, Utc::now());
    let stamp_columns = (
        orders::package_prepared_at.eq(stamps.package_prepared_at),
        orders::out_for_delivery_at.eq(stamps.out_for_delivery_at),
        orders::delivered_at.eq(stamps.delivered_at),
    );

    let frozen = [
        OrderStatus::Cancelled.as_str(),
        OrderStatus::Refunded.as_str(),
    ];
    let base = orders::table
        .find(id)
        .filter(orders::status.ne_all(frozen.to_vec()));

    let updated: QueryResult<OrderEntity> = match target {
        OrderStatus::Cancelled | OrderStatus::Refunded => {
            diesel::update(base.filter(orders::status.ne(OrderStatus::Delivered.as_str())))
                .set((
                    orders::status.eq(target.as_str()),
                    stamp_columns,
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
        }
        _ => {
            diesel::update(base)
                .set((
                    orders::status.eq(target.as_str()),
                    stamp_columns,
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
        }
    };

    match updated {
        Ok(order) => Ok(StdResponse {
            data: Some(order),
            message: Some("Updated order status successfully"),
        }),
        // the row exists, so an empty update means the transition was blocked
        Err(DieselError::NotFound) => Err(AppError::BadRequest(
            "Order can no longer change status".to_string(),
        )),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct UpdatePaymentStatusReq {
    payment_status: String,
}

/// Mark an order paid (or back to pending). Kept separate from the delivery
/// status because COD orders get paid independently of delivery progress.
#[utoipa::path(
    patch,
    path = "/{id}/payment-status",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdatePaymentStatusReq,
    responses(
        (status = 200, description = "Updated payment status", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Unknown payment status")
    )
)]
async fn update_payment_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdatePaymentStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let target = PaymentStatus::parse(&body.payment_status).ok_or_else(|| {
        AppError::BadRequest(format!(
            "{} is not a valid payment status",
            body.payment_status
        ))
    })?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated: QueryResult<OrderEntity> = diesel::update(orders::table.find(id))
        .set((
            orders::payment_status.eq(target.as_str()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await;

    match updated {
        Ok(order) => Ok(StdResponse {
            data: Some(order),
            message: Some("Updated payment status successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
