use anyhow::{Context, anyhow};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    api::products::get_catalog_products,
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    domain::{
        checkout::{AddressForm, AddressSelection, CheckoutGate},
        coupon::{self, Coupon},
        fulfillment::{
            self, OrderStatus, PaymentBadge, PaymentMethod, PaymentStatus, TimelineStep,
        },
        pricing::{self, CartItem, FREE_DELIVERY},
    },
    models::{
        AddressEntity, CouponEntity, CreateAddressEntity, CreateOrderEntity,
        CreateOrderItemEntity, OrderEntity, OrderItemEntity,
    },
    schema::{addresses, coupons, order_items, orders},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(place_order))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::customers_authorization,
            )),
    )
}

/// Customer-facing rendering of one order: raw record plus the derived
/// timeline and labels.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetOrderRes {
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
    pub timeline: Vec<TimelineStep>,
    pub payment_badge: PaymentBadge,
    pub cod_badge: Option<String>,
    pub delivery_display: String,
}

fn resolve_order_view(
    order: OrderEntity,
    items: Vec<OrderItemEntity>,
) -> Result<GetOrderRes, AppError> {
    let status = OrderStatus::parse(&order.status)
        .ok_or_else(|| anyhow!("Order #{} has unknown status {:?}", order.id, order.status))?;
    let payment_status = PaymentStatus::parse(&order.payment_status).ok_or_else(|| {
        anyhow!(
            "Order #{} has unknown payment status {:?}",
            order.id,
            order.payment_status
        )
    })?;
    let payment_method = PaymentMethod::parse(&order.payment_method).ok_or_else(|| {
        anyhow!(
            "Order #{} has unknown payment method {:?}",
            order.id,
            order.payment_method
        )
    })?;

    let timeline = fulfillment::build_timeline(status, &order.stage_timestamps());

    Ok(GetOrderRes {
        timeline: timeline.to_vec(),
        payment_badge: fulfillment::resolve_payment_label(status, payment_status),
        cod_badge: fulfillment::cod_badge(payment_method, payment_status),
        delivery_display: fulfillment::resolve_delivery_display(status, order.delivered_at),
        order,
        order_items: items,
    })
}

/// Fetch all orders belonging to the authenticated customer, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<GetOrderRes>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_orders: Vec<OrderEntity> = orders::table
        .filter(orders::customer_id.eq(customer_id))
        .order_by(orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    let order_ids: Vec<i32> = my_orders.iter().map(|order| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_with_items: Vec<GetOrderRes> = my_orders
        .into_iter()
        .map(|order| {
            let items = group.remove(&order.id).unwrap_or_default();
            resolve_order_view(order, items)
        })
        .collect::<Result<_, _>>()?;

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch a specific order belonging to the authenticated customer.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: QueryResult<OrderEntity> = orders::table
        .find(id)
        .filter(orders::customer_id.eq(customer_id))
        .get_result(conn)
        .await;

    let order = match order {
        Ok(order) => order,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    Ok(StdResponse {
        data: Some(resolve_order_view(order, items)?),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderReq {
    items: Vec<CartItem>,
    coupon_code: Option<String>,
    /// "cod" or "online".
    payment_method: String,
    /// A previously saved address to deliver to...
    address_id: Option<i32>,
    /// ...or a freshly entered one.
    address: Option<AddressForm>,
    /// Persist the new address to the account before placing the order.
    #[serde(default)]
    save_address: bool,
}

fn address_snapshot(form: &AddressForm) -> Result<Value, AppError> {
    serde_json::to_value(form)
        .context("Failed to serialize delivery address")
        .map_err(AppError::Other)
}

/// Place an order: price the cart against the live catalog, validate any
/// coupon, re-validate the delivery address, then write everything in one
/// transaction (including the coupon usage increment).
///
/// The payment gateway is stubbed, so online orders start out `pending`
/// exactly like COD ones.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = PlaceOrderReq,
    responses(
        (status = 200, description = "Placed order successfully", body = StdResponse<GetOrderRes, String>),
        (status = 422, description = "Address incomplete, cart empty or coupon rejected")
    )
)]
async fn place_order(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<PlaceOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let payment_method = PaymentMethod::parse(&body.payment_method).ok_or_else(|| {
        AppError::BadRequest(format!(
            "{} is not a valid payment method",
            body.payment_method
        ))
    })?;

    if body.items.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }

    let selection = match (body.address_id, body.address.clone()) {
        (Some(address_id), _) => AddressSelection::Saved { address_id },
        (None, Some(form)) => AddressSelection::New {
            form,
            save_to_account: body.save_address,
        },
        (None, None) => {
            return Err(AppError::Validation("A delivery address is required".into()));
        }
    };

    // The same gate the checkout UI runs, re-run server-side: the address is
    // never trusted from an earlier check.
    let mut gate = CheckoutGate::new(true);
    gate.confirm_address(&selection)
        .map_err(|err| AppError::Validation(err.to_string()))?;
    gate.authorize_place_order(&selection)
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    // Resolve the delivery address snapshot before pricing; a saved address
    // must belong to the caller.
    let snapshot: Value = match &selection {
        AddressSelection::Saved { address_id } => {
            let saved: QueryResult<AddressEntity> = addresses::table
                .find(*address_id)
                .filter(addresses::customer_id.eq(customer_id))
                .get_result(conn)
                .await;
            match saved {
                Ok(saved) => address_snapshot(&AddressForm {
                    name: saved.name,
                    street: saved.street,
                    city: saved.city,
                    state: saved.state,
                    postal_code: saved.postal_code,
                    country: saved.country,
                    phone: saved.phone,
                })?,
                Err(DieselError::NotFound) => {
                    return Err(AppError::ForbiddenResource(
                        "Customer does not own this address".into(),
                    ));
                }
                Err(err) => return Err(AppError::Other(err.into())),
            }
        }
        AddressSelection::New { form, .. } => address_snapshot(form)?,
    };

    // Price the cart against the live catalog.
    let product_ids: Vec<i32> = body.items.iter().map(|item| item.product_id).collect();
    let catalog = get_catalog_products(state.http_client.clone(), product_ids).await?;

    let raw_totals = pricing::compute_totals(&body.items, &catalog, None, FREE_DELIVERY);
    if raw_totals.line_items.is_empty() {
        return Err(AppError::Validation(
            "None of the cart items are available any more".into(),
        ));
    }

    // Validate the coupon against the freshly computed subtotal.
    let validated_coupon: Option<Coupon> = match &body.coupon_code {
        Some(code) => {
            let code = code.trim().to_uppercase();
            let entity: QueryResult<CouponEntity> = coupons::table
                .filter(coupons::code.eq(&code))
                .get_result(conn)
                .await;
            let entity = match entity {
                Ok(entity) => entity,
                Err(DieselError::NotFound) => return Err(AppError::NotFound),
                Err(err) => return Err(AppError::Other(err.into())),
            };
            let validated = coupon::validate(&entity.to_domain()?, raw_totals.subtotal, Utc::now())?;
            Some(validated.coupon)
        }
        None => None,
    };

    let totals = pricing::compute_totals(
        &body.items,
        &catalog,
        validated_coupon.as_ref(),
        FREE_DELIVERY,
    );

    let order_number = format!("ORD-{}", &Uuid::new_v4().simple().to_string()[..10].to_uppercase());
    let coupon_code = validated_coupon.as_ref().map(|c| c.code.clone());
    let save_address = selection.save_requested();
    let new_address_form = match &selection {
        AddressSelection::New { form, .. } => Some(form.clone()),
        AddressSelection::Saved { .. } => None,
    };

    let (order, items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                if save_address
                    && let Some(form) = new_address_form
                {
                    let existing: i64 = addresses::table
                        .filter(addresses::customer_id.eq(customer_id))
                        .count()
                        .get_result(conn)
                        .await
                        .context("Failed to count addresses")?;

                    diesel::insert_into(addresses::table)
                        .values(CreateAddressEntity {
                            customer_id,
                            name: form.name,
                            street: form.street,
                            city: form.city,
                            state: form.state,
                            postal_code: form.postal_code,
                            country: form.country,
                            phone: form.phone,
                            is_default: existing == 0,
                        })
                        .execute(conn)
                        .await
                        .context("Failed to save address")?;
                }

                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        order_number,
                        customer_id,
                        status: OrderStatus::Placed.as_str().into(),
                        payment_method: payment_method.as_str().into(),
                        payment_status: PaymentStatus::Pending.as_str().into(),
                        subtotal: totals.subtotal,
                        discount: totals.discount,
                        delivery_charges: totals.delivery_charges,
                        total: totals.total,
                        coupon_code: coupon_code.clone(),
                        delivery_address: snapshot,
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create order")?;

                let new_items: Vec<CreateOrderItemEntity> = totals
                    .line_items
                    .iter()
                    .map(|line| CreateOrderItemEntity {
                        order_id: order.id,
                        product_id: line.product_id,
                        variation_id: line.variation_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        line_total: line.line_total,
                    })
                    .collect();

                let items: Vec<OrderItemEntity> = diesel::insert_into(order_items::table)
                    .values(new_items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create order items")?;

                if let Some(code) = coupon_code {
                    diesel::update(coupons::table)
                        .filter(coupons::code.eq(code))
                        .set(coupons::used_count.eq(coupons::used_count + 1))
                        .execute(conn)
                        .await
                        .context("Failed to record coupon usage")?;
                }

                Ok::<(OrderEntity, Vec<OrderItemEntity>), anyhow::Error>((order, items))
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(resolve_order_view(order, items)?),
        message: Some("Placed order successfully"),
    })
}
