use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
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
    domain::checkout::AddressForm,
    models::{AddressEntity, CreateAddressEntity},
    schema::addresses,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/addresses",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_addresses))
            .routes(utoipa_axum::routes!(create_address))
            .routes(utoipa_axum::routes!(update_address))
            .routes(utoipa_axum::routes!(delete_address))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::customers_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct AddressReq {
    #[serde(flatten)]
    form: AddressForm,
    #[serde(default)]
    is_default: bool,
}

impl AddressReq {
    fn validated_form(&self) -> Result<&AddressForm, AppError> {
        let missing = self.form.missing_fields();
        if missing.is_empty() {
            Ok(&self.form)
        } else {
            Err(AppError::Validation(format!(
                "Address is incomplete: missing {}",
                missing.join(", ")
            )))
        }
    }
}

/// Fetch all addresses of the authenticated customer, default first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my addresses", body = StdResponse<Vec<AddressEntity>, String>)
    )
)]
async fn get_my_addresses(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_addresses: Vec<AddressEntity> = addresses::table
        .filter(addresses::customer_id.eq(customer_id))
        .order_by((addresses::is_default.desc(), addresses::created_at.desc()))
        .get_results(conn)
        .await
        .context("Failed to get addresses")?;

    Ok(StdResponse {
        data: Some(my_addresses),
        message: Some("Get addresses successfully"),
    })
}

/// Save a new address. The first address a customer ever saves becomes the
/// default automatically; explicitly setting the default clears the flag on
/// every other address.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    request_body = AddressReq,
    responses(
        (status = 200, description = "Created address successfully", body = StdResponse<AddressEntity, String>),
        (status = 422, description = "Required address fields are missing")
    )
)]
async fn create_address(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<AddressReq>,
) -> Result<impl IntoResponse, AppError> {
    let form = body.validated_form()?.clone();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let existing: i64 = addresses::table
                    .filter(addresses::customer_id.eq(customer_id))
                    .count()
                    .get_result(conn)
                    .await
                    .context("Failed to count addresses")?;

                let is_default = body.is_default || existing == 0;

                if is_default && existing > 0 {
                    diesel::update(addresses::table)
                        .filter(addresses::customer_id.eq(customer_id))
                        .set(addresses::is_default.eq(false))
                        .execute(conn)
                        .await
                        .context("Failed to clear previous default")?;
                }

                let address: AddressEntity = diesel::insert_into(addresses::table)
                    .values(CreateAddressEntity {
                        customer_id,
                        name: form.name,
                        street: form.street,
                        city: form.city,
                        state: form.state,
                        postal_code: form.postal_code,
                        country: form.country,
                        phone: form.phone,
                        is_default,
                    })
                    .returning(AddressEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create address")?;

                Ok::<AddressEntity, anyhow::Error>(address)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Created address successfully"),
    })
}

/// Update an existing address of the authenticated customer.
#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Address ID to update")
    ),
    request_body = AddressReq,
    responses(
        (status = 200, description = "Updated address successfully", body = StdResponse<AddressEntity, String>),
        (status = 422, description = "Required address fields are missing")
    )
)]
async fn update_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<AddressReq>,
) -> Result<impl IntoResponse, AppError> {
    let form = body.validated_form()?.clone();

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address = conn
        .transaction(move |conn| {
            Box::pin(async move {
                if body.is_default {
                    diesel::update(addresses::table)
                        .filter(addresses::customer_id.eq(customer_id))
                        .filter(addresses::id.ne(id))
                        .set(addresses::is_default.eq(false))
                        .execute(conn)
                        .await
                        .context("Failed to clear previous default")?;
                }

                let address: QueryResult<AddressEntity> = diesel::update(
                    addresses::table
                        .find(id)
                        .filter(addresses::customer_id.eq(customer_id)),
                )
                .set((
                    addresses::name.eq(form.name),
                    addresses::street.eq(form.street),
                    addresses::city.eq(form.city),
                    addresses::state.eq(form.state),
                    addresses::postal_code.eq(form.postal_code),
                    addresses::country.eq(form.country),
                    addresses::phone.eq(form.phone),
                    addresses::is_default.eq(body.is_default),
                    addresses::updated_at.eq(diesel::dsl::now),
                ))
                .returning(AddressEntity::as_returning())
                .get_result(conn)
                .await;

                match address {
                    Ok(address) => Ok(address),
                    Err(DieselError::NotFound) => Err(AppError::NotFound),
                    Err(err) => Err(AppError::Other(err.into())),
                }
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Updated address successfully"),
    })
}

/// Delete an address. When the default address is removed, the most recently
/// saved remaining address is promoted so the customer always keeps exactly
/// one default.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Addresses"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Address ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn delete_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let deleted: QueryResult<AddressEntity> = diesel::delete(
                    addresses::table
                        .find(id)
                        .filter(addresses::customer_id.eq(customer_id)),
                )
                .returning(AddressEntity::as_returning())
                .get_result(conn)
                .await;

                let deleted = match deleted {
                    Ok(deleted) => deleted,
                    Err(DieselError::NotFound) => return Err(AppError::NotFound),
                    Err(err) => return Err(AppError::Other(err.into())),
                };

                if deleted.is_default {
                    let successor: Option<i32> = addresses::table
                        .filter(addresses::customer_id.eq(customer_id))
                        .order_by(addresses::created_at.desc())
                        .select(addresses::id)
                        .first(conn)
                        .await
                        .optional()
                        .context("Failed to look up successor address")?;

                    if let Some(successor_id) = successor {
                        diesel::update(addresses::table.find(successor_id))
                            .set(addresses::is_default.eq(true))
                            .execute(conn)
                            .await
                            .context("Failed to promote successor default")?;
                    }
                }

                Ok(deleted)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(deleted),
        message: Some("Deleted address successfully"),
    })
}
