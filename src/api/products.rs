use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};

use crate::api::ApiUrls;
use crate::core::app_error::AppError;
use crate::domain::catalog::Product;

/// Fetch price-bearing product records (with variations) for the given ids.
///
/// Products the catalog no longer knows are left out of the returned map so
/// the pricing engine can apply its skip-unknown-product rule; only an
/// unreachable catalog service is an error.
pub async fn get_catalog_products(
    client: Client,
    ids: Vec<i32>,
) -> Result<HashMap<i32, Product>> {
    let url = ApiUrls::get_catalog_service_url();
    let mut products = HashMap::with_capacity(ids.len());

    for id in ids {
        let res = client
            .get(format!("{}/products/{}", url, id))
            .query(&[("details", "true")])
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable("CatalogService".into()))?;

        if res.status() == StatusCode::NOT_FOUND {
            tracing::warn!("Product #{} not found in catalog", id);
            continue;
        }

        let product: Product = res
            .error_for_status()
            .map_err(|_| AppError::ServiceUnreachable("CatalogService".into()))?
            .json()
            .await
            .context("Failed to parse JSON")?;

        products.insert(product.id, product);
    }

    Ok(products)
}
