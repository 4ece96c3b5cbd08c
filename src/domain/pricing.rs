//! Cart totals: per-variation unit prices, coupon discount, savings.
//!
//! Pure and deterministic; safe to recompute on every cart or coupon change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::catalog::Product;
use crate::domain::coupon::Coupon;

/// Delivery is currently free. Kept as a parameter of [`compute_totals`] so a
/// future non-zero policy does not ripple through callers.
pub const FREE_DELIVERY: f64 = 0.0;

pub const MIN_QUANTITY: i32 = 1;
pub const MAX_QUANTITY: i32 = 99;

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: i32,
    pub variation_id: Option<i32>,
    pub quantity: i32,
}

/// One priced cart line.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: i32,
    pub variation_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
    pub savings: f64,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub delivery_charges: f64,
    pub total: f64,
    /// Cumulative compare-at savings across the cart, independent of the
    /// coupon discount.
    pub savings: f64,
    pub line_items: Vec<PricedLine>,
}

/// Requested quantities outside 1..=99 are clamped, not rejected.
pub fn clamp_quantity(quantity: i32) -> i32 {
    quantity.clamp(MIN_QUANTITY, MAX_QUANTITY)
}

/// Compute cart totals against a resolved catalog.
///
/// Items whose product is missing from `catalog` are skipped silently: a
/// stale cart referencing a deleted product is a data-consistency anomaly,
/// not a user error, and must never be priced as zero-cost.
pub fn compute_totals(
    items: &[CartItem],
    catalog: &HashMap<i32, Product>,
    coupon: Option<&Coupon>,
    delivery_charges: f64,
) -> CartTotals {
    let mut line_items = Vec::with_capacity(items.len());
    let mut subtotal = 0.0;
    let mut savings = 0.0;

    for item in items {
        let Some(product) = catalog.get(&item.product_id) else {
            tracing::warn!(
                "Cart references unknown product #{}; skipping line",
                item.product_id
            );
            continue;
        };

        let variation = product.variation(item.variation_id);
        let quantity = clamp_quantity(item.quantity);

        let unit_price = product.unit_price(variation);
        let line_total = unit_price * quantity as f64;

        let multiplier = variation.map_or(1.0, |v| v.price_multiplier);
        let base_gap = (product.compare_base_price() - product.effective_base_price()).max(0.0);
        let line_savings = base_gap * multiplier * quantity as f64;

        subtotal += line_total;
        savings += line_savings;

        line_items.push(PricedLine {
            product_id: item.product_id,
            variation_id: item.variation_id,
            quantity,
            unit_price,
            line_total,
            savings: line_savings,
        });
    }

    let discount = coupon.map_or(0.0, |c| c.discount_amount(subtotal));
    let total = (subtotal - discount + delivery_charges).max(0.0);

    CartTotals {
        subtotal,
        discount,
        delivery_charges,
        total,
        savings,
        line_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Variation;
    use crate::domain::coupon::DiscountType;
    use chrono::Utc;

    fn make_product(id: i32) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            price_per_litre: 60.0,
            selling_price: Some(54.0),
            compare_at_price: Some(60.0),
            suffix_after_price: "/ litre".into(),
            variations: vec![
                Variation {
                    id: id * 10,
                    size: "500 ml".into(),
                    price_multiplier: 0.5,
                    price: None,
                    is_available: true,
                },
                Variation {
                    id: id * 10 + 1,
                    size: "1 L".into(),
                    price_multiplier: 1.0,
                    price: Some(50.0),
                    is_available: true,
                },
            ],
        }
    }

    fn catalog_of(products: Vec<Product>) -> HashMap<i32, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    fn make_coupon(discount_type: DiscountType, discount_value: f64) -> Coupon {
        Coupon {
            code: "MILK20".into(),
            discount_type,
            discount_value,
            min_purchase_amount: 0.0,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: Utc::now(),
            valid_until: None,
            is_active: true,
        }
    }

    #[test]
    fn variation_price_times_quantity() {
        // Scenario A: unit price 50 via variation override, qty 3, no coupon
        let catalog = catalog_of(vec![make_product(1)]);
        let items = vec![CartItem {
            product_id: 1,
            variation_id: Some(11),
            quantity: 3,
        }];

        let totals = compute_totals(&items, &catalog, None, FREE_DELIVERY);

        assert_eq!(totals.subtotal, 150.0);
        assert_eq!(totals.discount, 0.0);
        assert_eq!(totals.total, 150.0);
        assert_eq!(totals.line_items.len(), 1);
        assert_eq!(totals.line_items[0].unit_price, 50.0);
    }

    #[test]
    fn percentage_coupon_capped_at_max_discount() {
        // Scenario B: subtotal 500, 20% capped at 80 -> total 420
        let catalog = catalog_of(vec![make_product(1)]);
        // 10 litres at the 1 L override price of 50 -> subtotal 500
        let items = vec![CartItem {
            product_id: 1,
            variation_id: Some(11),
            quantity: 10,
        }];
        let mut coupon = make_coupon(DiscountType::Percentage, 20.0);
        coupon.max_discount_amount = Some(80.0);

        let totals = compute_totals(&items, &catalog, Some(&coupon), FREE_DELIVERY);

        assert_eq!(totals.subtotal, 500.0);
        assert_eq!(totals.discount, 80.0);
        assert_eq!(totals.total, 420.0);
    }

    #[test]
    fn fixed_coupon_floors_total_at_delivery_charges() {
        // Scenario C: fixed 1000 against subtotal 300
        let catalog = catalog_of(vec![make_product(1)]);
        let items = vec![CartItem {
            product_id: 1,
            variation_id: Some(11),
            quantity: 6,
        }];
        let coupon = make_coupon(DiscountType::Fixed, 1000.0);

        let totals = compute_totals(&items, &catalog, Some(&coupon), FREE_DELIVERY);

        assert_eq!(totals.subtotal, 300.0);
        assert_eq!(totals.discount, 300.0);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn unknown_product_is_skipped_not_zero_priced() {
        let catalog = catalog_of(vec![make_product(1)]);
        let items = vec![
            CartItem {
                product_id: 1,
                variation_id: Some(11),
                quantity: 2,
            },
            CartItem {
                product_id: 404,
                variation_id: None,
                quantity: 5,
            },
        ];

        let totals = compute_totals(&items, &catalog, None, FREE_DELIVERY);

        assert_eq!(totals.line_items.len(), 1);
        assert_eq!(totals.subtotal, 100.0);
    }

    #[test]
    fn quantity_is_clamped_to_range() {
        let catalog = catalog_of(vec![make_product(1)]);
        let items = vec![
            CartItem {
                product_id: 1,
                variation_id: Some(11),
                quantity: 0,
            },
            CartItem {
                product_id: 1,
                variation_id: Some(11),
                quantity: 500,
            },
        ];

        let totals = compute_totals(&items, &catalog, None, FREE_DELIVERY);

        assert_eq!(totals.line_items[0].quantity, 1);
        assert_eq!(totals.line_items[1].quantity, 99);
        assert_eq!(totals.subtotal, 50.0 + 99.0 * 50.0);
    }

    #[test]
    fn savings_scale_with_multiplier_and_quantity() {
        // base gap = 60 - 54 = 6; 500 ml (x0.5) qty 4 -> savings 12
        let catalog = catalog_of(vec![make_product(1)]);
        let items = vec![CartItem {
            product_id: 1,
            variation_id: Some(10),
            quantity: 4,
        }];

        let totals = compute_totals(&items, &catalog, None, FREE_DELIVERY);

        assert_eq!(totals.savings, 12.0);
        // savings are independent of the coupon discount
        let coupon = make_coupon(DiscountType::Fixed, 20.0);
        let discounted = compute_totals(&items, &catalog, Some(&coupon), FREE_DELIVERY);
        assert_eq!(discounted.savings, 12.0);
    }

    #[test]
    fn savings_never_negative_per_item() {
        let mut product = make_product(1);
        // selling above compare-at: gap clamps to zero rather than negative
        product.selling_price = Some(70.0);
        let catalog = catalog_of(vec![product]);
        let items = vec![CartItem {
            product_id: 1,
            variation_id: None,
            quantity: 3,
        }];

        let totals = compute_totals(&items, &catalog, None, FREE_DELIVERY);
        assert_eq!(totals.savings, 0.0);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let catalog = catalog_of(vec![make_product(1), make_product(2)]);
        let items = vec![
            CartItem {
                product_id: 1,
                variation_id: Some(10),
                quantity: 2,
            },
            CartItem {
                product_id: 2,
                variation_id: None,
                quantity: 7,
            },
        ];
        let coupon = make_coupon(DiscountType::Percentage, 10.0);

        let first = compute_totals(&items, &catalog, Some(&coupon), FREE_DELIVERY);
        let second = compute_totals(&items, &catalog, Some(&coupon), FREE_DELIVERY);

        assert_eq!(first.subtotal, second.subtotal);
        assert_eq!(first.discount, second.discount);
        assert_eq!(first.total, second.total);
        assert_eq!(first.savings, second.savings);
    }

    #[test]
    fn discount_never_exceeds_subtotal_and_total_never_negative() {
        let catalog = catalog_of(vec![make_product(1)]);
        let items = vec![CartItem {
            product_id: 1,
            variation_id: Some(11),
            quantity: 1,
        }];

        for value in [0.0, 25.0, 50.0, 75.0, 100.0, 5000.0] {
            for discount_type in [DiscountType::Percentage, DiscountType::Fixed] {
                let coupon = make_coupon(discount_type, value);
                let totals = compute_totals(&items, &catalog, Some(&coupon), FREE_DELIVERY);
                assert!(totals.discount >= 0.0);
                assert!(totals.discount <= totals.subtotal);
                assert!(totals.total >= 0.0);
            }
        }
    }
}
