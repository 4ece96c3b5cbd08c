use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::coupon::{Coupon, DiscountType};
use crate::domain::fulfillment::StageTimestamps;

// Coupons

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponEntity {
    pub id: i32,
    pub code: String,
    pub discount_type: String,
    pub discount_value: f64,
    pub min_purchase_amount: f64,
    pub max_discount_amount: Option<f64>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouponEntity {
    /// Map the stored row onto the engine's coupon type. An unknown
    /// `discount_type` value means a corrupted row, not a user error.
    pub fn to_domain(&self) -> anyhow::Result<Coupon> {
        let discount_type = match self.discount_type.as_str() {
            "percentage" => DiscountType::Percentage,
            "fixed" => DiscountType::Fixed,
            other => anyhow::bail!("Coupon #{} has unknown discount type {:?}", self.id, other),
        };
        Ok(Coupon {
            code: self.code.clone(),
            discount_type,
            discount_value: self.discount_value,
            min_purchase_amount: self.min_purchase_amount,
            max_discount_amount: self.max_discount_amount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
        })
    }
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub subtotal: f64,
    pub discount: f64,
    pub delivery_charges: f64,
    pub total: f64,
    pub coupon_code: Option<String>,
    pub delivery_address: Value,
    pub created_at: DateTime<Utc>,
    pub package_prepared_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl OrderEntity {
    pub fn stage_timestamps(&self) -> StageTimestamps {
        StageTimestamps {
            created_at: Some(self.created_at),
            package_prepared_at: self.package_prepared_at,
            out_for_delivery_at: self.out_for_delivery_at,
            delivered_at: self.delivered_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub order_number: String,
    pub customer_id: i32,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub subtotal: f64,
    pub discount: f64,
    pub delivery_charges: f64,
    pub total: f64,
    pub coupon_code: Option<String>,
    pub delivery_address: Value,
}

// Order items

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub variation_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub variation_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

// Addresses

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddressEntity {
    pub id: i32,
    pub customer_id: i32,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::addresses)]
pub struct CreateAddressEntity {
    pub customer_id: i32,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
}
