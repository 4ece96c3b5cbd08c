pub mod admin;
pub mod coupons;
pub mod customers;
