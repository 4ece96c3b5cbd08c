//! DailyDrop order service: pricing, coupons, order fulfillment state and
//! checkout for the milk-subscription storefront.
//!
//! The rule complexity lives in [`domain`], a synchronous, side-effect-free
//! engine; everything else is the REST plumbing that feeds it.

pub mod api;
pub mod core;
pub mod domain;
pub mod models;
pub mod routes;
pub mod schema;
