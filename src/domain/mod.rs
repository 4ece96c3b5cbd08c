//! The order pricing & fulfillment-state engine.
//!
//! Everything in here is synchronous and side-effect-free (the checkout gate
//! carries two fields of state). Callers fetch whatever the functions need
//! and pass it in, which keeps the whole module testable without a network.

pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod fulfillment;
pub mod pricing;
