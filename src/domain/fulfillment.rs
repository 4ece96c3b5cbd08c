//! Customer-facing rendering of a raw order status: delivery timeline,
//! payment label, delivery display.
//!
//! This module only renders statuses; it never transitions them. Cancellation
//! and refunds are administrative side exits applied elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const DATE_FORMAT: &str = "%d %b %Y";

/// Canonical forward ordering:
/// `placed -> confirmed -> package_prepared -> out_for_delivery -> delivered`.
/// `cancelled` and `refunded` are terminal side exits reachable from any
/// non-delivered state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    PackagePrepared,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Position on the forward path; `None` for the side exits.
    pub fn canonical_index(self) -> Option<usize> {
        match self {
            OrderStatus::Placed => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::PackagePrepared => Some(2),
            OrderStatus::OutForDelivery => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::PackagePrepared => "package_prepared",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "placed" => Some(OrderStatus::Placed),
            "confirmed" => Some(OrderStatus::Confirmed),
            "package_prepared" => Some(OrderStatus::PackagePrepared),
            "out_for_delivery" => Some(OrderStatus::OutForDelivery),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cod" => Some(PaymentMethod::Cod),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// The four customer-visible fulfillment checkpoints.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    OrderConfirmed,
    PackagePrepared,
    OutForDelivery,
    Delivered,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::OrderConfirmed,
        Checkpoint::PackagePrepared,
        Checkpoint::OutForDelivery,
        Checkpoint::Delivered,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Checkpoint::OrderConfirmed => "Order Confirmed",
            Checkpoint::PackagePrepared => "Package Prepared",
            Checkpoint::OutForDelivery => "Out for Delivery",
            Checkpoint::Delivered => "Delivered",
        }
    }

    /// Status at which this checkpoint counts as completed. The first
    /// checkpoint completes as soon as the order is placed.
    fn threshold(self) -> OrderStatus {
        match self {
            Checkpoint::OrderConfirmed => OrderStatus::Placed,
            Checkpoint::PackagePrepared => OrderStatus::PackagePrepared,
            Checkpoint::OutForDelivery => OrderStatus::OutForDelivery,
            Checkpoint::Delivered => OrderStatus::Delivered,
        }
    }
}

/// Per-stage timestamps recorded as the order moved forward.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimestamps {
    pub created_at: Option<DateTime<Utc>>,
    pub package_prepared_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl StageTimestamps {
    fn for_checkpoint(&self, checkpoint: Checkpoint) -> Option<DateTime<Utc>> {
        match checkpoint {
            Checkpoint::OrderConfirmed => self.created_at,
            Checkpoint::PackagePrepared => self.package_prepared_at,
            Checkpoint::OutForDelivery => self.out_for_delivery_at,
            Checkpoint::Delivered => self.delivered_at,
        }
    }

    /// Record `now` for the stage matching `status`, but only the first time
    /// that stage is entered. Re-entering a stage keeps the original stamp;
    /// statuses without a stage column change nothing.
    pub fn stamped(mut self, status: OrderStatus, now: DateTime<Utc>) -> StageTimestamps {
        let slot = match status {
            OrderStatus::PackagePrepared => &mut self.package_prepared_at,
            OrderStatus::OutForDelivery => &mut self.out_for_delivery_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            _ => return self,
        };
        slot.get_or_insert(now);
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    pub checkpoint: Checkpoint,
    pub label: &'static str,
    pub completed: bool,
    /// Formatted stage date, or empty when no timestamp was recorded.
    /// Never synthesized.
    pub date: String,
}

/// Derive the four timeline steps for an order. A checkpoint is completed iff
/// the status has reached its threshold on the canonical path; cancelled and
/// refunded orders complete no step.
pub fn build_timeline(status: OrderStatus, stamps: &StageTimestamps) -> [TimelineStep; 4] {
    Checkpoint::ALL.map(|checkpoint| {
        let completed = match (status.canonical_index(), checkpoint.threshold().canonical_index())
        {
            (Some(reached), Some(threshold)) => reached >= threshold,
            _ => false,
        };
        let date = stamps
            .for_checkpoint(checkpoint)
            .map(|ts| ts.format(DATE_FORMAT).to_string())
            .unwrap_or_default();

        TimelineStep {
            checkpoint,
            label: checkpoint.label(),
            completed,
            date,
        }
    })
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBadgeVariant {
    Paid,
    Pending,
    Cancelled,
    Refunded,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBadge {
    pub label: &'static str,
    pub variant: PaymentBadgeVariant,
}

/// Order status takes precedence over payment state: a cancelled order shows
/// "Cancelled" even when it was paid.
pub fn resolve_payment_label(status: OrderStatus, payment_status: PaymentStatus) -> PaymentBadge {
    match status {
        OrderStatus::Cancelled => PaymentBadge {
            label: "Cancelled",
            variant: PaymentBadgeVariant::Cancelled,
        },
        OrderStatus::Refunded => PaymentBadge {
            label: "Refunded",
            variant: PaymentBadgeVariant::Refunded,
        },
        _ => match payment_status {
            PaymentStatus::Paid => PaymentBadge {
                label: "Paid",
                variant: PaymentBadgeVariant::Paid,
            },
            PaymentStatus::Pending => PaymentBadge {
                label: "Pending",
                variant: PaymentBadgeVariant::Pending,
            },
        },
    }
}

/// Secondary badge shown for cash-on-delivery orders, independent of
/// delivery progress.
pub fn cod_badge(method: PaymentMethod, payment_status: PaymentStatus) -> Option<String> {
    match method {
        PaymentMethod::Cod => Some(match payment_status {
            PaymentStatus::Paid => "COD / Paid".to_string(),
            PaymentStatus::Pending => "COD / Pending".to_string(),
        }),
        PaymentMethod::Online => None,
    }
}

/// Customer-facing delivery column: em dash for cancelled/refunded, "On its
/// way" while active, the delivery date (or a plain "Delivered") afterwards.
pub fn resolve_delivery_display(
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
) -> String {
    match status {
        OrderStatus::Cancelled | OrderStatus::Refunded => "—".to_string(),
        OrderStatus::Delivered => delivered_at
            .map(|ts| ts.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "Delivered".to_string()),
        _ => "On its way".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn completed_count(steps: &[TimelineStep; 4]) -> usize {
        steps.iter().filter(|s| s.completed).count()
    }

    #[test]
    fn placed_completes_exactly_one_step() {
        let steps = build_timeline(OrderStatus::Placed, &StageTimestamps::default());
        assert_eq!(completed_count(&steps), 1);
        assert!(steps[0].completed);
    }

    #[test]
    fn out_for_delivery_completes_first_three_steps() {
        let steps = build_timeline(OrderStatus::OutForDelivery, &StageTimestamps::default());
        assert_eq!(completed_count(&steps), 3);
        assert!(!steps[3].completed);
    }

    #[test]
    fn delivered_completes_all_steps() {
        let steps = build_timeline(OrderStatus::Delivered, &StageTimestamps::default());
        assert_eq!(completed_count(&steps), 4);
    }

    #[test]
    fn cancelled_completes_no_step() {
        let steps = build_timeline(OrderStatus::Cancelled, &StageTimestamps::default());
        assert_eq!(completed_count(&steps), 0);
    }

    #[test]
    fn step_dates_come_only_from_recorded_timestamps() {
        let stamps = StageTimestamps {
            created_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()),
            package_prepared_at: Some(Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()),
            out_for_delivery_at: None,
            delivered_at: None,
        };
        let steps = build_timeline(OrderStatus::OutForDelivery, &stamps);

        assert_eq!(steps[0].date, "01 Mar 2026");
        assert_eq!(steps[1].date, "02 Mar 2026");
        // completed but never stamped: the date stays empty
        assert!(steps[2].completed);
        assert_eq!(steps[2].date, "");
    }

    #[test]
    fn stamping_records_only_the_first_entry() {
        let first = Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();

        let stamps = StageTimestamps::default().stamped(OrderStatus::PackagePrepared, first);
        assert_eq!(stamps.package_prepared_at, Some(first));

        // toggling away and back must not rewrite the original stamp
        let stamps = stamps.stamped(OrderStatus::PackagePrepared, later);
        assert_eq!(stamps.package_prepared_at, Some(first));
    }

    #[test]
    fn stamping_ignores_statuses_without_a_stage() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap();
        for status in [
            OrderStatus::Placed,
            OrderStatus::Confirmed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            let stamps = StageTimestamps::default().stamped(status, now);
            assert_eq!(stamps.package_prepared_at, None);
            assert_eq!(stamps.out_for_delivery_at, None);
            assert_eq!(stamps.delivered_at, None);
        }
    }

    #[test]
    fn cancelled_label_wins_even_when_paid() {
        // Scenario E
        let badge = resolve_payment_label(OrderStatus::Cancelled, PaymentStatus::Paid);
        assert_eq!(badge.label, "Cancelled");
        assert_eq!(badge.variant, PaymentBadgeVariant::Cancelled);
    }

    #[test]
    fn refunded_label_wins_over_payment_status() {
        let badge = resolve_payment_label(OrderStatus::Refunded, PaymentStatus::Pending);
        assert_eq!(badge.label, "Refunded");
    }

    #[test]
    fn active_order_reflects_payment_status() {
        let paid = resolve_payment_label(OrderStatus::Confirmed, PaymentStatus::Paid);
        assert_eq!(paid.label, "Paid");
        let pending = resolve_payment_label(OrderStatus::Placed, PaymentStatus::Pending);
        assert_eq!(pending.label, "Pending");
    }

    #[test]
    fn cod_badge_ignores_delivery_progress() {
        assert_eq!(
            cod_badge(PaymentMethod::Cod, PaymentStatus::Pending),
            Some("COD / Pending".to_string())
        );
        assert_eq!(
            cod_badge(PaymentMethod::Cod, PaymentStatus::Paid),
            Some("COD / Paid".to_string())
        );
        assert_eq!(cod_badge(PaymentMethod::Online, PaymentStatus::Paid), None);
    }

    #[test]
    fn delivery_display_variants() {
        assert_eq!(
            resolve_delivery_display(OrderStatus::Cancelled, None),
            "—"
        );
        assert_eq!(
            resolve_delivery_display(OrderStatus::OutForDelivery, None),
            "On its way"
        );
        assert_eq!(
            resolve_delivery_display(OrderStatus::Delivered, None),
            "Delivered"
        );
        let delivered_at = Utc.with_ymd_and_hms(2026, 3, 4, 7, 15, 0).unwrap();
        assert_eq!(
            resolve_delivery_display(OrderStatus::Delivered, Some(delivered_at)),
            "04 Mar 2026"
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Placed,
            OrderStatus::Confirmed,
            OrderStatus::PackagePrepared,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}
