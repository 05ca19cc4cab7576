//! Per-order outcomes and the aggregate run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::gateway::Order;

/// Action taken for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagAction {
    /// A mutation was issued and succeeded.
    Tagged,
    /// The derived tag was already present; no mutation issued.
    Skipped,
    /// The order could not be tagged; detail in the result's error field.
    Failed,
}

impl fmt::Display for TagAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagAction::Tagged => write!(f, "tagged"),
            TagAction::Skipped => write!(f, "skipped"),
            TagAction::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of processing one order. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagUpdateResult {
    /// Opaque order identifier.
    pub order_id: String,
    /// Human-facing order name.
    pub order_name: String,
    /// Tag derived from the order's transactions, when one could be.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_tag: Option<String>,
    /// Action taken for this order.
    pub action: TagAction,
    /// The order's final tag list (server-confirmed when tagged).
    pub tags: Vec<String>,
    /// Error detail when the action is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TagUpdateResult {
    /// A successfully applied tag, with the server-confirmed tag list.
    pub fn tagged(order: &Order, tag: String, final_tags: Vec<String>) -> Self {
        Self {
            order_id: order.id.clone(),
            order_name: order.name.clone(),
            gateway_tag: Some(tag),
            action: TagAction::Tagged,
            tags: final_tags,
            error: None,
        }
    }

    /// The derived tag was already present; the order is unchanged.
    pub fn skipped(order: &Order, tag: String) -> Self {
        Self {
            order_id: order.id.clone(),
            order_name: order.name.clone(),
            gateway_tag: Some(tag),
            action: TagAction::Skipped,
            tags: order.tags.clone(),
            error: None,
        }
    }

    /// A recorded per-order failure; the order keeps its existing tags.
    pub fn failed(order: &Order, tag: Option<String>, error: impl Into<String>) -> Self {
        Self {
            order_id: order.id.clone(),
            order_name: order.name.clone(),
            gateway_tag: tag,
            action: TagAction::Failed,
            tags: order.tags.clone(),
            error: Some(error.into()),
        }
    }

    /// Whether a mutation call was made for this order.
    pub fn mutation_issued(&self) -> bool {
        self.action == TagAction::Tagged
    }
}

/// Aggregate outcome of a full run.
///
/// `results` preserves the original fetch order regardless of worker
/// completion order; every enumerated order appears exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier for this run.
    pub run_id: Uuid,
    /// When enumeration began.
    pub started_at: DateTime<Utc>,
    /// When the last worker finished.
    pub finished_at: DateTime<Utc>,
    /// Orders enumerated (equals `results.len()`).
    pub orders_seen: usize,
    /// Orders that received a new tag.
    pub tagged: usize,
    /// Orders whose tag was already present.
    pub skipped: usize,
    /// Orders with a recorded failure.
    pub failed: usize,
    /// Per-order outcomes in fetch order.
    pub results: Vec<TagUpdateResult>,
}

impl RunSummary {
    /// Assemble the summary from per-order results in fetch order.
    pub fn from_results(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        results: Vec<TagUpdateResult>,
    ) -> Self {
        let tagged = results
            .iter()
            .filter(|r| r.action == TagAction::Tagged)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.action == TagAction::Skipped)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.action == TagAction::Failed)
            .count();

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            orders_seen: results.len(),
            tagged,
            skipped,
            failed,
            results,
        }
    }

    /// Whether any per-order failures were recorded.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, tags: &[&str]) -> Order {
        Order {
            id: id.to_string(),
            name: format!("#{}", id),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            transactions: vec![],
        }
    }

    #[test]
    fn test_tag_action_display() {
        assert_eq!(TagAction::Tagged.to_string(), "tagged");
        assert_eq!(TagAction::Skipped.to_string(), "skipped");
        assert_eq!(TagAction::Failed.to_string(), "failed");
    }

    #[test]
    fn test_tag_action_serialization() {
        let json = serde_json::to_string(&TagAction::Skipped).expect("serialization");
        assert_eq!(json, "\"skipped\"");
    }

    #[test]
    fn test_tagged_result_carries_confirmed_tags() {
        let o = order("1", &["vip"]);
        let result = TagUpdateResult::tagged(
            &o,
            "manual".to_string(),
            vec!["vip".to_string(), "manual".to_string()],
        );

        assert!(result.mutation_issued());
        assert_eq!(result.tags, vec!["vip", "manual"]);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_skipped_result_keeps_existing_tags() {
        let o = order("2", &["shopify_payments"]);
        let result = TagUpdateResult::skipped(&o, "shopify_payments".to_string());

        assert!(!result.mutation_issued());
        assert_eq!(result.tags, vec!["shopify_payments"]);
    }

    #[test]
    fn test_failed_result_records_detail() {
        let o = order("3", &["vip"]);
        let result = TagUpdateResult::failed(&o, None, "no identifiable gateway");

        assert!(!result.mutation_issued());
        assert_eq!(result.tags, vec!["vip"]);
        assert_eq!(result.error.as_deref(), Some("no identifiable gateway"));
    }

    #[test]
    fn test_summary_counts() {
        let a = order("1", &[]);
        let b = order("2", &["manual"]);
        let c = order("3", &[]);

        let results = vec![
            TagUpdateResult::tagged(&a, "manual".to_string(), vec!["manual".to_string()]),
            TagUpdateResult::skipped(&b, "manual".to_string()),
            TagUpdateResult::failed(&c, None, "boom"),
        ];

        let summary = RunSummary::from_results(Uuid::new_v4(), Utc::now(), results);

        assert_eq!(summary.orders_seen, 3);
        assert_eq!(summary.tagged, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.has_failures());
        assert_eq!(summary.results.len(), summary.orders_seen);
    }

    #[test]
    fn test_summary_round_trips_through_json() {
        let a = order("1", &[]);
        let summary = RunSummary::from_results(
            Uuid::new_v4(),
            Utc::now(),
            vec![TagUpdateResult::tagged(
                &a,
                "manual".to_string(),
                vec!["manual".to_string()],
            )],
        );

        let json = serde_json::to_string(&summary).expect("serialization");
        let back: RunSummary = serde_json::from_str(&json).expect("deserialization");
        assert_eq!(back.orders_seen, 1);
        assert_eq!(back.results[0].order_id, "1");
    }
}
