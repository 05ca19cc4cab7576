//! Per-order tagging: derive the payment gateway tag and apply it.
//!
//! This is the body each worker runs. Gateway errors are caught here and
//! recorded in the order's result; nothing propagates past this boundary.

use thiserror::Error;
use tracing::{error, info};

use crate::gateway::{Order, OrdersGateway};

use super::summary::TagUpdateResult;

/// An order whose payment gateway cannot be determined.
///
/// Raised when an order has no transactions, or the first transaction's
/// gateway field is empty or absent. Never retried; always recorded as a
/// per-order failure.
#[derive(Debug, Error)]
#[error("order {order_id} has no identifiable payment gateway")]
pub struct UnidentifiableGatewayError {
    /// The order that could not be classified.
    pub order_id: String,
}

/// Derive the payment gateway tag for an order.
///
/// The first transaction in the order's sequence wins; later transactions
/// (refunds, retries) are not consulted.
pub fn derive_gateway_tag(order: &Order) -> Result<String, UnidentifiableGatewayError> {
    order
        .transactions
        .first()
        .and_then(|tx| tx.gateway.as_deref())
        .filter(|gateway| !gateway.is_empty())
        .map(str::to_string)
        .ok_or_else(|| UnidentifiableGatewayError {
            order_id: order.id.clone(),
        })
}

/// Process a single order: derive its tag, skip if already present,
/// otherwise apply the full desired tag set via the gateway.
pub async fn process_order(gateway: &dyn OrdersGateway, order: &Order) -> TagUpdateResult {
    let tag = match derive_gateway_tag(order) {
        Ok(tag) => tag,
        Err(err) => {
            error!(
                order_id = %order.id,
                order_name = %order.name,
                error = %err,
                "Order failed: no identifiable gateway"
            );
            return TagUpdateResult::failed(order, None, err.to_string());
        }
    };

    if order.has_tag(&tag) {
        info!(
            order_id = %order.id,
            order_name = %order.name,
            tag = %tag,
            tags = ?order.tags,
            "Tag already present, skipping"
        );
        return TagUpdateResult::skipped(order, tag);
    }

    // The remote replaces the tag list wholesale, so send existing + new.
    let mut desired = order.tags.clone();
    desired.push(tag.clone());

    match gateway.apply_tags(&order.id, &desired).await {
        Ok(final_tags) => {
            info!(
                order_id = %order.id,
                order_name = %order.name,
                tag = %tag,
                final_tags = ?final_tags,
                "Order tagged"
            );
            TagUpdateResult::tagged(order, tag, final_tags)
        }
        Err(err) => {
            error!(
                order_id = %order.id,
                order_name = %order.name,
                tag = %tag,
                error = %err,
                "Order failed: tag mutation rejected"
            );
            TagUpdateResult::failed(order, Some(tag), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Transaction;

    fn order_with_transactions(transactions: Vec<Transaction>) -> Order {
        Order {
            id: "gid://shopify/Order/1".to_string(),
            name: "#1001".to_string(),
            tags: vec![],
            transactions,
        }
    }

    #[test]
    fn test_first_transaction_wins() {
        let order = order_with_transactions(vec![
            Transaction::new("manual"),
            Transaction::new("shopify_payments"),
        ]);

        let tag = derive_gateway_tag(&order).expect("should derive");
        assert_eq!(tag, "manual");
    }

    #[test]
    fn test_no_transactions_is_unidentifiable() {
        let order = order_with_transactions(vec![]);

        let err = derive_gateway_tag(&order).unwrap_err();
        assert_eq!(err.order_id, "gid://shopify/Order/1");
    }

    #[test]
    fn test_empty_gateway_is_unidentifiable() {
        let order = order_with_transactions(vec![Transaction::new("")]);
        assert!(derive_gateway_tag(&order).is_err());
    }

    #[test]
    fn test_absent_gateway_is_unidentifiable() {
        let order = order_with_transactions(vec![Transaction { gateway: None }]);
        assert!(derive_gateway_tag(&order).is_err());
    }

    #[test]
    fn test_empty_first_gateway_does_not_fall_through() {
        // Observed behavior: only the first transaction is consulted, even
        // when a later one carries a usable gateway.
        let order = order_with_transactions(vec![
            Transaction::new(""),
            Transaction::new("shopify_payments"),
        ]);
        assert!(derive_gateway_tag(&order).is_err());
    }
}
