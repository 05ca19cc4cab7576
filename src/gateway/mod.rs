//! Gateway client for the store's Admin GraphQL API.
//!
//! The [`OrdersGateway`] trait is the seam between the pipeline and the
//! network: production uses [`GatewayClient`], tests substitute an
//! in-memory double.

mod backoff;
mod client;
mod types;

use async_trait::async_trait;

pub use backoff::BackoffPolicy;
pub use client::GatewayClient;
pub use types::{GatewayError, GatewayResult, GraphQlIssue, Order, OrderPage, Transaction};

/// Remote operations the order pipeline depends on.
#[async_trait]
pub trait OrdersGateway: Send + Sync {
    /// Fetch one page of the order enumeration walk.
    ///
    /// `cursor` is `None` for the first page, otherwise the cursor
    /// returned by the previous call.
    async fn fetch_orders_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> GatewayResult<OrderPage>;

    /// Replace an order's tag list with the complete desired set,
    /// returning the server-confirmed tags.
    async fn apply_tags(&self, order_id: &str, tags: &[String]) -> GatewayResult<Vec<String>>;
}
