//! Admin GraphQL API client.
//!
//! Single point of contact with the remote store. Owns the transport, the
//! auth header, and recovery from transient failures: rate limits (HTTP 429
//! and cost-throttled GraphQL errors) and connection-level errors are
//! retried with exponential backoff; everything else surfaces immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::RunConfig;

use super::backoff::BackoffPolicy;
use super::types::{GatewayError, GatewayResult, GraphQlIssue, Order, OrderPage};
use super::OrdersGateway;

/// Auth header the Admin API expects.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Paginated order enumeration query. The transaction window of 5 per
/// order is ample for gateway identification, which reads only the first.
const ORDERS_QUERY: &str = r#"
query getOrders($first: Int!, $after: String) {
    orders(first: $first, after: $after) {
        pageInfo {
            hasNextPage
            endCursor
        }
        edges {
            node {
                id
                name
                tags
                transactions(first: 5) {
                    gateway
                }
            }
        }
    }
}
"#;

/// Tag replacement mutation. The remote replaces the order's tag list
/// atomically with whatever is sent, so callers must pass the complete
/// desired set.
const ORDER_UPDATE_MUTATION: &str = r#"
mutation orderUpdate($input: OrderInput!) {
    orderUpdate(input: $input) {
        order {
            id
            tags
        }
        userErrors {
            field
            message
        }
    }
}
"#;

/// HTTP client for the Admin GraphQL endpoint.
///
/// Stateless between calls and safe for concurrent use by multiple
/// workers; backoff state is local to each call.
pub struct GatewayClient {
    http: Client,
    endpoint: String,
    access_token: String,
    backoff: BackoffPolicy,
}

impl GatewayClient {
    /// Create a client from run configuration.
    pub fn new(config: &RunConfig) -> Self {
        Self::with_endpoint(
            config.endpoint(),
            config.access_token.clone(),
            BackoffPolicy::new(config.backoff.clone()),
            config.request_timeout,
        )
    }

    /// Create a client against an explicit endpoint.
    ///
    /// Useful for tests and API-compatible proxies.
    pub fn with_endpoint(
        endpoint: String,
        access_token: String,
        backoff: BackoffPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http: Client::builder()
                .timeout(request_timeout)
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
            access_token,
            backoff,
        }
    }

    /// The endpoint this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a GraphQL document with retry/backoff, returning the
    /// response `data` payload.
    async fn execute(&self, query: &str, variables: Value) -> GatewayResult<Value> {
        let mut attempt = 0;
        let mut last_delay = Duration::ZERO;

        loop {
            match self.post(query, &variables).await {
                Ok(data) => return Ok(data),
                Err(err) if err.is_retryable() && attempt + 1 < self.backoff.max_attempts() => {
                    // A Retry-After floor on an early attempt must not let
                    // a later delay shrink below it.
                    let delay = self
                        .backoff
                        .delay_for(attempt, err.retry_after())
                        .max(last_delay);
                    last_delay = delay;
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.backoff.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable gateway error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Execute a single request (no retry logic).
    async fn post(&self, query: &str, variables: &Value) -> GatewayResult<Value> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(GatewayError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        if let Some(errors) = envelope.errors {
            if !errors.is_empty() {
                return Err(classify_wire_errors(errors));
            }
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::Parse("response carried no data field".to_string()))
    }
}

#[async_trait]
impl OrdersGateway for GatewayClient {
    async fn fetch_orders_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> GatewayResult<OrderPage> {
        let mut variables = json!({ "first": page_size as u32 });
        if let Some(cursor) = cursor {
            variables["after"] = json!(cursor);
        }

        debug!(cursor = ?cursor, page_size, "Fetching orders page");
        let data = self.execute(ORDERS_QUERY, variables).await?;
        parse_orders_page(data)
    }

    async fn apply_tags(&self, order_id: &str, tags: &[String]) -> GatewayResult<Vec<String>> {
        let variables = json!({
            "input": {
                "id": order_id,
                "tags": tags,
            }
        });

        debug!(order_id, tag_count = tags.len(), "Applying tag set");
        let data = self.execute(ORDER_UPDATE_MUTATION, variables).await?;
        parse_order_update(data)
    }
}

/// Parse the `orders` connection out of a query response.
fn parse_orders_page(data: Value) -> GatewayResult<OrderPage> {
    let connection: OrdersData =
        serde_json::from_value(data).map_err(|e| GatewayError::Parse(e.to_string()))?;

    let orders = connection
        .orders
        .edges
        .into_iter()
        .map(|edge| edge.node)
        .collect();

    Ok(OrderPage::new(
        orders,
        connection.orders.page_info.end_cursor,
        connection.orders.page_info.has_next_page,
    ))
}

/// Parse the `orderUpdate` payload, treating non-empty `userErrors` as a
/// call failure.
fn parse_order_update(data: Value) -> GatewayResult<Vec<String>> {
    let payload: OrderUpdateData =
        serde_json::from_value(data).map_err(|e| GatewayError::Parse(e.to_string()))?;

    let update = payload.order_update;
    if !update.user_errors.is_empty() {
        let issues = update
            .user_errors
            .into_iter()
            .map(|e| GraphQlIssue::new(e.message))
            .collect();
        return Err(GatewayError::GraphQl { issues });
    }

    let order = update
        .order
        .ok_or_else(|| GatewayError::Parse("orderUpdate returned no order".to_string()))?;
    Ok(order.tags)
}

/// Map a non-empty wire `errors` array to a gateway error.
fn classify_wire_errors(errors: Vec<WireError>) -> GatewayError {
    let issues = errors
        .into_iter()
        .map(|e| GraphQlIssue {
            message: e.message,
            code: e.extensions.and_then(|ext| ext.code),
        })
        .collect();
    GatewayError::GraphQl { issues }
}

/// Top-level GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<WireError>>,
}

/// Entry of the wire `errors` array.
#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
    extensions: Option<WireErrorExtensions>,
}

/// `extensions` object of a wire error.
#[derive(Debug, Deserialize)]
struct WireErrorExtensions {
    code: Option<String>,
}

/// `data` payload of the orders query.
#[derive(Debug, Deserialize)]
struct OrdersData {
    orders: OrdersConnection,
}

/// Orders connection with page info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrdersConnection {
    page_info: PageInfo,
    edges: Vec<OrderEdge>,
}

/// Cursor pagination state for a connection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

/// Single edge wrapping an order node.
#[derive(Debug, Deserialize)]
struct OrderEdge {
    node: Order,
}

/// `data` payload of the orderUpdate mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderUpdateData {
    order_update: OrderUpdatePayload,
}

/// orderUpdate result with the remote's validation errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderUpdatePayload {
    order: Option<UpdatedOrder>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

/// Order state confirmed by the mutation.
#[derive(Debug, Deserialize)]
struct UpdatedOrder {
    #[allow(dead_code)]
    id: String,
    tags: Vec<String>,
}

/// Mutation validation error.
#[derive(Debug, Deserialize)]
struct UserError {
    #[allow(dead_code)]
    field: Option<Vec<String>>,
    message: String,
}
