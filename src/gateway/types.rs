//! Common types for the Admin API gateway client.
//!
//! Defines the order snapshot types returned by pagination, the page
//! wrapper, and the error taxonomy shared by query and mutation calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection-level failure (DNS, timeout, refused connection).
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP 429 from the remote.
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited {
        /// Optional Retry-After duration in seconds.
        retry_after: Option<u64>,
    },

    /// Non-2xx HTTP response without a rate-limit signal.
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Application-level errors carried in the response body.
    #[error("GraphQL errors: {}", format_issues(.issues))]
    GraphQl { issues: Vec<GraphQlIssue> },

    /// Response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Whether retrying this call can succeed.
    ///
    /// Transport failures and rate limits are retryable; among GraphQL
    /// errors only the cost-based throttle is. Everything else surfaces
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::RateLimited { .. } => true,
            GatewayError::GraphQl { issues } => issues.iter().any(GraphQlIssue::is_throttled),
            GatewayError::Api { .. } | GatewayError::Parse(_) => false,
        }
    }

    /// Server-requested minimum wait in seconds, if the remote sent one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A single entry from a GraphQL `errors` array or mutation `userErrors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlIssue {
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code from `extensions.code`, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Error code the remote uses for cost-based query throttling.
const THROTTLED_CODE: &str = "THROTTLED";

impl GraphQlIssue {
    /// Create an issue with a message only (mutation userErrors carry no code).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create an issue with an error code.
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Whether this issue is the remote's cost-throttle signal.
    pub fn is_throttled(&self) -> bool {
        self.code.as_deref() == Some(THROTTLED_CODE)
    }
}

fn format_issues(issues: &[GraphQlIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// A payment transaction attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Payment gateway name; may be empty or absent on the wire.
    #[serde(default)]
    pub gateway: Option<String>,
}

impl Transaction {
    /// Create a transaction with the given gateway name.
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: Some(gateway.into()),
        }
    }
}

/// Read-only order snapshot fetched during enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Opaque order identifier.
    pub id: String,
    /// Human-facing order name (e.g. "#1001").
    #[serde(default)]
    pub name: String,
    /// Existing tags in the order they were returned.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Transactions in the order they were returned.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Order {
    /// Whether the given tag is already present (exact string match).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// One page of the order enumeration walk.
#[derive(Debug, Clone)]
pub struct OrderPage {
    /// Orders in this page, in fetch order.
    pub orders: Vec<Order>,
    /// Cursor for fetching the next page, if the remote returned one.
    pub next_cursor: Option<String>,
    /// Whether more pages exist after this one.
    pub has_next_page: bool,
}

impl OrderPage {
    /// Create a new page.
    pub fn new(orders: Vec<Order>, next_cursor: Option<String>, has_next_page: bool) -> Self {
        Self {
            orders,
            next_cursor,
            has_next_page,
        }
    }

    /// Create an empty final page.
    pub fn empty() -> Self {
        Self {
            orders: Vec::new(),
            next_cursor: None,
            has_next_page: false,
        }
    }

    /// Create a final page with no pages after it.
    pub fn last_page(orders: Vec<Order>) -> Self {
        Self {
            orders,
            next_cursor: None,
            has_next_page: false,
        }
    }
}

impl Default for OrderPage {
    fn default() -> Self {
        Self::empty()
    }
}
