//! tagforge: payment-gateway tagging for store orders.
//!
//! Enumerates every order via cursor pagination, derives each order's
//! payment gateway from its transactions, and appends it as an order tag
//! when missing.

// Core modules
pub mod cli;
pub mod config;
pub mod export;
pub mod gateway;
pub mod pipeline;

// Re-export commonly used error types
pub use config::ConfigError;
pub use export::ExportError;
pub use gateway::GatewayError;
pub use pipeline::{PipelineError, UnidentifiableGatewayError};
