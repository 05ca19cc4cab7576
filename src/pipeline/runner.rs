//! Run orchestration: serial enumeration, then bounded-concurrency tagging.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::gateway::{GatewayError, Order, OrdersGateway};

use super::progress::{ProgressCounters, ProgressMonitor};
use super::summary::{RunSummary, TagAction, TagUpdateResult};
use super::tagger::process_order;

/// How often the background monitor logs tagging progress.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Fatal pipeline errors. Only the enumeration phase can produce these;
/// tagging failures are recorded per order and never abort the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A page fetch failed after the client exhausted its retries. Later
    /// pages are unreachable without this page's cursor, so the run ends.
    #[error("order enumeration failed after {orders_seen} orders: {source}")]
    Enumeration {
        orders_seen: usize,
        #[source]
        source: GatewayError,
    },

    /// The remote claimed more pages exist but returned no cursor.
    #[error("page {page} reported more results but carried no cursor")]
    MissingCursor { page: usize },
}

/// Drives a full tagging run against an [`OrdersGateway`].
pub struct TagPipeline {
    gateway: Arc<dyn OrdersGateway>,
    workers: usize,
    page_size: usize,
    test_limit: Option<usize>,
}

impl TagPipeline {
    /// Create a pipeline from run configuration.
    pub fn new(gateway: Arc<dyn OrdersGateway>, config: &RunConfig) -> Self {
        Self {
            gateway,
            workers: config.workers,
            page_size: config.page_size,
            test_limit: config.test_limit,
        }
    }

    /// Execute the full run: enumerate every order, then tag them with a
    /// bounded worker pool.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` only for enumeration-phase failures.
    /// Per-order tagging failures are recorded in the summary instead.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        match self.test_limit {
            Some(limit) => info!(run_id = %run_id, limit, "Run started in test mode"),
            None => info!(run_id = %run_id, "Run started"),
        }

        let orders = match self.enumerate().await {
            Ok(orders) => orders,
            Err(err) => {
                error!(error = %err, "Enumeration aborted, terminating run");
                return Err(err);
            }
        };

        info!(orders = orders.len(), "Enumeration complete");

        let results = self.tag_all(&orders).await;
        let summary = RunSummary::from_results(run_id, started_at, results);

        info!(
            run_id = %run_id,
            orders_seen = summary.orders_seen,
            tagged = summary.tagged,
            skipped = summary.skipped,
            failed = summary.failed,
            "Run complete"
        );

        Ok(summary)
    }

    /// Phase 1: walk the cursor chain sequentially, accumulating orders
    /// in fetch order. Each page's cursor depends on the previous
    /// response, so there is nothing to parallelize here.
    async fn enumerate(&self) -> Result<Vec<Order>, PipelineError> {
        let mut orders: Vec<Order> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        loop {
            let batch = self
                .gateway
                .fetch_orders_page(cursor.as_deref(), self.page_size)
                .await
                .map_err(|source| PipelineError::Enumeration {
                    orders_seen: orders.len(),
                    source,
                })?;

            page += 1;
            let fetched = batch.orders.len();
            orders.extend(batch.orders);

            info!(
                page,
                fetched,
                total = orders.len(),
                cursor = ?batch.next_cursor,
                "Orders page fetched"
            );

            if let Some(limit) = self.test_limit {
                if orders.len() >= limit {
                    // The last page may overshoot; cut back to exactly N.
                    orders.truncate(limit);
                    info!(limit, "Test limit reached, stopping enumeration");
                    break;
                }
            }

            if !batch.has_next_page {
                break;
            }

            match batch.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Err(PipelineError::MissingCursor { page }),
            }
        }

        Ok(orders)
    }

    /// Phase 2: fan the orders out to at most `workers` concurrent
    /// tagging tasks. `join_all` returns results in submission order, so
    /// the summary preserves fetch order no matter when workers finish.
    async fn tag_all(&self, orders: &[Order]) -> Vec<TagUpdateResult> {
        if orders.is_empty() {
            return Vec::new();
        }

        let counters = ProgressCounters::new();
        let monitor = ProgressMonitor::start(counters.clone(), orders.len(), PROGRESS_INTERVAL);
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let mut worker_futures = Vec::with_capacity(orders.len());
        for order in orders {
            let semaphore = semaphore.clone();
            let gateway = self.gateway.clone();
            let counters = counters.clone();
            worker_futures.push(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let result = process_order(gateway.as_ref(), order).await;

                let counter = match result.action {
                    TagAction::Tagged => &counters.tagged,
                    TagAction::Skipped => &counters.skipped,
                    TagAction::Failed => &counters.failed,
                };
                counter.fetch_add(1, Ordering::Relaxed);

                result
            });
        }

        let results = join_all(worker_futures).await;
        monitor.stop().await;

        results
    }
}
