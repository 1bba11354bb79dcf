//! Background polling loop driving both change detectors.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use notifier_store::{OrderStore, ProductSheet, ProductStore, RecipientDirectory};

use crate::config::RuntimeConfig;
use crate::dispatch::{Dispatcher, Messenger};
use crate::orders::OrderDetector;
use crate::products::ProductDetector;

/// Everything the loop reads from and sends to.
#[derive(Clone)]
pub struct Sources {
    pub directory: Arc<dyn RecipientDirectory>,
    pub sheet: Arc<dyn ProductSheet>,
    /// `None` disables order monitoring.
    pub orders: Option<Arc<dyn OrderStore>>,
    /// `None` disables product persistence.
    pub products: Option<Arc<dyn ProductStore>>,
    pub messenger: Arc<dyn Messenger>,
}

/// Where the loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Starting,
    Priming,
    Steady { cycle: u64 },
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub recipients: usize,
    pub orders_announced: usize,
    pub products_announced: usize,
    /// No recipients, so neither detector ran.
    pub skipped: bool,
}

/// Runs the detectors on a fixed interval until told to stop.
pub struct PollingLoop {
    config: RuntimeConfig,
    directory: Arc<dyn RecipientDirectory>,
    orders: Option<OrderDetector>,
    products: ProductDetector,
    cursor: Option<usize>,
    phase: LoopPhase,
    shutdown: watch::Receiver<bool>,
}

impl PollingLoop {
    pub fn new(config: RuntimeConfig, sources: Sources, shutdown: watch::Receiver<bool>) -> Self {
        let dispatcher = Dispatcher::new(sources.messenger);
        Self {
            config,
            directory: sources.directory,
            orders: sources
                .orders
                .map(|store| OrderDetector::new(store, dispatcher.clone())),
            products: ProductDetector::new(sources.sheet, sources.products, dispatcher),
            cursor: None,
            phase: LoopPhase::Starting,
            shutdown,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Rows seen so far, or `None` until the product table was read once.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Warm up, prime, then cycle until the shutdown signal.
    pub async fn run(&mut self) {
        info!(
            warmup_secs = self.config.warmup.as_secs(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting polling loop"
        );

        if !self.pause(self.config.warmup).await {
            debug!("Polling loop stopped during warm-up");
            return;
        }

        self.phase = LoopPhase::Priming;
        self.prime().await;

        let mut cycle = 0;
        loop {
            cycle += 1;
            self.phase = LoopPhase::Steady { cycle };

            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) => trace!(cycle = cycle, ?report, "Cycle finished"),
                Err(_) => error!(cycle = cycle, "Cycle panicked, continuing with the next one"),
            }

            if !self.pause(self.config.poll_interval).await {
                break;
            }
        }

        info!("Polling loop stopped");
    }

    /// Sleep for `duration`. Returns `false` if the loop should stop instead.
    async fn pause(&mut self, duration: Duration) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!("Polling loop received shutdown signal");
                        return false;
                    }
                }
            }
        }
    }

    /// Read the starting cursor and log diagnostics.
    pub async fn prime(&mut self) {
        match self.products.row_count().await {
            Ok(rows) => {
                self.cursor = Some(rows);
                info!(rows = rows, "Product table primed");
            }
            Err(e) => warn!(error = %e, "Could not read product table, priming on first read"),
        }

        match &self.orders {
            Some(orders) => match orders.count_pending().await {
                Ok(pending) => info!(pending = pending, "Order monitoring active"),
                Err(e) => warn!(error = %e, "Could not count pending orders"),
            },
            None => info!("Order monitoring disabled"),
        }

        match self.products.catalogue_size().await {
            Ok(Some(count)) => info!(products = count, "Product catalogue connected"),
            Ok(None) => debug!("No product catalogue configured"),
            Err(e) => warn!(error = %e, "Could not count catalogue products"),
        }

        if self.config.sync_products_on_start {
            match self.products.sync_catalogue().await {
                Ok(report) => info!(
                    inserted = report.inserted,
                    updated = report.updated,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    "Catalogue synced from sheet"
                ),
                Err(e) => warn!(error = %e, "Catalogue sync failed"),
            }
        }
    }

    /// One steady-state cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let recipients = match self.directory.recipients().await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(error = %e, "Could not read recipients");
                Vec::new()
            }
        };

        if recipients.is_empty() {
            debug!("No recipients registered, skipping cycle");
            return CycleReport {
                skipped: true,
                ..CycleReport::default()
            };
        }

        let mut report = CycleReport {
            recipients: recipients.len(),
            ..CycleReport::default()
        };

        if let Some(orders) = &self.orders {
            match orders.sweep(&recipients).await {
                Ok(announced) => report.orders_announced = announced,
                Err(e) => warn!(error = %e, "Order sweep failed"),
            }
        }

        match self.cursor {
            None => match self.products.row_count().await {
                Ok(rows) => {
                    self.cursor = Some(rows);
                    info!(rows = rows, "Product table primed");
                }
                Err(e) => warn!(error = %e, "Could not read product table"),
            },
            Some(cursor) => match self.products.scan(cursor, &recipients).await {
                Ok(outcome) => {
                    if outcome.total_rows > cursor {
                        self.cursor = Some(outcome.total_rows);
                    }
                    report.products_announced = outcome.new_products.len();
                }
                Err(e) => warn!(error = %e, "Product scan failed"),
            },
        }

        report
    }
}
