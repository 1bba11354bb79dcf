//! Order change detector.

use std::sync::Arc;

use tracing::{info, warn};

use notifier_core::{order_message, Recipient};
use notifier_store::OrderStore;

use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Announces orders whose `notified` flag is not set, then sets it.
pub struct OrderDetector {
    store: Arc<dyn OrderStore>,
    dispatcher: Dispatcher,
}

impl OrderDetector {
    pub fn new(store: Arc<dyn OrderStore>, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Number of orders still waiting to be announced.
    pub async fn count_pending(&self) -> Result<u64> {
        Ok(self.store.count_pending().await?)
    }

    /// Announce every pending order to every recipient.
    ///
    /// Each order is flagged after its broadcast whatever the delivery count.
    /// If the pending list cannot be read nothing is sent. If an order cannot
    /// be flagged the sweep stops there, so an outage repeats at most that
    /// one order next cycle. Returns the number of orders announced.
    pub async fn sweep(&self, recipients: &[Recipient]) -> Result<usize> {
        let pending = self.store.pending_orders().await?;

        for order in &pending {
            let delivered = self
                .dispatcher
                .broadcast(recipients, &order_message(order))
                .await;
            info!(
                order_id = %order.id,
                delivered = delivered,
                recipients = recipients.len(),
                "Announced order"
            );

            if let Err(e) = self.store.mark_notified(&order.key).await {
                warn!(order_id = %order.id, error = %e, "Failed to flag order as notified");
                return Err(e.into());
            }
        }

        Ok(pending.len())
    }
}
