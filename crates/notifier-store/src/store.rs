//! Storage seams used by the detectors and the webhook handler.
//!
//! Every backend (Google Sheets, MongoDB, in-memory) implements these traits,
//! so the polling loop never knows which one it is talking to. All methods are
//! async and fallible: an `Err` means the backing service could not be reached
//! and the caller must treat the operation as not having happened.

use async_trait::async_trait;

use notifier_core::{PendingOrder, Recipient, SheetProduct};

use crate::error::Result;

/// The append-only list of registered recipients.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Read the full recipient list.
    async fn recipients(&self) -> Result<Vec<Recipient>>;

    /// Check whether an identifier is already registered.
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.recipients().await?.iter().any(|r| r.id == id))
    }

    /// Append a recipient unless its identifier is already present.
    ///
    /// Returns `Ok(false)` when it was already registered. The check and the
    /// append are not atomic: two concurrent registrations of the same
    /// identifier may both append, depending on the backend.
    async fn register(&self, recipient: Recipient) -> Result<bool>;
}

/// A spreadsheet table read as raw rows.
#[async_trait]
pub trait ProductSheet: Send + Sync {
    /// All rows as the backend returns them, header first, blanks included.
    async fn rows(&self) -> Result<Vec<Vec<String>>>;
}

/// Orders awaiting announcement.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Every order whose `notified` flag is not `true`, joined with its user
    /// and product.
    async fn pending_orders(&self) -> Result<Vec<PendingOrder>>;

    /// Number of pending orders (diagnostics only).
    async fn count_pending(&self) -> Result<u64>;

    /// Set `notified = true` on the order with this [`PendingOrder::key`].
    ///
    /// Fails with [`StoreError::OrderNotFound`] when no order matched.
    ///
    /// [`StoreError::OrderNotFound`]: crate::error::StoreError::OrderNotFound
    async fn mark_notified(&self, key: &str) -> Result<()>;
}

/// What an upsert by name did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    PriceUpdated,
    Unchanged,
}

/// The product catalogue that sheet rows are copied into.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a sheet-origin product, returning its identifier.
    async fn insert_product(&self, product: &SheetProduct) -> Result<String>;

    /// Insert the product, or update the price of the product with the same
    /// name if it differs.
    async fn upsert_by_name(&self, product: &SheetProduct) -> Result<UpsertOutcome>;

    /// Number of products in the catalogue (diagnostics only).
    async fn count_products(&self) -> Result<u64>;
}
