//! In-memory backends.
//!
//! Used by tests and local runs without external services. Each store can be
//! switched into a failing mode and counts how often it was queried, so callers
//! can assert both error paths and "never touched" behaviour.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use notifier_core::{PendingOrder, Recipient, SheetProduct};

use crate::error::{Result, StoreError};
use crate::store::{OrderStore, ProductSheet, ProductStore, RecipientDirectory, UpsertOutcome};

#[derive(Default)]
struct Health {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Health {
    fn touch(&self, what: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(what.to_string()));
        }
        Ok(())
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Recipient list held in memory.
#[derive(Default)]
pub struct MemoryDirectory {
    recipients: RwLock<Vec<Recipient>>,
    health: Health,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipients(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients: RwLock::new(recipients),
            health: Health::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.health.set_failing(failing);
    }

    /// Number of calls made against this directory.
    pub fn calls(&self) -> usize {
        self.health.calls()
    }

    pub async fn snapshot(&self) -> Vec<Recipient> {
        self.recipients.read().await.clone()
    }
}

#[async_trait]
impl RecipientDirectory for MemoryDirectory {
    async fn recipients(&self) -> Result<Vec<Recipient>> {
        self.health.touch("recipient directory")?;
        Ok(self.recipients.read().await.clone())
    }

    async fn register(&self, recipient: Recipient) -> Result<bool> {
        self.health.touch("recipient directory")?;
        let mut recipients = self.recipients.write().await;
        if recipients.iter().any(|r| r.id == recipient.id) {
            return Ok(false);
        }
        recipients.push(recipient);
        Ok(true)
    }
}

/// Product table held in memory, header row first.
#[derive(Default)]
pub struct MemorySheet {
    rows: RwLock<Vec<Vec<String>>>,
    health: Health,
}

impl MemorySheet {
    pub fn new<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self {
            rows: RwLock::new(rows),
            health: Health::default(),
        }
    }

    pub async fn push_row<I>(&self, row: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.rows
            .write()
            .await
            .push(row.into_iter().map(Into::into).collect());
    }

    pub fn set_failing(&self, failing: bool) {
        self.health.set_failing(failing);
    }

    /// Number of reads made against this sheet.
    pub fn calls(&self) -> usize {
        self.health.calls()
    }
}

#[async_trait]
impl ProductSheet for MemorySheet {
    async fn rows(&self) -> Result<Vec<Vec<String>>> {
        self.health.touch("product sheet")?;
        Ok(self.rows.read().await.clone())
    }
}

/// Orders held in memory with their `notified` flag.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<(PendingOrder, bool)>>,
    health: Health,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order that has not been announced yet.
    pub async fn insert(&self, order: PendingOrder) {
        self.orders.write().await.push((order, false));
    }

    pub async fn is_notified(&self, order_id: &str) -> bool {
        self.orders
            .read()
            .await
            .iter()
            .any(|(order, notified)| order.id == order_id && *notified)
    }

    pub fn set_failing(&self, failing: bool) {
        self.health.set_failing(failing);
    }

    /// Number of calls made against this store.
    pub fn calls(&self) -> usize {
        self.health.calls()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn pending_orders(&self) -> Result<Vec<PendingOrder>> {
        self.health.touch("order store")?;
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|(_, notified)| !notified)
            .map(|(order, _)| order.clone())
            .collect())
    }

    async fn count_pending(&self) -> Result<u64> {
        Ok(self.pending_orders().await?.len() as u64)
    }

    async fn mark_notified(&self, key: &str) -> Result<()> {
        self.health.touch("order store")?;
        let mut orders = self.orders.write().await;
        let (_, notified) = orders
            .iter_mut()
            .find(|(order, _)| order.key == key)
            .ok_or_else(|| StoreError::OrderNotFound(key.to_string()))?;
        *notified = true;
        Ok(())
    }
}

/// Product catalogue held in memory.
#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<SheetProduct>>,
    health: Health,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn products(&self) -> Vec<SheetProduct> {
        self.products.read().await.clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.health.set_failing(failing);
    }

    /// Number of calls made against this store.
    pub fn calls(&self) -> usize {
        self.health.calls()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert_product(&self, product: &SheetProduct) -> Result<String> {
        self.health.touch("product store")?;
        let mut products = self.products.write().await;
        products.push(product.clone());
        Ok(format!("product-{}", products.len()))
    }

    async fn upsert_by_name(&self, product: &SheetProduct) -> Result<UpsertOutcome> {
        self.health.touch("product store")?;
        let mut products = self.products.write().await;
        match products.iter_mut().find(|p| p.name == product.name) {
            Some(existing) if existing.price == product.price => Ok(UpsertOutcome::Unchanged),
            Some(existing) => {
                existing.price = product.price;
                Ok(UpsertOutcome::PriceUpdated)
            }
            None => {
                products.push(product.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn count_products(&self) -> Result<u64> {
        self.health.touch("product store")?;
        Ok(self.products.read().await.len() as u64)
    }
}
