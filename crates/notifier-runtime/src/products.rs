//! Product change detector.
//!
//! New products are detected by row count: the loop remembers how many
//! non-blank rows it has seen, and every row past that position is new.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use notifier_core::{non_blank_rows, parse_product_row, product_message, Recipient, SheetProduct};
use notifier_store::{ProductSheet, ProductStore, UpsertOutcome};

use crate::dispatch::Dispatcher;
use crate::error::Result;

/// Result of one scan of the product table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Non-blank rows in the table, header included.
    pub total_rows: usize,
    /// Products built from the rows past the cursor.
    pub new_products: Vec<SheetProduct>,
}

/// Counts from a startup catalogue sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Watches the product table for appended rows.
pub struct ProductDetector {
    sheet: Arc<dyn ProductSheet>,
    store: Option<Arc<dyn ProductStore>>,
    dispatcher: Dispatcher,
}

impl ProductDetector {
    pub fn new(
        sheet: Arc<dyn ProductSheet>,
        store: Option<Arc<dyn ProductStore>>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            sheet,
            store,
            dispatcher,
        }
    }

    async fn table(&self) -> Result<Vec<Vec<String>>> {
        Ok(non_blank_rows(self.sheet.rows().await?))
    }

    /// Current number of non-blank rows, header included.
    pub async fn row_count(&self) -> Result<usize> {
        Ok(self.table().await?.len())
    }

    /// Size of the catalogue, if one is configured.
    pub async fn catalogue_size(&self) -> Result<Option<u64>> {
        match &self.store {
            Some(store) => Ok(Some(store.count_products().await?)),
            None => Ok(None),
        }
    }

    /// Persist and announce every row past `cursor`.
    ///
    /// The caller advances its cursor to `total_rows` once the whole batch is
    /// done. A failed persist only drops the confirmation line from the
    /// message.
    pub async fn scan(&self, cursor: usize, recipients: &[Recipient]) -> Result<ScanOutcome> {
        let rows = self.table().await?;
        let total_rows = rows.len();
        let mut outcome = ScanOutcome {
            total_rows,
            new_products: Vec::new(),
        };

        let Some(headers) = rows.first() else {
            return Ok(outcome);
        };
        if total_rows <= cursor {
            return Ok(outcome);
        }

        info!(count = total_rows - cursor.max(1), "New product rows detected");
        for (index, row) in rows.iter().enumerate().skip(cursor.max(1)) {
            let product = parse_product_row(headers, row, index);
            let persisted = self.persist(&product).await;
            let message = product_message(&product, Utc::now(), persisted);
            let delivered = self.dispatcher.broadcast(recipients, &message).await;
            info!(
                product = %product.name,
                row = index,
                persisted = persisted,
                delivered = delivered,
                "Announced product"
            );
            outcome.new_products.push(product);
        }

        Ok(outcome)
    }

    async fn persist(&self, product: &SheetProduct) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.insert_product(product).await {
            Ok(_) => true,
            Err(e) => {
                warn!(product = %product.name, error = %e, "Failed to save sheet product");
                false
            }
        }
    }

    /// Upsert every data row into the catalogue by name, without announcing.
    pub async fn sync_catalogue(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let Some(store) = &self.store else {
            debug!("No product store configured, skipping catalogue sync");
            return Ok(report);
        };

        let rows = self.table().await?;
        let Some(headers) = rows.first() else {
            return Ok(report);
        };

        for (index, row) in rows.iter().enumerate().skip(1) {
            let product = parse_product_row(headers, row, index);
            match store.upsert_by_name(&product).await {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::PriceUpdated) => report.updated += 1,
                Ok(UpsertOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    warn!(product = %product.name, error = %e, "Failed to sync product");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RecordingMessenger;
    use notifier_core::RecipientKind;
    use notifier_store::{MemoryProductStore, MemorySheet};

    fn catalogue_sheet() -> MemorySheet {
        MemorySheet::new([
            vec!["Tên", "Giá", "Mô tả", "Ảnh"],
            vec!["Mug", "50.000đ", "", "☕"],
            vec!["", "", "", ""],
            vec!["Hat", "N/A", "Wool", ""],
        ])
    }

    fn recipients() -> Vec<Recipient> {
        vec![
            Recipient::new("1", "A", RecipientKind::User),
            Recipient::new("2", "B", RecipientKind::User),
        ]
    }

    #[tokio::test]
    async fn test_row_count_skips_blank_rows() {
        let messenger = Arc::new(RecordingMessenger::new());
        let detector =
            ProductDetector::new(Arc::new(catalogue_sheet()), None, Dispatcher::new(messenger));

        assert_eq!(detector.row_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_scan_announces_appended_row() {
        let sheet = Arc::new(catalogue_sheet());
        let store = Arc::new(MemoryProductStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let detector = ProductDetector::new(
            sheet.clone(),
            Some(store.clone()),
            Dispatcher::new(messenger.clone()),
        );

        sheet.push_row(["Áo thun", "150000", "Cotton", ""]).await;
        let outcome = detector.scan(3, &recipients()).await.unwrap();

        assert_eq!(outcome.total_rows, 4);
        assert_eq!(outcome.new_products.len(), 1);
        let product = &outcome.new_products[0];
        assert_eq!(product.name, "Áo thun");
        assert_eq!(product.price, 150000);
        assert_eq!(product.description.as_deref(), Some("Cotton"));
        assert_eq!(product.image, "📦");

        assert_eq!(store.products().await, vec![product.clone()]);
        for chat_id in ["1", "2"] {
            let messages = messenger.messages_to(chat_id).await;
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("Áo thun"));
            assert!(messages[0].contains("150.000"));
            assert!(messages[0].contains("Added to the catalogue"));
        }
    }

    #[tokio::test]
    async fn test_scan_without_growth_is_quiet() {
        let messenger = Arc::new(RecordingMessenger::new());
        let detector = ProductDetector::new(
            Arc::new(catalogue_sheet()),
            None,
            Dispatcher::new(messenger.clone()),
        );

        let outcome = detector.scan(3, &recipients()).await.unwrap();
        assert_eq!(outcome.total_rows, 3);
        assert!(outcome.new_products.is_empty());

        let outcome = detector.scan(5, &recipients()).await.unwrap();
        assert!(outcome.new_products.is_empty());
        assert!(messenger.attempts().await.is_empty());
    }

    #[tokio::test]
    async fn test_scan_from_zero_skips_header() {
        let messenger = Arc::new(RecordingMessenger::new());
        let detector = ProductDetector::new(
            Arc::new(catalogue_sheet()),
            None,
            Dispatcher::new(messenger.clone()),
        );

        let outcome = detector.scan(0, &recipients()).await.unwrap();
        let names: Vec<&str> = outcome.new_products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mug", "Hat"]);

        let hat = messenger.messages_to("1").await.remove(1);
        assert!(hat.contains("*Price:* Contact"));
        assert!(!hat.contains("Added to the catalogue"));
    }

    #[tokio::test]
    async fn test_failed_persist_still_announces() {
        let sheet = Arc::new(catalogue_sheet());
        let store = Arc::new(MemoryProductStore::new());
        store.set_failing(true);
        let messenger = Arc::new(RecordingMessenger::new());
        let detector = ProductDetector::new(
            sheet.clone(),
            Some(store.clone()),
            Dispatcher::new(messenger.clone()),
        );

        sheet.push_row(["Scarf", "20000"]).await;
        let outcome = detector.scan(3, &recipients()).await.unwrap();

        assert_eq!(outcome.new_products.len(), 1);
        let message = &messenger.messages_to("2").await[0];
        assert!(message.contains("Scarf"));
        assert!(!message.contains("Added to the catalogue"));
    }

    #[tokio::test]
    async fn test_sync_catalogue_upserts_without_messages() {
        let store = Arc::new(MemoryProductStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let detector = ProductDetector::new(
            Arc::new(catalogue_sheet()),
            Some(store.clone()),
            Dispatcher::new(messenger.clone()),
        );

        let first = detector.sync_catalogue().await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = detector.sync_catalogue().await.unwrap();
        assert_eq!(second.unchanged, 2);
        assert_eq!(store.count_products().await.unwrap(), 2);
        assert!(messenger.attempts().await.is_empty());
    }
}
