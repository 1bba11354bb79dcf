//! Storage backends for the shop notifier.
//!
//! The detectors and the webhook handler only see the traits in [`store`].
//! Three backends implement them:
//!
//! - **SheetsClient / SheetTable / SheetDirectory**: Google Sheets over the
//!   REST API, authenticated with a service-account key
//! - **MongoStore**: orders and the product catalogue in MongoDB
//! - **Memory\***: in-process doubles for tests and local runs
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use notifier_store::{ProductSheet, ServiceAccountKey, SheetsClient};
//!
//! # async fn example(key_json: &str) -> notifier_store::Result<()> {
//! let key = ServiceAccountKey::from_json(key_json)?;
//! let client = Arc::new(SheetsClient::new("spreadsheet-id", Some(key))?);
//! let products = client.table("product");
//!
//! for row in products.rows().await? {
//!     println!("{}", row.join(" | "));
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod mongo;
pub mod sheets;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{MemoryDirectory, MemoryOrderStore, MemoryProductStore, MemorySheet};
pub use mongo::MongoStore;
pub use sheets::{parse_recipients, ServiceAccountKey, SheetDirectory, SheetTable, SheetsClient};
pub use store::{OrderStore, ProductSheet, ProductStore, RecipientDirectory, UpsertOutcome};
