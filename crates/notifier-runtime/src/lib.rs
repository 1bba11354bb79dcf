//! Change detection and delivery for the shop notifier.
//!
//! - `OrderDetector` - announces orders not yet flagged as notified
//! - `ProductDetector` - announces rows appended to the product table
//! - `Dispatcher` - best-effort fan-out over a `Messenger`
//! - `PollingLoop` - warm-up, priming, then one cycle per interval
//! - `Runtime` - spawns the loop and stops it on request
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use notifier_runtime::{RecordingMessenger, Runtime, RuntimeConfig, Sources};
//! use notifier_store::{MemoryDirectory, MemorySheet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sources = Sources {
//!         directory: Arc::new(MemoryDirectory::new()),
//!         sheet: Arc::new(MemorySheet::new([vec!["Name", "Price"]])),
//!         orders: None,
//!         products: None,
//!         messenger: Arc::new(RecordingMessenger::new()),
//!     };
//!
//!     let mut runtime = Runtime::new(RuntimeConfig::default(), sources);
//!     runtime.start()?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Cycle
//!
//! Each cycle reads the recipient list fresh. With no recipients the cycle
//! does nothing else. Otherwise the order sweep runs, then the product scan;
//! a failure in one is logged and does not stop the other. A panic inside a
//! cycle is caught and the loop carries on after the usual interval.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod orders;
pub mod poller;
pub mod products;
pub mod runtime;

pub use config::RuntimeConfig;
pub use dispatch::{Dispatcher, Messenger, RecordingMessenger};
pub use error::{Result, RuntimeError};
pub use orders::OrderDetector;
pub use poller::{CycleReport, LoopPhase, PollingLoop, Sources};
pub use products::{ProductDetector, ScanOutcome, SyncReport};
pub use runtime::Runtime;
