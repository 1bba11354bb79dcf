//! Notifier Core - shared domain logic for the shop notifier.
//!
//! This crate has no I/O. It provides:
//!
//! - **models**: recipients, pending orders and sheet-origin products
//! - **header_map**: header-synonym table and row-to-product parsing
//! - **format**: number/time formatting and the notification templates

pub mod format;
pub mod header_map;
pub mod models;

pub use format::{escape_markdown, format_price, format_timestamp, order_message, product_message};
pub use header_map::{
    field_for_header, non_blank_rows, normalize_header, parse_price, parse_product_row,
    ProductField,
};
pub use models::{
    OrderTime, PendingOrder, Recipient, RecipientKind, SheetProduct, DEFAULT_PRODUCT_IMAGE,
};
