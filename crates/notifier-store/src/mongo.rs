//! MongoDB backend for orders and the product catalogue.
//!
//! The client is created lazily on first use and shared afterwards. When an
//! operation fails the handle is dropped, so the next call reconnects instead
//! of reusing a handle that may be stale.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::{Client, Database};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use notifier_core::{OrderTime, PendingOrder, SheetProduct};

use crate::error::{Result, StoreError};
use crate::store::{OrderStore, ProductStore, UpsertOutcome};

const ORDERS: &str = "orders";
const USERS: &str = "users";
const PRODUCTS: &str = "products";

/// Orders and products in a MongoDB database.
pub struct MongoStore {
    uri: String,
    database: RwLock<Option<Database>>,
}

impl MongoStore {
    /// Create a store for the connection string.
    ///
    /// The string must name a default database. Nothing is contacted until
    /// the first operation.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: RwLock::new(None),
        }
    }

    async fn database(&self) -> Result<Database> {
        if let Some(db) = self.database.read().await.as_ref() {
            return Ok(db.clone());
        }

        let mut slot = self.database.write().await;
        if let Some(db) = slot.as_ref() {
            return Ok(db.clone());
        }

        let client = Client::with_uri_str(&self.uri).await?;
        let db = client.default_database().ok_or_else(|| {
            StoreError::Database("connection string names no default database".to_string())
        })?;
        info!(database = %db.name(), "Connected to MongoDB");
        *slot = Some(db.clone());
        Ok(db)
    }

    /// Run one operation, dropping the connection if it fails.
    async fn run<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Database) -> Fut + Send,
        Fut: Future<Output = mongodb::error::Result<T>> + Send,
    {
        let db = self.database().await?;
        match op(db).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, "MongoDB operation failed, dropping connection");
                *self.database.write().await = None;
                Err(e.into())
            }
        }
    }
}

/// Filter matching `notified != true`.
fn pending_filter() -> Document {
    doc! { "notified": { "$ne": true } }
}

/// Pending orders joined with their user and product.
fn pending_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": pending_filter() },
        doc! { "$lookup": {
            "from": USERS,
            "localField": "user",
            "foreignField": "_id",
            "as": "user_info",
        }},
        doc! { "$lookup": {
            "from": PRODUCTS,
            "localField": "product",
            "foreignField": "_id",
            "as": "product_info",
        }},
    ]
}

/// Encode an `_id` as canonical extended JSON, keeping its BSON type.
fn order_key(id: Option<&Bson>) -> String {
    id.cloned()
        .unwrap_or(Bson::Null)
        .into_canonical_extjson()
        .to_string()
}

/// Match the document whose `_id` was encoded by [`order_key`].
fn key_filter(key: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(key)?;
    let id = Bson::try_from(value)
        .map_err(|e| StoreError::Database(format!("unreadable order key {}: {}", key, e)))?;
    Ok(doc! { "_id": id })
}

fn id_to_string(value: Option<&Bson>) -> String {
    match value {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn first_joined<'a>(order: &'a Document, key: &str) -> Option<&'a Document> {
    order.get_array(key).ok()?.first()?.as_document()
}

/// Numeric BSON rounded to an integer; anything else is 0.
fn bson_amount(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) if v.is_finite() => v.round() as i64,
        _ => 0,
    }
}

fn order_time(value: Option<&Bson>) -> OrderTime {
    match value {
        Some(Bson::DateTime(at)) => DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis())
            .map(OrderTime::At)
            .unwrap_or_else(|| OrderTime::Raw(at.to_string())),
        Some(Bson::String(raw)) => OrderTime::Raw(raw.clone()),
        Some(other) => OrderTime::Raw(other.to_string()),
        None => OrderTime::At(Utc::now()),
    }
}

/// Convert one aggregation result into a [`PendingOrder`].
fn pending_order_from_document(order: &Document) -> PendingOrder {
    let username = first_joined(order, "user_info")
        .and_then(|user| user.get_str("username").ok())
        .map(str::to_string);
    let product_name = first_joined(order, "product_info")
        .and_then(|product| product.get_str("name").ok())
        .map(str::to_string);

    PendingOrder {
        id: id_to_string(order.get("_id")),
        key: order_key(order.get("_id")),
        username,
        product_name,
        total_price: bson_amount(order.get("totalPrice")),
        created_at: order_time(order.get("createdAt")),
    }
}

fn stored_price(product: &SheetProduct) -> i64 {
    i64::try_from(product.price).unwrap_or(i64::MAX)
}

/// Document for a product copied from the sheet.
fn product_document(product: &SheetProduct) -> Document {
    doc! {
        "name": product.name.as_str(),
        "price": stored_price(product),
        "description": product.description.as_deref().unwrap_or_default(),
        "image": product.image.as_str(),
        "createdAt": BsonDateTime::now(),
        "fromSheet": true,
    }
}

#[async_trait]
impl OrderStore for MongoStore {
    async fn pending_orders(&self) -> Result<Vec<PendingOrder>> {
        let documents: Vec<Document> = self
            .run(|db| async move {
                let cursor = db
                    .collection::<Document>(ORDERS)
                    .aggregate(pending_pipeline())
                    .await?;
                cursor.try_collect().await
            })
            .await?;

        if !documents.is_empty() {
            debug!(count = documents.len(), "Fetched pending orders");
        }
        Ok(documents.iter().map(pending_order_from_document).collect())
    }

    async fn count_pending(&self) -> Result<u64> {
        self.run(|db| async move {
            db.collection::<Document>(ORDERS)
                .count_documents(pending_filter())
                .await
        })
        .await
    }

    async fn mark_notified(&self, key: &str) -> Result<()> {
        let filter = key_filter(key)?;
        let result = self
            .run(|db| async move {
                db.collection::<Document>(ORDERS)
                    .update_one(filter, doc! { "$set": { "notified": true } })
                    .await
            })
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::OrderNotFound(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    async fn insert_product(&self, product: &SheetProduct) -> Result<String> {
        let document = product_document(product);
        let result = self
            .run(|db| async move {
                db.collection::<Document>(PRODUCTS)
                    .insert_one(document)
                    .await
            })
            .await?;

        let id = id_to_string(Some(&result.inserted_id));
        info!(product = %product.name, product_id = %id, "Saved sheet product");
        Ok(id)
    }

    async fn upsert_by_name(&self, product: &SheetProduct) -> Result<UpsertOutcome> {
        let name = product.name.clone();
        let existing = self
            .run(|db| async move {
                db.collection::<Document>(PRODUCTS)
                    .find_one(doc! { "name": name })
                    .await
            })
            .await?;

        let Some(existing) = existing else {
            self.insert_product(product).await?;
            return Ok(UpsertOutcome::Inserted);
        };

        let price = stored_price(product);
        if bson_amount(existing.get("price")) == price {
            return Ok(UpsertOutcome::Unchanged);
        }

        let filter = match existing.get("_id") {
            Some(id) => doc! { "_id": id.clone() },
            None => doc! { "name": product.name.as_str() },
        };
        self.run(|db| async move {
            db.collection::<Document>(PRODUCTS)
                .update_one(filter, doc! { "$set": { "price": price } })
                .await
        })
        .await?;
        info!(product = %product.name, price = price, "Updated product price");
        Ok(UpsertOutcome::PriceUpdated)
    }

    async fn count_products(&self) -> Result<u64> {
        self.run(|db| async move {
            db.collection::<Document>(PRODUCTS)
                .count_documents(doc! {})
                .await
        })
        .await
    }
}
