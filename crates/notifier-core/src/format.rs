//! Notification templates.
//!
//! Messages use the bot platform's legacy Markdown (`*bold*`).

use chrono::{DateTime, Utc};

use crate::models::{OrderTime, PendingOrder, SheetProduct};

const RULE: &str = "━━━━━━━━━━";
const MISSING: &str = "N/A";
const CURRENCY: &str = "VND";

/// Backslash-escape the characters legacy Markdown treats as entity marks,
/// so free text such as `john_doe` cannot open an unterminated entity.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Group digits in threes with `.` separators: `150000` → `150.000`.
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

/// `DD/MM/YYYY HH:MM:SS`.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

fn format_order_time(time: &OrderTime) -> String {
    match time {
        OrderTime::At(at) => format_timestamp(at),
        OrderTime::Raw(raw) => escape_markdown(raw),
    }
}

/// Message announcing a new order.
pub fn order_message(order: &PendingOrder) -> String {
    format!(
        "🛒 *NEW ORDER!*\n\
         {RULE}\n\
         👤 *User:* {}\n\
         📦 *Product:* {}\n\
         💰 *Price:* {} {CURRENCY}\n\
         🕐 *Time:* {}\n",
        escape_markdown(order.username.as_deref().unwrap_or(MISSING)),
        escape_markdown(order.product_name.as_deref().unwrap_or(MISSING)),
        format_price(order.total_price),
        format_order_time(&order.created_at),
    )
}

/// Message announcing a product appended to the sheet.
///
/// `processed_at` is when the row was picked up, not when it was written.
/// `persisted` adds a confirmation line once the product is in the catalogue.
pub fn product_message(product: &SheetProduct, processed_at: DateTime<Utc>, persisted: bool) -> String {
    let price = if product.price == 0 {
        "Contact".to_string()
    } else {
        let amount = i64::try_from(product.price).unwrap_or(i64::MAX);
        format!("{} {CURRENCY}", format_price(amount))
    };

    let mut message = format!(
        "📦 *NEW PRODUCT!*\n\
         {RULE}\n\
         🏷️ *Name:* {}\n\
         💰 *Price:* {price}\n",
        escape_markdown(&product.name),
    );
    if let Some(description) = &product.description {
        message.push_str(&format!("📝 *Description:* {}\n", escape_markdown(description)));
    }
    message.push_str(&format!("🕐 *Time:* {}\n", format_timestamp(&processed_at)));
    if persisted {
        message.push_str("\n✅ Added to the catalogue!");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap()
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(999), "999");
        assert_eq!(format_price(1000), "1.000");
        assert_eq!(format_price(150000), "150.000");
        assert_eq!(format_price(1234567), "1.234.567");
        assert_eq!(format_price(-25000), "-25.000");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&at()), "07/03/2025 09:05:01");
    }

    #[test]
    fn test_order_message_with_all_fields() {
        let order = PendingOrder {
            id: "o1".to_string(),
            key: "o1".to_string(),
            username: Some("alice".to_string()),
            product_name: Some("Mug".to_string()),
            total_price: 250000,
            created_at: OrderTime::At(at()),
        };

        let message = order_message(&order);
        assert!(message.starts_with("🛒 *NEW ORDER!*"));
        assert!(message.contains("*User:* alice"));
        assert!(message.contains("*Product:* Mug"));
        assert!(message.contains("250.000 VND"));
        assert!(message.contains("07/03/2025 09:05:01"));
    }

    #[test]
    fn test_order_message_missing_references() {
        let order = PendingOrder {
            id: "o2".to_string(),
            key: "o2".to_string(),
            username: None,
            product_name: None,
            total_price: 0,
            created_at: OrderTime::Raw("yesterday".to_string()),
        };

        let message = order_message(&order);
        assert!(message.contains("*User:* N/A"));
        assert!(message.contains("*Product:* N/A"));
        assert!(message.contains("*Time:* yesterday"));
    }

    #[test]
    fn test_product_message() {
        let product = SheetProduct {
            name: "Áo thun".to_string(),
            price: 150000,
            description: Some("Cotton".to_string()),
            image: "📦".to_string(),
        };

        let message = product_message(&product, at(), true);
        assert!(message.contains("Áo thun"));
        assert!(message.contains("150.000 VND"));
        assert!(message.contains("*Description:* Cotton"));
        assert!(message.contains("07/03/2025 09:05:01"));
        assert!(message.ends_with("Added to the catalogue!"));
    }

    #[test]
    fn test_product_message_without_price_or_description() {
        let product = SheetProduct::named("Gift card");

        let message = product_message(&product, at(), false);
        assert!(message.contains("*Price:* Contact"));
        assert!(!message.contains("Description"));
        assert!(!message.contains("catalogue"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("john_doe"), r"john\_doe");
        assert_eq!(escape_markdown("*[a]`"), r"\*\[a]\`");
        assert_eq!(escape_markdown("Áo thun"), "Áo thun");
    }

    #[test]
    fn test_free_text_is_escaped_in_messages() {
        let order = PendingOrder {
            id: "o3".to_string(),
            key: "o3".to_string(),
            username: Some("john_doe".to_string()),
            product_name: Some("T*shirt".to_string()),
            total_price: 1000,
            created_at: OrderTime::Raw("2025_01_02".to_string()),
        };
        let message = order_message(&order);
        assert!(message.contains(r"*User:* john\_doe"));
        assert!(message.contains(r"*Product:* T\*shirt"));
        assert!(message.contains(r"*Time:* 2025\_01\_02"));

        let mut product = SheetProduct::named("mug_large");
        product.description = Some("see [site]".to_string());
        let message = product_message(&product, at(), false);
        assert!(message.contains(r"*Name:* mug\_large"));
        assert!(message.contains(r"*Description:* see \[site]"));
    }
}
