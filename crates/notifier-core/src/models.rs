//! Domain types shared by the stores, the detectors and the bot.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Image used for products whose row has no image/icon cell.
pub const DEFAULT_PRODUCT_IMAGE: &str = "📦";

/// Whether a recipient is a single person or a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecipientKind {
    #[default]
    User,
    Group,
}

impl RecipientKind {
    /// Label written to the users table.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::User => "User",
            RecipientKind::Group => "Group",
        }
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientKind {
    type Err = std::convert::Infallible;

    /// Anything that is not "group" (any case) reads as a user.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("group") {
            Ok(RecipientKind::Group)
        } else {
            Ok(RecipientKind::User)
        }
    }
}

/// A registered notification target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Opaque chat or group handle.
    pub id: String,
    /// Display name captured at registration.
    pub name: String,
    pub kind: RecipientKind,
}

impl Recipient {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: RecipientKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Creation time of an order as it came out of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTime {
    /// A real timestamp.
    At(DateTime<Utc>),
    /// Whatever else was stored, rendered verbatim.
    Raw(String),
}

/// An order that has not been announced yet, joined with its user and product.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    /// Identifier as shown in logs.
    pub id: String,
    /// Handle the store needs to find this order again. Opaque outside the
    /// store that produced it.
    pub key: String,
    /// `None` when the user reference did not resolve.
    pub username: Option<String>,
    /// `None` when the product reference did not resolve.
    pub product_name: Option<String>,
    pub total_price: i64,
    pub created_at: OrderTime,
}

/// A product parsed from a newly appended spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetProduct {
    pub name: String,
    /// Digits of the price cell; 0 when there were none.
    pub price: u64,
    pub description: Option<String>,
    pub image: String,
}

impl SheetProduct {
    /// A product with only a name; everything else takes its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: 0,
            description: None,
            image: DEFAULT_PRODUCT_IMAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_kind_round_trip_labels() {
        assert_eq!(RecipientKind::User.to_string(), "User");
        assert_eq!(RecipientKind::Group.to_string(), "Group");
        assert_eq!("group".parse::<RecipientKind>().unwrap(), RecipientKind::Group);
        assert_eq!(" Group ".parse::<RecipientKind>().unwrap(), RecipientKind::Group);
        assert_eq!("".parse::<RecipientKind>().unwrap(), RecipientKind::User);
        assert_eq!("whatever".parse::<RecipientKind>().unwrap(), RecipientKind::User);
    }

    #[test]
    fn test_named_product_defaults() {
        let product = SheetProduct::named("Mug");
        assert_eq!(product.price, 0);
        assert_eq!(product.description, None);
        assert_eq!(product.image, DEFAULT_PRODUCT_IMAGE);
    }
}
