//! Header-synonym table and parsing of appended product rows.
//!
//! The product table is free-form: whoever maintains the spreadsheet may call
//! the price column "Price", "Giá" or "giá tiền". Header cells are normalized
//! (trimmed, lowercased) and looked up in a static table that maps every known
//! spelling to a [`ProductField`]. Columns whose header is not in the table are
//! ignored.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::models::{SheetProduct, DEFAULT_PRODUCT_IMAGE};

/// Product attribute a spreadsheet column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Name,
    Price,
    Description,
    Image,
}

/// Known header spellings, already normalized.
const HEADER_SYNONYMS: &[(ProductField, &[&str])] = &[
    (
        ProductField::Name,
        &["name", "tên", "ten", "tên sản phẩm", "ten san pham", "product name"],
    ),
    (
        ProductField::Price,
        &["price", "giá", "gia", "giá tiền", "gia tien"],
    ),
    (
        ProductField::Description,
        &["description", "mô tả", "mo ta", "chi tiết", "chi tiet"],
    ),
    (
        ProductField::Image,
        &["image", "icon", "hình", "hinh", "ảnh", "anh", "emoji"],
    ),
];

static HEADER_TABLE: OnceLock<HashMap<&'static str, ProductField>> = OnceLock::new();

fn header_table() -> &'static HashMap<&'static str, ProductField> {
    HEADER_TABLE.get_or_init(|| {
        HEADER_SYNONYMS
            .iter()
            .flat_map(|(field, names)| names.iter().map(move |name| (*name, *field)))
            .collect()
    })
}

/// Trim and lowercase a header cell.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Resolve a raw header cell to the field it feeds, if any.
pub fn field_for_header(header: &str) -> Option<ProductField> {
    header_table().get(normalize_header(header).as_str()).copied()
}

/// Extract the digits of a free-text price. No digits means 0.
///
/// Values too large for `u64` saturate.
pub fn parse_price(raw: &str) -> u64 {
    raw.chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d)))
}

/// Drop rows in which every cell is blank or whitespace.
pub fn non_blank_rows(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect()
}

/// Build a product from one data row using the header row.
///
/// `row_index` is the row's position among the non-blank rows (header = 0); it
/// only feeds the placeholder name used when neither a name column nor the
/// first cell yields one. When several columns map to the same field, the
/// right-most one wins.
pub fn parse_product_row(headers: &[String], row: &[String], row_index: usize) -> SheetProduct {
    let mut name: Option<String> = None;
    let mut price = 0;
    let mut description = None;
    let mut image = None;

    for (header, cell) in headers.iter().zip(row.iter()) {
        let Some(field) = field_for_header(header) else {
            continue;
        };
        let value = cell.trim();
        match field {
            ProductField::Name => {
                name = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            ProductField::Price => price = parse_price(value),
            ProductField::Description => {
                description = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            ProductField::Image => {
                image = Some(value.to_string()).filter(|v| !v.is_empty());
            }
        }
    }

    let name = name.unwrap_or_else(|| {
        row.first()
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Product {}", row_index + 1))
    });

    SheetProduct {
        name,
        price,
        description,
        image: image.unwrap_or_else(|| DEFAULT_PRODUCT_IMAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_header_matching_ignores_case_and_whitespace() {
        assert_eq!(field_for_header("  Giá  "), Some(ProductField::Price));
        assert_eq!(field_for_header("gia"), Some(ProductField::Price));
        assert_eq!(field_for_header("PRICE"), Some(ProductField::Price));
        assert_eq!(field_for_header("Tên Sản Phẩm"), Some(ProductField::Name));
        assert_eq!(field_for_header(" Mô tả"), Some(ProductField::Description));
        assert_eq!(field_for_header("Ảnh"), Some(ProductField::Image));
        assert_eq!(field_for_header("Icon"), Some(ProductField::Image));
        assert_eq!(field_for_header("Dấu thời gian"), None);
        assert_eq!(field_for_header(""), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1.000đ"), 1000);
        assert_eq!(parse_price("N/A"), 0);
        assert_eq!(parse_price(""), 0);
        assert_eq!(parse_price("150000"), 150000);
        assert_eq!(parse_price(&parse_price("150000").to_string()), 150000);
        assert_eq!(parse_price("1,250,000 VND"), 1_250_000);
        assert_eq!(parse_price("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_non_blank_rows() {
        let rows = vec![
            strings(&["Tên", "Giá"]),
            strings(&["", "  "]),
            vec![],
            strings(&["Mug", ""]),
        ];
        let kept = non_blank_rows(rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1][0], "Mug");
    }

    #[test]
    fn test_parse_full_row() {
        let headers = strings(&["Tên", "Giá", "Mô tả", "Ảnh"]);
        let row = strings(&["Áo thun", "150000", "Cotton", ""]);

        let product = parse_product_row(&headers, &row, 3);
        assert_eq!(product.name, "Áo thun");
        assert_eq!(product.price, 150000);
        assert_eq!(product.description.as_deref(), Some("Cotton"));
        assert_eq!(product.image, "📦");
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let headers = strings(&["Dấu thời gian", "Name", "Stock"]);
        let row = strings(&["01/01/2025", "Hat", "12"]);

        let product = parse_product_row(&headers, &row, 1);
        assert_eq!(product.name, "Hat");
        assert_eq!(product.price, 0);
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_name_falls_back_to_first_cell() {
        let headers = strings(&["Code", "Price"]);
        let row = strings(&[" SKU-1 ", "20.000"]);

        let product = parse_product_row(&headers, &row, 4);
        assert_eq!(product.name, "SKU-1");
        assert_eq!(product.price, 20000);
    }

    #[test]
    fn test_name_falls_back_to_placeholder() {
        let headers = strings(&["Code", "Price"]);
        let row = strings(&["  ", "5"]);

        let product = parse_product_row(&headers, &row, 4);
        assert_eq!(product.name, "Product 5");
    }

    #[test]
    fn test_blank_name_cell_is_unresolved() {
        let headers = strings(&["Code", "Name"]);
        let row = strings(&["X1", ""]);

        let product = parse_product_row(&headers, &row, 2);
        assert_eq!(product.name, "X1");
    }

    #[test]
    fn test_short_row_only_reads_present_cells() {
        let headers = strings(&["Name", "Price", "Description"]);
        let row = strings(&["Cap"]);

        let product = parse_product_row(&headers, &row, 1);
        assert_eq!(product.name, "Cap");
        assert_eq!(product.price, 0);
    }
}
