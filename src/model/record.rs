use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five product categories recognized in the dataset. A row whose
/// `ITEM TYPE` column holds anything else is dropped at load time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Beer,
    Wine,
    Liquor,
    Kegs,
    #[serde(rename = "NON-ALCOHOL")]
    NonAlcohol,
}

serde_plain::derive_display_from_serialize!(ItemType);
serde_plain::derive_fromstr_from_deserialize!(ItemType);

/// One validated row of the sales dataset. Created once at load time and
/// immutable thereafter.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SalesRecord {
    pub year: String,
    /// Always in 1..=12, enforced by the loader.
    pub month: u8,
    pub item_type: ItemType,
    pub item_description: String,
    pub supplier: String,
    pub retail_sales: Decimal,
    pub warehouse_sales: Decimal,
}

impl SalesRecord {
    /// The `"YEAR-MM"` grouping key, zero-padded so lexicographic order is
    /// chronological order.
    pub fn month_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    pub fn total_sales(&self) -> Decimal {
        self.retail_sales + self.warehouse_sales
    }
}

/// The columns of the dataset that we consume. Headers not listed here are
/// ignored rather than rejected.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesColumn {
    Year,
    Month,
    ItemType,
    ItemDescription,
    Supplier,
    RetailSales,
    WarehouseSales,
}

serde_plain::derive_display_from_serialize!(SalesColumn);

impl SalesColumn {
    /// Maps a header cell to a known column. Returns `None` for headers we do
    /// not consume.
    pub fn from_header(header: impl AsRef<str>) -> Option<SalesColumn> {
        match header.as_ref().trim() {
            YEAR_STR => Some(SalesColumn::Year),
            MONTH_STR => Some(SalesColumn::Month),
            ITEM_TYPE_STR => Some(SalesColumn::ItemType),
            ITEM_DESCRIPTION_STR => Some(SalesColumn::ItemDescription),
            SUPPLIER_STR => Some(SalesColumn::Supplier),
            RETAIL_SALES_STR => Some(SalesColumn::RetailSales),
            WAREHOUSE_SALES_STR => Some(SalesColumn::WarehouseSales),
            _ => None,
        }
    }
}

/// Accumulates the cells of one CSV row, then validates into a `SalesRecord`.
///
/// Validation per the dataset contract: year, month, and item type must be
/// present (month parsing to 1..=12, item type one of the five recognized
/// values) or the whole row is dropped. The two sales figures never fail a
/// row; they default to zero when missing or non-numeric.
#[derive(Debug, Default)]
pub(crate) struct RowBuilder {
    year: Option<String>,
    month: Option<u8>,
    item_type: Option<ItemType>,
    item_description: String,
    supplier: String,
    retail_sales: Decimal,
    warehouse_sales: Decimal,
}

impl RowBuilder {
    pub(crate) fn set(&mut self, column: SalesColumn, value: &str) {
        let value = value.trim();
        match column {
            SalesColumn::Year => {
                if !value.is_empty() {
                    self.year = Some(value.to_string());
                }
            }
            SalesColumn::Month => {
                self.month = value.parse::<u8>().ok().filter(|m| (1..=12).contains(m));
            }
            SalesColumn::ItemType => self.item_type = ItemType::from_str(value).ok(),
            SalesColumn::ItemDescription => self.item_description = value.to_string(),
            SalesColumn::Supplier => self.supplier = value.to_string(),
            SalesColumn::RetailSales => self.retail_sales = parse_sales_number(value),
            SalesColumn::WarehouseSales => self.warehouse_sales = parse_sales_number(value),
        }
    }

    /// Returns `None` when a required field is missing or unrecognized.
    pub(crate) fn finish(self) -> Option<SalesRecord> {
        Some(SalesRecord {
            year: self.year?,
            month: self.month?,
            item_type: self.item_type?,
            item_description: self.item_description,
            supplier: self.supplier,
            retail_sales: self.retail_sales,
            warehouse_sales: self.warehouse_sales,
        })
    }
}

/// Parses a sales figure that may carry a dollar sign or thousands separators.
/// Anything unparsable becomes zero, never an error.
fn parse_sales_number(value: &str) -> Decimal {
    let cleaned = value.trim().trim_start_matches('$').replace(',', "");
    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

pub(super) const YEAR_STR: &str = "YEAR";
pub(super) const MONTH_STR: &str = "MONTH";
pub(super) const ITEM_TYPE_STR: &str = "ITEM TYPE";
pub(super) const ITEM_DESCRIPTION_STR: &str = "ITEM DESCRIPTION";
pub(super) const SUPPLIER_STR: &str = "SUPPLIER";
pub(super) const RETAIL_SALES_STR: &str = "RETAIL SALES";
pub(super) const WAREHOUSE_SALES_STR: &str = "WAREHOUSE SALES";

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_item_type_round_trip() {
        assert_eq!(ItemType::from_str("BEER").unwrap(), ItemType::Beer);
        assert_eq!(ItemType::from_str("NON-ALCOHOL").unwrap(), ItemType::NonAlcohol);
        assert_eq!(ItemType::NonAlcohol.to_string(), "NON-ALCOHOL");
        assert!(ItemType::from_str("SODA").is_err());
    }

    #[test]
    fn test_from_header() {
        assert_eq!(SalesColumn::from_header("YEAR"), Some(SalesColumn::Year));
        assert_eq!(
            SalesColumn::from_header(" WAREHOUSE SALES "),
            Some(SalesColumn::WarehouseSales)
        );
        assert_eq!(SalesColumn::from_header("UNRELATED"), None);
    }

    #[test]
    fn test_parse_sales_number() {
        assert_eq!(parse_sales_number("10"), dec!(10));
        assert_eq!(parse_sales_number("$1,234.50"), dec!(1234.50));
        assert_eq!(parse_sales_number("-3.25"), dec!(-3.25));
        assert_eq!(parse_sales_number(""), Decimal::ZERO);
        assert_eq!(parse_sales_number("n/a"), Decimal::ZERO);
    }

    #[test]
    fn test_row_builder_valid() {
        let mut builder = RowBuilder::default();
        builder.set(SalesColumn::Year, "2020");
        builder.set(SalesColumn::Month, "1");
        builder.set(SalesColumn::ItemType, "WINE");
        builder.set(SalesColumn::Supplier, "Santa Vittoria");
        builder.set(SalesColumn::RetailSales, "20");
        let record = builder.finish().unwrap();
        assert_eq!(record.month_key(), "2020-01");
        assert_eq!(record.total_sales(), dec!(20));
    }

    #[test]
    fn test_row_builder_rejects_missing_required_fields() {
        let mut builder = RowBuilder::default();
        builder.set(SalesColumn::Month, "1");
        builder.set(SalesColumn::ItemType, "WINE");
        assert!(builder.finish().is_none());

        let mut builder = RowBuilder::default();
        builder.set(SalesColumn::Year, "2020");
        builder.set(SalesColumn::Month, "13");
        builder.set(SalesColumn::ItemType, "WINE");
        assert!(builder.finish().is_none());

        let mut builder = RowBuilder::default();
        builder.set(SalesColumn::Year, "2020");
        builder.set(SalesColumn::Month, "1");
        builder.set(SalesColumn::ItemType, "SODA");
        assert!(builder.finish().is_none());
    }
}
