//! Aggregation engine: three pure single-pass reducers over a filtered row set.
//!
//! All totals are exact `Decimal` sums. Display formatting (grouping
//! separators, zero decimals) happens in the render layer only.

use crate::model::{ItemType, SalesRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Human abbreviation for a month index. The loader guarantees 1..=12.
pub fn month_label(month: u8) -> &'static str {
    MONTH_ABBREVS[(month - 1) as usize]
}

/// One time-series accumulation cell, keyed by `"YEAR-MM"`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyBucket {
    pub key: String,
    pub label: String,
    pub retail_total: Decimal,
    pub warehouse_total: Decimal,
    pub count: usize,
}

/// Groups by `(year, zero-padded month)` and emits buckets ascending by key,
/// which is chronological order.
pub fn monthly(records: &[SalesRecord]) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<String, MonthlyBucket> = BTreeMap::new();
    for record in records {
        let key = record.month_key();
        let bucket = buckets.entry(key.clone()).or_insert_with(|| MonthlyBucket {
            key,
            label: month_label(record.month).to_string(),
            retail_total: Decimal::ZERO,
            warehouse_total: Decimal::ZERO,
            count: 0,
        });
        bucket.retail_total += record.retail_sales;
        bucket.warehouse_total += record.warehouse_sales;
        bucket.count += 1;
    }
    buckets.into_values().collect()
}

/// One category accumulation cell: summed retail + warehouse sales.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryBucket {
    pub item_type: ItemType,
    pub total: Decimal,
}

/// Groups by item type in first-seen order among the filtered rows (no sort).
pub fn category(records: &[SalesRecord]) -> Vec<CategoryBucket> {
    let mut buckets: Vec<CategoryBucket> = Vec::new();
    let mut index: HashMap<ItemType, usize> = HashMap::new();
    for record in records {
        match index.get(&record.item_type) {
            Some(&ix) => buckets[ix].total += record.total_sales(),
            None => {
                index.insert(record.item_type, buckets.len());
                buckets.push(CategoryBucket {
                    item_type: record.item_type,
                    total: record.total_sales(),
                });
            }
        }
    }
    buckets
}

/// Whole-set totals.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    pub total_records: usize,
    pub total_retail: Decimal,
    pub total_warehouse: Decimal,
    pub total_sales: Decimal,
}

pub fn summary(records: &[SalesRecord]) -> Summary {
    let mut out = Summary::default();
    for record in records {
        out.total_records += 1;
        out.total_retail += record.retail_sales;
        out.total_warehouse += record.warehouse_sales;
    }
    out.total_sales = out.total_retail + out.total_warehouse;
    out
}
