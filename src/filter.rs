//! Filter engine: facet derivation and pure AND filtering over loaded records.

use crate::model::{ItemType, SalesRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// One selectable filter dimension. `All` means no filtering on that facet.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum Facet<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Facet<T> {
    fn admits(&self, value: &T) -> bool {
        match self {
            Facet::All => true,
            Facet::Only(only) => only == value,
        }
    }
}

impl<T> From<Option<T>> for Facet<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Facet::Only(v),
            None => Facet::All,
        }
    }
}

/// The active selection across all three facets. Defaults to `All` everywhere,
/// meaning no filtering.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FilterSelection {
    pub item_type: Facet<ItemType>,
    pub year: Facet<String>,
    pub supplier: Facet<String>,
}

impl FilterSelection {
    /// True iff the record matches every non-`All` facet (logical AND, exact
    /// equality per facet).
    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.item_type.admits(&record.item_type)
            && self.year.admits(&record.year)
            && self.supplier.admits(&record.supplier)
    }
}

/// The selectable facet values derived from the loaded records.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Facets {
    /// Ascending. Lexicographic order is chronological for fixed-width years.
    pub years: Vec<String>,
    /// Lexicographic, truncated to the configured cap to bound presentation
    /// cost. A documented limitation, not a correctness rule.
    pub suppliers: Vec<String>,
}

/// Derives the selectable years and suppliers from `records`.
pub fn facets(records: &[SalesRecord], supplier_cap: usize) -> Facets {
    let mut years = BTreeSet::new();
    let mut suppliers = BTreeSet::new();
    for record in records {
        years.insert(record.year.clone());
        if !record.supplier.is_empty() {
            suppliers.insert(record.supplier.clone());
        }
    }
    let mut suppliers: Vec<String> = suppliers.into_iter().collect();
    suppliers.truncate(supplier_cap);
    Facets {
        years: years.into_iter().collect(),
        suppliers,
    }
}

/// Applies `selection` to `records`, preserving relative order. Pure: the same
/// inputs always produce the same output.
pub fn apply(records: &[SalesRecord], selection: &FilterSelection) -> Vec<SalesRecord> {
    records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(year: &str, month: u8, item_type: ItemType, supplier: &str) -> SalesRecord {
        SalesRecord {
            year: year.to_string(),
            month,
            item_type,
            item_description: String::new(),
            supplier: supplier.to_string(),
            retail_sales: Decimal::ONE,
            warehouse_sales: Decimal::ZERO,
        }
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            record("2019", 6, ItemType::Beer, "Crown Imports"),
            record("2020", 1, ItemType::Wine, "Santa Vittoria"),
            record("2020", 2, ItemType::Beer, "Crown Imports"),
            record("2020", 2, ItemType::Kegs, ""),
        ]
    }

    #[test]
    fn test_facets_sorted_and_capped() {
        let records = sample();
        let all = facets(&records, 50);
        assert_eq!(all.years, vec!["2019", "2020"]);
        assert_eq!(all.suppliers, vec!["Crown Imports", "Santa Vittoria"]);

        let capped = facets(&records, 1);
        assert_eq!(capped.suppliers, vec!["Crown Imports"]);
    }

    #[test]
    fn test_default_selection_keeps_everything() {
        let records = sample();
        let filtered = apply(&records, &FilterSelection::default());
        assert_eq!(filtered, records);
    }

    #[test]
    fn test_facets_and_together() {
        let records = sample();
        let selection = FilterSelection {
            item_type: Facet::Only(ItemType::Beer),
            year: Facet::Only("2020".to_string()),
            supplier: Facet::All,
        };
        let filtered = apply(&records, &selection);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].month, 2);
    }

    #[test]
    fn test_filtering_composes_as_and() {
        // apply(apply(R, S1), S2) == apply(R, S1 AND S2) for non-overlapping facets.
        let records = sample();
        let s1 = FilterSelection {
            year: Facet::Only("2020".to_string()),
            ..FilterSelection::default()
        };
        let s2 = FilterSelection {
            item_type: Facet::Only(ItemType::Beer),
            ..FilterSelection::default()
        };
        let combined = FilterSelection {
            year: Facet::Only("2020".to_string()),
            item_type: Facet::Only(ItemType::Beer),
            ..FilterSelection::default()
        };
        assert_eq!(apply(&apply(&records, &s1), &s2), apply(&records, &combined));
    }

    #[test]
    fn test_order_preserved() {
        let records = sample();
        let selection = FilterSelection {
            supplier: Facet::Only("Crown Imports".to_string()),
            ..FilterSelection::default()
        };
        let filtered = apply(&records, &selection);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].year, "2019");
        assert_eq!(filtered[1].year, "2020");
    }
}
