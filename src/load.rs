//! Dataset loader: fetches the CSV resource and maps it to typed records.
//!
//! Rows that fail validation are dropped, never fail the load. Only an
//! unreachable or un-tabular resource produces an error.

use crate::model::{RowBuilder, SalesColumn, SalesRecord};
use crate::Result;
use anyhow::Context;
use std::path::Path;
use tracing::debug;

/// Loads the dataset from a local path or an `http(s)` URL. Fetched once per
/// invocation; there is no incremental or streaming path.
pub(crate) async fn load(resource: &str) -> Result<Vec<SalesRecord>> {
    let text = if resource.starts_with("http://") || resource.starts_with("https://") {
        fetch(resource).await?
    } else {
        crate::utils::read(Path::new(resource)).await?
    };
    parse_csv(&text)
}

async fn fetch(url: &str) -> Result<String> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to fetch dataset from {url}"))?
        .error_for_status()
        .with_context(|| format!("Dataset request to {url} was rejected"))?;
    response
        .text()
        .await
        .with_context(|| format!("Failed to read dataset body from {url}"))
}

/// Parses header-driven CSV text into validated records.
pub(crate) fn parse_csv(text: &str) -> Result<Vec<SalesRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    // Resolve each header cell to a known column once, up front.
    let headers = reader
        .headers()
        .context("The dataset could not be parsed as tabular data")?
        .clone();
    let columns: Vec<Option<SalesColumn>> =
        headers.iter().map(SalesColumn::from_header).collect();

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in reader.records() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                debug!("Dropping unreadable row: {e}");
                dropped += 1;
                continue;
            }
        };
        let mut builder = RowBuilder::default();
        for (ix, value) in row.iter().enumerate() {
            if let Some(Some(column)) = columns.get(ix) {
                builder.set(*column, value);
            }
        }
        match builder.finish() {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("Dropped {dropped} invalid rows while loading the dataset");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
YEAR,MONTH,ITEM TYPE,ITEM DESCRIPTION,SUPPLIER,RETAIL SALES,WAREHOUSE SALES
2020,1,BEER,Lager 6pk,Crown Imports,10,5
2020,1,WINE,Red Blend,Santa Vittoria,20,0
2020,2,SODA,Cola 12pk,Acme Beverage,5,5
,3,BEER,No Year Ale,Crown Imports,1,1
2020,,WINE,No Month Red,Santa Vittoria,1,1
2020,2,LIQUOR,Rye Whiskey,Highline Spirits,\"$1,234.00\",7
";

    #[test]
    fn test_parse_retains_only_valid_rows() {
        let records = parse_csv(SAMPLE).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| (1..=12).contains(&r.month)));
        assert!(records.iter().all(|r| !r.year.is_empty()));
        assert!(!records
            .iter()
            .any(|r| r.item_description == "Cola 12pk"));
    }

    #[test]
    fn test_parse_scenario_totals() {
        let records = parse_csv(
            "YEAR,MONTH,ITEM TYPE,RETAIL SALES,WAREHOUSE SALES\n\
             2020,1,BEER,10,5\n\
             2020,1,WINE,20,0\n",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_type, ItemType::Beer);
        assert_eq!(records[0].retail_sales, dec!(10));
        assert_eq!(records[1].warehouse_sales, dec!(0));
    }

    #[test]
    fn test_parse_quoted_currency_field() {
        let records = parse_csv(
            "YEAR,MONTH,ITEM TYPE,RETAIL SALES\n\
             2021,12,KEGS,\"$1,234\"\n",
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].retail_sales, dec!(1234));
        // Missing warehouse column defaults to zero.
        assert_eq!(records[0].warehouse_sales, dec!(0));
    }

    #[test]
    fn test_empty_input_is_a_load_error_or_empty() {
        // A headers-only file is valid tabular data with zero records.
        let records = parse_csv("YEAR,MONTH,ITEM TYPE\n").unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let result = load("/definitely/not/a/real/file.csv").await;
        assert!(result.is_err());
    }
}
