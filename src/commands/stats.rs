//! Dataset-viewing command handlers: `pulse facets`, `pulse stats`, and
//! `pulse table`. Each one loads the dataset fresh, applies the requested
//! filters, and renders the result.

use crate::aggregate::{self, CategoryBucket, MonthlyBucket, Summary};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::filter::{self, Facets, FilterSelection};
use crate::model::SalesRecord;
use crate::{load, render, Config, Result};
use serde::Serialize;
use tracing::debug;

/// The structured aggregates behind the `pulse stats` view.
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub summary: Summary,
    pub monthly: Vec<MonthlyBucket>,
    pub category: Vec<CategoryBucket>,
}

/// Handles the `pulse facets` command: lists the years and suppliers present
/// in the dataset so the user knows what `--year` and `--supplier` accept.
pub async fn facets(config: &Config) -> Result<Out<Facets>> {
    let records = load_dataset(config).await?;
    let facets = filter::facets(&records, config.supplier_facet_cap());
    Ok(Out::new(render::facets_list(&facets), facets))
}

/// Handles the `pulse stats` command: totals, the monthly trend, and the
/// per-category breakdown over the filtered rows.
pub async fn stats(config: &Config, selection: &FilterSelection) -> Result<Out<StatsOutput>> {
    let records = load_filtered(config, selection).await?;
    let output = StatsOutput {
        summary: aggregate::summary(&records),
        monthly: aggregate::monthly(&records),
        category: aggregate::category(&records),
    };
    let message = format!(
        "{}\n{}\n{}",
        render::summary_cards(&output.summary),
        render::monthly_table(&output.monthly),
        render::category_bars(&output.category),
    );
    Ok(Out::new(message, output))
}

/// Handles the `pulse table` command: the filtered rows as a capped preview
/// table.
pub async fn table(config: &Config, selection: &FilterSelection) -> Result<Out<Vec<SalesRecord>>> {
    let records = load_filtered(config, selection).await?;
    Ok(Out::new(render::preview_table(&records), records))
}

async fn load_dataset(config: &Config) -> Result<Vec<SalesRecord>> {
    let records = load::load(config.dataset())
        .await
        .classify(ErrorType::Load)?;
    debug!("Loaded {} records from {}", records.len(), config.dataset());
    Ok(records)
}

async fn load_filtered(config: &Config, selection: &FilterSelection) -> Result<Vec<SalesRecord>> {
    let records = load_dataset(config).await?;
    let filtered = filter::apply(&records, selection);
    debug!("{} of {} records match the filters", filtered.len(), records.len());
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Facet;
    use crate::model::ItemType;
    use crate::test::TestEnv;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_facets_lists_years_and_suppliers() {
        let env = TestEnv::new().await;
        let out = facets(&env.config()).await.unwrap();
        let facets = out.structure().unwrap();
        assert_eq!(facets.years, vec!["2019", "2020"]);
        assert_eq!(
            facets.suppliers,
            vec![
                "Acme Beverage",
                "Crown Imports",
                "Highline Spirits",
                "Santa Vittoria"
            ]
        );
    }

    #[tokio::test]
    async fn test_stats_unfiltered_totals() {
        let env = TestEnv::new().await;
        let out = stats(&env.config(), &FilterSelection::default())
            .await
            .unwrap();
        let output = out.structure().unwrap();
        // The SODA row and the row with no year are dropped by the loader.
        assert_eq!(output.summary.total_records, 6);
        assert_eq!(output.summary.total_retail, dec!(44));
        assert_eq!(output.summary.total_warehouse, dec!(23));
        assert_eq!(output.summary.total_sales, dec!(67));
        assert!(out.message().contains("Total sales:"));
    }

    #[tokio::test]
    async fn test_stats_filtered_by_item_type() {
        let env = TestEnv::new().await;
        let selection = FilterSelection {
            item_type: Facet::Only(ItemType::Beer),
            ..FilterSelection::default()
        };
        let out = stats(&env.config(), &selection).await.unwrap();
        let output = out.structure().unwrap();
        assert_eq!(output.summary.total_records, 2);
        assert_eq!(output.summary.total_retail, dec!(13));
        let keys: Vec<&str> = output.monthly.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["2019-12", "2020-01"]);
        assert_eq!(output.category.len(), 1);
        assert_eq!(output.category[0].item_type, ItemType::Beer);
    }

    #[tokio::test]
    async fn test_table_filtered_by_supplier() {
        let env = TestEnv::new().await;
        let selection = FilterSelection {
            supplier: Facet::Only("Crown Imports".to_string()),
            ..FilterSelection::default()
        };
        let out = table(&env.config(), &selection).await.unwrap();
        let records = out.structure().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.supplier == "Crown Imports"));
    }

    #[tokio::test]
    async fn test_stats_unknown_headers_yield_zero_records() {
        let env = TestEnv::with_dataset("not,a,recognized,header\n1,2,3,4\n").await;
        let out = stats(&env.config(), &FilterSelection::default())
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap().summary.total_records, 0);
    }
}
