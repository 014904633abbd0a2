//! Text rendering for the dashboard views. All aggregation output funnels
//! through here so that the terminal presentation stays a thin layer over the
//! structured data the commands also emit.

use crate::aggregate::{CategoryBucket, MonthlyBucket, Summary};
use crate::filter::Facets;
use crate::model::SalesRecord;
use crate::vote::{TallyCounts, VoteStage};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt::Write;

/// Cap on the number of rows shown by `pulse table`.
pub(crate) const TABLE_PREVIEW_ROWS: usize = 100;

const BAR_WIDTH: usize = 30;

/// Formats a decimal as a whole number with thousands separators. Display
/// only; the underlying aggregates stay exact.
pub(crate) fn whole(value: Decimal) -> String {
    format_num::format_num!(",.0f", value.to_f64().unwrap_or_default())
}

pub(crate) fn summary_cards(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Records:         {}", whole(summary.total_records.into()));
    let _ = writeln!(out, "Retail sales:    {}", whole(summary.total_retail));
    let _ = writeln!(out, "Warehouse sales: {}", whole(summary.total_warehouse));
    let _ = writeln!(out, "Total sales:     {}", whole(summary.total_sales));
    out
}

pub(crate) fn monthly_table(buckets: &[MonthlyBucket]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:>14} {:>16} {:>8}", "Month", "Retail", "Warehouse", "Rows");
    for bucket in buckets {
        let year = bucket.key.split('-').next().unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<10} {:>14} {:>16} {:>8}",
            format!("{} {year}", bucket.label),
            whole(bucket.retail_total),
            whole(bucket.warehouse_total),
            bucket.count
        );
    }
    out
}

/// Renders each category's share of combined sales as a proportion bar.
pub(crate) fn category_bars(buckets: &[CategoryBucket]) -> String {
    let grand_total: Decimal = buckets.iter().map(|b| b.total).sum();
    let mut out = String::new();
    for bucket in buckets {
        let fraction = if grand_total.is_zero() {
            0.0
        } else {
            (bucket.total / grand_total).to_f64().unwrap_or_default()
        };
        let filled = (fraction * BAR_WIDTH as f64).round() as usize;
        let bar: String = "#".repeat(filled.min(BAR_WIDTH));
        let _ = writeln!(
            out,
            "{:<12} {:<width$} {:>5.1}%  {}",
            bucket.item_type.to_string(),
            bar,
            fraction * 100.0,
            whole(bucket.total),
            width = BAR_WIDTH
        );
    }
    out
}

/// Renders the filtered records as a table, capped at [`TABLE_PREVIEW_ROWS`]
/// with a truncation note.
pub(crate) fn preview_table(records: &[SalesRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<6} {:<12} {:<40} {:>12} {:>12}",
        "Year", "Month", "Type", "Item", "Retail", "Warehouse"
    );
    for record in records.iter().take(TABLE_PREVIEW_ROWS) {
        let mut item = record.item_description.clone();
        if item.len() > 40 {
            item.truncate(37);
            item.push_str("...");
        }
        let _ = writeln!(
            out,
            "{:<8} {:<6} {:<12} {:<40} {:>12} {:>12}",
            record.year,
            record.month,
            record.item_type.to_string(),
            item,
            whole(record.retail_sales),
            whole(record.warehouse_sales)
        );
    }
    if records.len() > TABLE_PREVIEW_ROWS {
        let _ = writeln!(
            out,
            "... {} more rows not shown (of {} matching)",
            records.len() - TABLE_PREVIEW_ROWS,
            records.len()
        );
    }
    out
}

pub(crate) fn facets_list(facets: &Facets) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Years:     {}", facets.years.join(", "));
    let _ = writeln!(out, "Suppliers: {}", facets.suppliers.len());
    for supplier in &facets.suppliers {
        let _ = writeln!(out, "  {supplier}");
    }
    out
}

/// One-line tally view with the support percentage and the viewer's own
/// standing.
pub(crate) fn tally_line(counts: &TallyCounts, stage: &VoteStage) -> String {
    let total = counts.support + counts.against;
    let viewer = match stage {
        VoteStage::Unauthenticated => "not signed in".to_string(),
        VoteStage::NoVote => "you have not voted".to_string(),
        VoteStage::Voted(kind) => format!("you voted {kind}"),
    };
    format!(
        "Was this dashboard helpful? {:.0}% support ({} support / {} against, {} total) [{viewer}]",
        counts.support_fraction() * 100.0,
        counts.support,
        counts.against,
        total
    )
}
