//! Results export and summary display
//!
//! Prints the pivot, ranking, per-region summary and cost estimate as
//! tables on stdout, and writes the flat record list to a timestamped CSV.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use tracing::info;
use vultr_latency_common::defaults::{INSTANCE_HOURLY_COST_USD, INSTANCE_MONTHLY_COST_USD};

use super::measurement::{pivot, region_summary, top_n, Measurement};

/// CSV header, in column order
pub const CSV_HEADER: [&str; 5] = ["Region", "Exchange", "Type", "Latency (ms)", "Timestamp"];

/// Export file name for a session started at `now` with the chosen duration
pub fn export_filename(now: NaiveDateTime, minutes: u64) -> String {
    format!(
        "vultr_latency_test_{}_{minutes}m.csv",
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Write records as CSV to `path`
pub fn write_csv(records: &[Measurement], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(CSV_HEADER)?;
    for record in records {
        let latency = format!("{:.2}", record.latency_ms);
        let timestamp = record.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        writer.write_record([
            record.region_name.as_str(),
            record.exchange.as_str(),
            record.category.as_ref(),
            latency.as_str(),
            timestamp.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the export into `dir`. Nothing is written when there are no records.
pub fn export(
    records: &[Measurement],
    dir: &Path,
    now: NaiveDateTime,
    minutes: u64,
) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(export_filename(now, minutes));
    write_csv(records, &path)?;

    info!(path = %path.display(), records = records.len(), "Results written");
    Ok(Some(path))
}

/// Cost of the session and of keeping its instances
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub instances: usize,
    pub test_minutes: u64,
}

impl CostEstimate {
    pub fn test_cost(&self) -> f64 {
        self.instances as f64 * INSTANCE_HOURLY_COST_USD * (self.test_minutes as f64 / 60.0)
    }

    pub fn monthly_cost(&self) -> f64 {
        self.instances as f64 * INSTANCE_MONTHLY_COST_USD
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().map(Cell::new).collect::<Vec<_>>());
    table
}

/// Render the exchange × region table. Empty cells show `-`.
pub fn render_pivot(records: &[Measurement]) -> Option<Table> {
    let pivot = pivot(records);
    if pivot.is_empty() {
        return None;
    }

    let mut header = vec!["Exchange"];
    header.extend(pivot.regions.iter().map(String::as_str));
    let mut table = new_table(header);

    for exchange in &pivot.exchanges {
        let mut row = vec![Cell::new(exchange)];
        row.extend(pivot.regions.iter().map(|region| {
            match pivot.get(exchange, region) {
                Some(value) => Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right),
                None => Cell::new("-").set_alignment(CellAlignment::Center),
            }
        }));
        table.add_row(row);
    }
    Some(table)
}

pub fn render_top_n(records: &[Measurement], n: usize) -> Option<Table> {
    let best = top_n(records, n);
    if best.is_empty() {
        return None;
    }

    let mut table = new_table(vec!["Region", "Exchange", "Type", "Latency (ms)"]);
    for record in best {
        table.add_row(vec![
            Cell::new(&record.region_name),
            Cell::new(&record.exchange),
            Cell::new(record.category),
            Cell::new(format!("{:.2}", record.latency_ms)).set_alignment(CellAlignment::Right),
        ]);
    }
    Some(table)
}

pub fn render_region_summary(records: &[Measurement]) -> Option<Table> {
    let summary = region_summary(records);
    if summary.is_empty() {
        return None;
    }

    let mut table = new_table(vec!["Region", "Samples", "Min (ms)", "Avg (ms)", "Max (ms)"]);
    for (region, stats) in &summary {
        table.add_row(vec![
            Cell::new(region),
            Cell::new(stats.count),
            Cell::new(format!("{:.2}", stats.min)),
            Cell::new(format!("{:.2}", stats.avg)),
            Cell::new(format!("{:.2}", stats.max)),
        ]);
    }
    Some(table)
}

/// Print every report section to stdout
pub fn print_report(records: &[Measurement], top: usize) {
    println!("\n=== Latency Results ===");

    println!("\nAverage latency (ms):");
    match render_pivot(records) {
        Some(table) => println!("{table}"),
        None => println!("No aggregated results to display."),
    }

    println!("\nTop {top} lowest latencies:");
    match render_top_n(records, top) {
        Some(table) => println!("{table}"),
        None => println!("No results available."),
    }

    if let Some(table) = render_region_summary(records) {
        println!("\nPer-region summary:");
        println!("{table}");
    }
}

pub fn print_cost_estimate(estimate: &CostEstimate) {
    println!("\nCost estimate:");
    println!(
        "  - Test (~{} min): ${:.2}",
        estimate.test_minutes,
        estimate.test_cost()
    );
    println!("  - Monthly (if kept): ${:.2}", estimate.monthly_cost());
}
