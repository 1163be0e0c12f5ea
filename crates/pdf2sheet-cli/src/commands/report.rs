//! Report command - usage statistics for a user.

use chrono::{Datelike, Utc};
use clap::Args;
use console::style;

use pdf2sheet_core::{build_report, HistoryQuery, InvoiceStore};

use super::{load_config, open_store};

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// Year for the monthly breakdown (default: current year)
    #[arg(short, long)]
    year: Option<i32>,

    /// Print JSON instead of a summary
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ReportArgs, user: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let records = store.list_invoices(user, &HistoryQuery::default())?;
    let year = args.year.unwrap_or_else(|| Utc::now().year());
    let report = build_report(&records, year);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", style(format!("Report for {}", user)).bold());
    println!("  Invoices:        {}", report.total_count);
    println!("  Total volume:    {}", report.total_volume);
    println!("  Avg confidence:  {:.1}%", report.average_confidence * 100.0);
    println!(
        "  Status:          {} processed, {} flagged, {} need mapping",
        style(report.processed).green(),
        style(report.flagged).red(),
        style(report.needs_mapping).yellow()
    );
    println!("  Est. hours saved: {:.1}h", report.hours_saved);
    println!();

    let max = report.monthly.iter().map(|m| m.count).max().unwrap_or(0).max(1);
    println!("{}", style(format!("Uploads in {}", report.year)).bold());
    for month in &report.monthly {
        let bar = "#".repeat(month.count * 30 / max);
        println!("  {}  {:>4}  {}", month.month, month.count, style(bar).cyan());
    }

    Ok(())
}
