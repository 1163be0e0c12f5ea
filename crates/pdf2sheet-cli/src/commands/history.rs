//! History command - list processed invoices, newest first.

use clap::Args;
use console::style;

use pdf2sheet_core::{HistoryQuery, InvoiceStore};

use super::process::{format_csv, OutputFormat};
use super::{load_config, open_store};

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    /// Number of invoices to show
    #[arg(short = 'n', long, default_value = "10")]
    limit: usize,

    /// Show every invoice
    #[arg(long, conflicts_with = "limit")]
    all: bool,

    /// Filter by vendor or invoice number
    #[arg(short, long)]
    search: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn run(args: HistoryArgs, user: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let mut query = if args.all {
        HistoryQuery::default()
    } else {
        HistoryQuery::recent(args.limit)
    };
    if let Some(search) = args.search {
        query = query.with_search(search);
    }

    let records = store.list_invoices(user, &query)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Csv => print!("{}", format_csv(&records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("{} No invoices found.", style("ℹ").blue());
            }
            for record in &records {
                let status = if record.needs_mapping {
                    style("needs mapping".to_string()).yellow()
                } else {
                    style(record.status.to_string()).green()
                };
                println!(
                    "{:>5}  {}  {:<24} {:<20} {:>12}  {}",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.vendor,
                    record.invoice_no,
                    record.total,
                    status
                );
            }
        }
    }

    Ok(())
}
