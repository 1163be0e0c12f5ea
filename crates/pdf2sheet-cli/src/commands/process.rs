//! Process command - extract data from a single invoice file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use pdf2sheet_core::{InvoiceRecord, ProcessOutcome, SheetOutcome};

use super::{load_config, upload_file};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, or TXT with already decoded text)
    #[arg(required = true)]
    input: PathBuf,

    /// Sender e-mail the invoice arrived from
    #[arg(short, long)]
    sender: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence and warnings
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, user: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Extracting invoice data...");

    let outcome = upload_file(&config, user, args.sender.as_deref(), &args.input).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
        OutputFormat::Csv => format_csv(std::slice::from_ref(&outcome.record))?,
        OutputFormat::Text => format_text(&outcome),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if outcome.record.needs_mapping {
        eprintln!(
            "{} Vendor not recognised. Run 'pdf2sheet template save --sender {} --vendor <NAME>' to map it.",
            style("!").yellow(),
            outcome.record.sender_email
        );
    }
    if let SheetOutcome::Failed(reason) = &outcome.sheet {
        eprintln!("{} Sheet sync failed: {}", style("✗").red(), reason);
    }

    if args.show_confidence {
        eprintln!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            outcome.extraction.fields.confidence * 100.0
        );
        for warning in &outcome.extraction.warnings {
            eprintln!("{} {}", style("⚠").yellow(), warning);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render records as CSV with a header row.
pub fn format_csv(records: &[InvoiceRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "invoice_no",
        "date",
        "total",
        "vendor",
        "sender_email",
        "confidence",
        "status",
        "needs_mapping",
        "created_at",
    ])?;

    for record in records {
        wtr.write_record([
            &record.id.to_string(),
            &record.invoice_no,
            &record.date,
            &record.total.to_string(),
            &record.vendor,
            &record.sender_email,
            &format!("{:.2}", record.confidence),
            &record.status.to_string(),
            &record.needs_mapping.to_string(),
            &record.created_at.to_rfc3339(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &ProcessOutcome) -> String {
    let record = &outcome.record;
    let mut output = String::new();

    output.push_str(&format!("Invoice: {}\n", record.invoice_no));
    output.push_str(&format!("Date: {}\n", record.date));
    output.push_str(&format!("Vendor: {}\n", record.vendor));
    output.push_str(&format!("Total: {}\n", record.total));
    output.push('\n');
    output.push_str(&format!("Confidence: {:.0}%\n", record.confidence * 100.0));
    output.push_str(&format!("Status: {}\n", record.status));

    let sheet = match &outcome.sheet {
        SheetOutcome::Appended => "appended".to_string(),
        SheetOutcome::Skipped => "skipped (needs mapping)".to_string(),
        SheetOutcome::Disabled => "disabled".to_string(),
        SheetOutcome::Failed(reason) => format!("failed: {}", reason),
    };
    output.push_str(&format!("Sheet: {}\n", sheet));

    output
}
