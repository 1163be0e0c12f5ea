//! CLI application for PDF2Sheet Auto.

mod commands;
mod sheet;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, history, process, report, template};

/// PDF2Sheet Auto - Turn invoice PDFs into spreadsheet rows
#[derive(Parser)]
#[command(name = "pdf2sheet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// User owning the invoices and templates
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single invoice file
    Process(process::ProcessArgs),

    /// Process multiple invoice files
    Batch(batch::BatchArgs),

    /// Manage vendor templates
    Template(template::TemplateArgs),

    /// List processed invoices
    History(history::HistoryArgs),

    /// Show usage statistics
    Report(report::ReportArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, &cli.user, config_path).await,
        Commands::Batch(args) => batch::run(args, &cli.user, config_path).await,
        Commands::Template(args) => template::run(args, &cli.user, config_path).await,
        Commands::History(args) => history::run(args, &cli.user, config_path).await,
        Commands::Report(args) => report::run(args, &cli.user, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
