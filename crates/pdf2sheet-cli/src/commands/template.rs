//! Template command - save and inspect per-sender vendor templates.

use clap::{Args, Subcommand};
use console::style;

use pdf2sheet_core::models::template::normalize_sender;
use pdf2sheet_core::{ColumnMapping, TemplateStore, TemplateSync};

use super::{load_config, open_store};

/// Arguments for the template command.
#[derive(Args)]
pub struct TemplateArgs {
    #[command(subcommand)]
    command: TemplateCommand,
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Save a template and relabel past uploads from the sender
    Save {
        /// Sender e-mail the template applies to
        #[arg(short, long)]
        sender: String,

        /// Vendor name to assign
        #[arg(long)]
        vendor: String,

        /// Column mapping entry, e.g. "total=Amount" (repeatable)
        #[arg(short, long = "map", value_name = "FIELD=COLUMN")]
        mapping: Vec<ColumnMapping>,
    },

    /// Show the template for a sender
    Show {
        /// Sender e-mail
        #[arg(short, long)]
        sender: String,
    },

    /// List all templates
    List,
}

pub async fn run(args: TemplateArgs, user: &str, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    match args.command {
        TemplateCommand::Save {
            sender,
            vendor,
            mapping,
        } => {
            let outcome =
                TemplateSync::from_config(&config.sync).save(&store, user, &sender, &vendor, mapping)?;

            println!(
                "{} Saved template for {} as {} (version {})",
                style("✓").green(),
                outcome.template.sender_email,
                outcome.template.vendor_name,
                outcome.template.version
            );
            match &outcome.reconcile_error {
                None => println!("   {} past invoice(s) updated", outcome.upgraded),
                Some(e) => eprintln!(
                    "{} Template saved, but past invoices were not updated: {}",
                    style("!").yellow(),
                    e
                ),
            }
        }
        TemplateCommand::Show { sender } => {
            let sender = normalize_sender(&sender);
            match store.find_template(user, &sender)? {
                Some(template) => println!("{}", serde_json::to_string_pretty(&template)?),
                None => anyhow::bail!("No template saved for {}", sender),
            }
        }
        TemplateCommand::List => {
            let templates = store.list_templates(user)?;
            if templates.is_empty() {
                println!("{} No templates saved yet.", style("ℹ").blue());
            }
            for template in &templates {
                let columns: Vec<String> = template
                    .mapping
                    .iter()
                    .map(|m| format!("{}={}", m.field, m.column))
                    .collect();
                println!(
                    "{:<32} {:<24} v{:<3} {}",
                    template.sender_email,
                    template.vendor_name,
                    template.version,
                    columns.join(", ")
                );
            }
        }
    }

    Ok(())
}
