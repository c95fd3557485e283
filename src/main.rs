use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use kintai_diff::{
    config::{Config, DisplayLocale, PairingStrategy},
    display::{describe_reconciliation, format_clock_time},
    parser,
    reconcile::{reconcile, reconcile_by_date},
};
use log::info;
use scraper::Html;
use serde_json::json;

#[derive(Parser)]
struct Opts {
    /// Saved HTML of the attendance comparison page.
    input_file: PathBuf,
    /// TOML file overriding the marker strings and display settings.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pairing: Option<PairingStrategy>,
    #[arg(long, value_enum)]
    locale: Option<DisplayLocale>,
    /// Print the result as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let mut config = Config::load(opts.config)?;
    if let Some(pairing) = opts.pairing {
        config.display.pairing = pairing;
    }
    if let Some(locale) = opts.locale {
        config.display.locale = locale;
    }

    let html = Html::parse_document(
        &fs_err::read_to_string(&opts.input_file).context("Failed to read the HTML file")?,
    );
    let page = parser::parse_with_config(&html, &config.extractor)
        .with_context(|| format!("Failed to parse {:?}", opts.input_file))?;
    info!(
        "Successfully parsed data for month: {} ({} entries)",
        page.month,
        page.entries.len()
    );
    let locale = config.display.locale;

    match config.display.pairing {
        PairingStrategy::Positional => {
            let (reconciliation, failure) = match reconcile(page.entries) {
                Ok(reconciliation) => (reconciliation, None),
                Err(e) => {
                    let message = e.to_string();
                    (e.into_partial(), Some(message))
                }
            };
            if opts.json {
                let value = json!({
                    "month": page.month,
                    "reconciliation": reconciliation,
                    "error": failure,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", page.month);
                print!("{}", describe_reconciliation(&reconciliation, locale));
            }
            if let Some(failure) = failure {
                bail!("Reconciliation stopped early: {failure}");
            }
        }
        PairingStrategy::ByDate => {
            let res = reconcile_by_date(page.entries);
            if opts.json {
                let value = json!({
                    "month": page.month,
                    "reconciliation": res.reconciliation(),
                    "unpaired": res.unpaired(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", page.month);
                print!("{}", describe_reconciliation(res.reconciliation(), locale));
                if !res.unpaired().is_empty() {
                    println!();
                    println!("相手のない記録 ({})", res.unpaired().len());
                    for entry in res.unpaired() {
                        println!(
                            "  {} {} {} ~ {}",
                            entry.date(),
                            entry.source_type(),
                            format_clock_time(entry.started_at()),
                            format_clock_time(entry.ended_at())
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
