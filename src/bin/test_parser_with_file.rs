use std::path::PathBuf;

use clap::Parser;
use kintai_diff::parser;
use scraper::Html;

#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    let html = Html::parse_document(&fs_err::read_to_string(opts.input_file)?);
    let page = parser::parse(&html)?;
    println!("month = {}", page.month);
    for entry in &page.entries {
        println!("    {entry:?}");
    }
    Ok(())
}
