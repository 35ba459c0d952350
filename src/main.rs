use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use vcf_filter::cli::Cli;
use vcf_filter::filter_vcf;

fn main() -> Result<()> {
    let args = Cli::parse();

    // RUST_LOG, when set, wins over --verbosity
    env_logger::Builder::from_env(Env::default().default_filter_or(args.verbosity.to_string()))
        .init();

    let spec = args.filter_spec().context("invalid filter settings")?;
    let result = filter_vcf(
        &args.input,
        &args.output,
        args.filtered.as_ref(),
        &spec,
        args.force,
    )
    .with_context(|| format!("failed to filter {}", args.input.display()))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
