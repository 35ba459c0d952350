//! Command-line interface of the `vcf-filter` binary.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::errors::Result;
use crate::filter::{parse_rule, FilterConfig, FilterSpec};

/// Filter variant calls in a VCF file by QUAL, INFO rules and built-in
/// pileup filters.
///
/// ```rust
/// use clap::Parser;
/// let args = vcf_filter::cli::Cli::parse_from([
///     "vcf-filter", "calls.vcf", "-o", "out.vcf", "--qual", "50", "--rule", "DP<30",
/// ]);
/// assert_eq!(args.rule, ["DP<30"]);
/// ```
#[derive(Debug, Parser)]
#[clap(name = "vcf-filter", author, version)]
#[clap(about = "Filter variant calls in a VCF file.")]
#[clap(after_help = "Rules discard a record when the INFO value satisfies the threshold, \
e.g. 'DP<30', 'DP<30|>1000', 'DP4[2]<4' or 'sum(DP4[2],DP4[3])<4'.")]
pub struct Cli {
    /// Input VCF, plain or gzip-compressed.
    pub input: PathBuf,

    /// Where to write the records that pass.
    #[clap(short, long)]
    pub output: PathBuf,

    /// Where to write the discarded records.
    #[clap(short, long)]
    pub filtered: Option<PathBuf>,

    /// YAML file with filter settings; command-line options take precedence.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Discard records with a QUAL below this value.
    #[clap(short, long)]
    pub qual: Option<f64>,

    /// INFO rule, may be given several times.
    #[clap(short, long)]
    pub rule: Vec<String>,

    /// Discard indels and multi-allelic records.
    #[clap(long)]
    pub indel: bool,

    /// Apply the AF1 filter.
    #[clap(long)]
    pub af1: bool,

    /// Apply the DP4 filter.
    #[clap(long)]
    pub dp4: bool,

    #[clap(long)]
    pub min_depth: Option<u32>,

    #[clap(long)]
    pub min_depth_strand: Option<u32>,

    #[clap(long)]
    pub min_ratio: Option<f64>,

    #[clap(long)]
    pub min_af1: Option<f64>,

    /// Filter files of an untested VCF flavor.
    #[clap(long)]
    pub force: bool,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    pub verbosity: Verbosity,
}

impl Cli {
    /// Settings from `--config`, overridden by the options given.
    pub fn filter_config(&self) -> Result<FilterConfig> {
        let mut config = match &self.config {
            Some(path) => FilterConfig::from_yaml_path(path)?,
            None => FilterConfig::default(),
        };
        if self.qual.is_some() {
            config.qual_threshold = self.qual;
        }
        for rule in &self.rule {
            let (key, threshold) = parse_rule(rule)?;
            config.info_rules.insert(key, threshold);
        }
        config.apply_indel_filter |= self.indel;
        config.apply_af1_filter |= self.af1;
        config.apply_dp4_filter |= self.dp4;
        if let Some(min_depth) = self.min_depth {
            config.min_depth = min_depth;
        }
        if let Some(min_depth_strand) = self.min_depth_strand {
            config.min_depth_strand = min_depth_strand;
        }
        if let Some(min_ratio) = self.min_ratio {
            config.min_ratio = min_ratio;
        }
        if let Some(min_af1) = self.min_af1 {
            config.min_af1 = min_af1;
        }
        Ok(config)
    }

    pub fn filter_spec(&self) -> Result<FilterSpec> {
        FilterSpec::from_config(&self.filter_config()?)
    }
}

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Verbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // lowercase, as RUST_LOG expects
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}
