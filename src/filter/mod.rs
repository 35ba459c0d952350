//! Filter configuration and the filtering engine.
//!
//! INFO rules pair a key with a threshold, using the DP tag as an example:
//!
//! ```text
//! DP<30         DP<=30        DP>30         DP>=30
//! DP<30|>60     DP>30&<60     DP4[2]<4      sum(DP4[2],DP4[3])<2
//! ```
//!
//! A record is discarded when the value of the key satisfies the threshold.

pub mod builtin;
pub mod engine;
pub mod key;
pub mod threshold;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
pub use engine::{Decision, FilterPass, FilterResult, PassState, Reason, VariantFilter};
pub use key::{Resolution, RuleKey};
pub use threshold::ThresholdExpr;

pub const DEFAULT_MIN_DEPTH: u32 = 4;
pub const DEFAULT_MIN_DEPTH_STRAND: u32 = 2;
pub const DEFAULT_MIN_RATIO: f64 = 0.75;
pub const DEFAULT_MIN_AF1: f64 = 0.95;

/// Filter settings as written by a user, e.g. in a YAML file.
///
/// ```yaml
/// qual_threshold: 50
/// apply_indel_filter: true
/// apply_dp4_filter: true
/// info_rules:
///   MQ: "<30"
///   PV4[0]: "<0.001"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub qual_threshold: Option<f64>,
    pub info_rules: IndexMap<String, String>,
    pub apply_indel_filter: bool,
    pub apply_af1_filter: bool,
    pub apply_dp4_filter: bool,
    pub min_depth: u32,
    pub min_depth_strand: u32,
    pub min_ratio: f64,
    pub min_af1: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            qual_threshold: None,
            info_rules: IndexMap::new(),
            apply_indel_filter: false,
            apply_af1_filter: false,
            apply_dp4_filter: false,
            min_depth: DEFAULT_MIN_DEPTH,
            min_depth_strand: DEFAULT_MIN_DEPTH_STRAND,
            min_ratio: DEFAULT_MIN_RATIO,
            min_af1: DEFAULT_MIN_AF1,
        }
    }
}

impl FilterConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_yaml::from_reader(reader)?)
    }
}

/// One INFO rule: discard a record when the value at `key` satisfies `threshold`.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct InfoRule {
    key: RuleKey,
    threshold: ThresholdExpr,
    /// The rule as configured, for messages.
    text: String,
}

impl InfoRule {
    pub fn new(key: &str, threshold: &str) -> Result<Self> {
        Ok(InfoRule {
            key: RuleKey::parse(key)?,
            threshold: ThresholdExpr::parse(threshold)?,
            text: format!("{}{}", key.trim(), threshold.trim()),
        })
    }
}

/// Split a rule written as one string, e.g. `DP4[2]>4&<1000`, into its key
/// and threshold at the first comparison operator.
pub fn parse_rule(rule: &str) -> Result<(String, String)> {
    match rule.find(|c: char| c == '<' || c == '>') {
        Some(0) => Err(Error::configuration(rule, "rule has no INFO key")),
        Some(at) => Ok((rule[..at].trim().to_owned(), rule[at..].trim().to_owned())),
        None => Err(Error::configuration(
            rule,
            "rule has no comparison operator (<, <=, >, >=)",
        )),
    }
}

/// Validated, immutable filter settings for a pass.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct FilterSpec {
    #[getset(get_copy = "pub")]
    qual_threshold: Option<f64>,
    #[getset(get = "pub")]
    info_rules: Vec<InfoRule>,
    #[getset(get_copy = "pub")]
    apply_indel_filter: bool,
    #[getset(get_copy = "pub")]
    apply_af1_filter: bool,
    #[getset(get_copy = "pub")]
    apply_dp4_filter: bool,
    #[getset(get_copy = "pub")]
    min_depth: u32,
    #[getset(get_copy = "pub")]
    min_depth_strand: u32,
    #[getset(get_copy = "pub")]
    min_ratio: f64,
    #[getset(get_copy = "pub")]
    min_af1: f64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec {
            qual_threshold: None,
            info_rules: Vec::new(),
            apply_indel_filter: false,
            apply_af1_filter: false,
            apply_dp4_filter: false,
            min_depth: DEFAULT_MIN_DEPTH,
            min_depth_strand: DEFAULT_MIN_DEPTH_STRAND,
            min_ratio: DEFAULT_MIN_RATIO,
            min_af1: DEFAULT_MIN_AF1,
        }
    }
}

impl FilterSpec {
    pub fn builder() -> FilterSpecBuilder {
        FilterSpecBuilder::default()
    }

    /// Validate a configuration. Every rule is parsed here, so a malformed
    /// one is reported before any record is read.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let info_rules = config
            .info_rules
            .iter()
            .map(|(key, threshold)| InfoRule::new(key, threshold))
            .collect::<Result<Vec<_>>>()?;
        if let Some(qual) = config.qual_threshold {
            if qual.is_nan() {
                return Err(Error::configuration("qual_threshold", "QUAL threshold is NaN"));
            }
        }
        if !(0.0..=1.0).contains(&config.min_ratio) {
            return Err(Error::configuration(
                format!("min_ratio={}", config.min_ratio),
                "must be between 0 and 1",
            ));
        }
        if !(0.0..=1.0).contains(&config.min_af1) {
            return Err(Error::configuration(
                format!("min_af1={}", config.min_af1),
                "must be between 0 and 1",
            ));
        }
        Ok(FilterSpec {
            qual_threshold: config.qual_threshold,
            info_rules,
            apply_indel_filter: config.apply_indel_filter,
            apply_af1_filter: config.apply_af1_filter,
            apply_dp4_filter: config.apply_dp4_filter,
            min_depth: config.min_depth,
            min_depth_strand: config.min_depth_strand,
            min_ratio: config.min_ratio,
            min_af1: config.min_af1,
        })
    }
}

impl TryFrom<&FilterConfig> for FilterSpec {
    type Error = Error;

    fn try_from(config: &FilterConfig) -> Result<Self> {
        FilterSpec::from_config(config)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSpecBuilder {
    config: FilterConfig,
}

impl FilterSpecBuilder {
    pub fn qual_threshold(mut self, qual: f64) -> Self {
        self.config.qual_threshold = Some(qual);
        self
    }

    pub fn rule(mut self, key: &str, threshold: &str) -> Self {
        self.config
            .info_rules
            .insert(key.to_owned(), threshold.to_owned());
        self
    }

    pub fn indel_filter(mut self, apply: bool) -> Self {
        self.config.apply_indel_filter = apply;
        self
    }

    pub fn af1_filter(mut self, apply: bool) -> Self {
        self.config.apply_af1_filter = apply;
        self
    }

    pub fn dp4_filter(mut self, apply: bool) -> Self {
        self.config.apply_dp4_filter = apply;
        self
    }

    pub fn min_depth(mut self, min_depth: u32) -> Self {
        self.config.min_depth = min_depth;
        self
    }

    pub fn min_depth_strand(mut self, min_depth_strand: u32) -> Self {
        self.config.min_depth_strand = min_depth_strand;
        self
    }

    pub fn min_ratio(mut self, min_ratio: f64) -> Self {
        self.config.min_ratio = min_ratio;
        self
    }

    pub fn min_af1(mut self, min_af1: f64) -> Self {
        self.config.min_af1 = min_af1;
        self
    }

    pub fn build(self) -> Result<FilterSpec> {
        FilterSpec::from_config(&self.config)
    }
}
