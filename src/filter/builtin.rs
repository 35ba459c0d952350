//! Hard-coded filters for pileup-style calls (samtools mpileup VCFv4.1).
//!
//! Terminology:
//!
//! * depth: number of reads covering the position
//! * depth_strand: number of those reads per strand
//! * ratio: share of one allele among the reads of a strand
//! * af1: allele frequency of the first ALT allele (1 is expected for haploid SNPs)
//!
//! See `Variant/Evaluator/Pseudosequence.pm` in sanger-pathogens/vr-codebase.

use itertools::Itertools;

use crate::record::Record;
use crate::types::{InfoValue, MISSING};

/// Verdict of a single check on one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(String),
    /// The check cannot be applied to this record; it does not discard it.
    Unusable(String),
}

/// Whether the call asserts an alternate allele, i.e. ALT is not `.`.
pub fn is_polymorphic<R: Record + ?Sized>(record: &R) -> bool {
    match record.alt_alleles().first() {
        Some(Some(alt)) => alt.trim() != MISSING,
        _ => false,
    }
}

/// Whether the call is an indel or lists several alleles.
pub fn is_indel<R: Record + ?Sized>(record: &R) -> bool {
    let alts = record.alt_alleles();
    record.ref_allele().contains(',')
        || alts.len() > 1
        || alts.iter().flatten().any(|alt| alt.contains(','))
        || record.info("INDEL").map_or(false, InfoValue::is_truthy)
}

/// AF1 must be at least `min_af1` at a polymorphic site and at most
/// `1 - min_af1` at a site confirming the reference.
pub fn is_valid_af1<R: Record + ?Sized>(record: &R, min_af1: f64) -> Verdict {
    let af1 = match record.info("AF1") {
        None => return Verdict::Pass,
        Some(info) => match info.first().and_then(|v| v.as_f64()) {
            Some(af1) => af1,
            None => return Verdict::Unusable(format!("AF1 `{}` is not numeric", info)),
        },
    };
    if is_polymorphic(record) {
        if af1 < min_af1 {
            return Verdict::Fail(format!("AF1 {} < {}", af1, min_af1));
        }
    } else if af1 > 1.0 - min_af1 {
        return Verdict::Fail(format!("AF1 {} > {} at a reference site", af1, 1.0 - min_af1));
    }
    Verdict::Pass
}

/// Strand-resolved depth counts `[ref_fwd, ref_rev, alt_fwd, alt_rev]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dp4 {
    pub ref_forward: f64,
    pub ref_reverse: f64,
    pub alt_forward: f64,
    pub alt_reverse: f64,
}

impl Dp4 {
    pub fn from_info(info: &InfoValue) -> Option<Self> {
        let values = match info {
            InfoValue::List(values) => values,
            _ => return None,
        };
        let (ref_forward, ref_reverse, alt_forward, alt_reverse) = values
            .iter()
            .take(4)
            .map(|v| v.as_f64())
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .collect_tuple()?;
        Some(Dp4 {
            ref_forward,
            ref_reverse,
            alt_forward,
            alt_reverse,
        })
    }

    fn ratio(count: f64, total: f64) -> f64 {
        if total > 0.0 {
            count / total
        } else {
            0.0
        }
    }

    /// Depth, per-strand counts and per-strand ratios of one allele.
    fn allele(&self, reference: bool) -> (f64, f64, f64, f64, f64) {
        let forward = self.ref_forward + self.alt_forward;
        let reverse = self.ref_reverse + self.alt_reverse;
        let (fwd, rev) = if reference {
            (self.ref_forward, self.ref_reverse)
        } else {
            (self.alt_forward, self.alt_reverse)
        };
        (
            fwd + rev,
            fwd,
            rev,
            Self::ratio(fwd, forward),
            Self::ratio(rev, reverse),
        )
    }
}

/// Depth and strand tests on DP4. A reference site is tested on the reference
/// counts, a polymorphic site on the alternate counts.
pub fn is_valid_dp4<R: Record + ?Sized>(
    record: &R,
    min_depth: u32,
    min_depth_strand: u32,
    min_ratio: f64,
) -> Verdict {
    let dp4 = match record.info("DP4") {
        None => return Verdict::Pass,
        Some(info) => match Dp4::from_info(info) {
            Some(dp4) => dp4,
            None => {
                return Verdict::Unusable(format!("DP4 `{}` is not four numbers", info));
            }
        },
    };
    let polymorphic = is_polymorphic(record);
    let allele = if polymorphic { "alternate" } else { "reference" };
    let (depth, forward, reverse, ratio_forward, ratio_reverse) = dp4.allele(!polymorphic);
    let min_depth = f64::from(min_depth);
    let min_depth_strand = f64::from(min_depth_strand);

    if depth < min_depth {
        return Verdict::Fail(format!("{} depth {} < {}", allele, depth, min_depth));
    }
    if forward < min_depth_strand {
        return Verdict::Fail(format!(
            "{} forward depth {} < {}",
            allele, forward, min_depth_strand
        ));
    }
    if reverse < min_depth_strand {
        return Verdict::Fail(format!(
            "{} reverse depth {} < {}",
            allele, reverse, min_depth_strand
        ));
    }
    if ratio_forward < min_ratio {
        return Verdict::Fail(format!(
            "{} forward ratio {:.3} < {}",
            allele, ratio_forward, min_ratio
        ));
    }
    if ratio_reverse < min_ratio {
        return Verdict::Fail(format!(
            "{} reverse ratio {:.3} < {}",
            allele, ratio_reverse, min_ratio
        ));
    }
    Verdict::Pass
}
