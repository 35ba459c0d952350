use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;
use strum::Display;

use crate::errors::{Error, Result};
use crate::filter::builtin::{is_indel, is_polymorphic, is_valid_af1, is_valid_dp4, Verdict};
use crate::filter::key::Resolution;
use crate::filter::FilterSpec;
use crate::record::Record;
use crate::writer::RecordSink;

/// Tag whose rules are not applied at reference sites.
const PV4: &str = "PV4";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum PassState {
    Idle,
    Scanning,
    Done,
}

/// Counts of one filter pass; `total == kept + filtered`.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct FilterResult {
    pub total: usize,
    pub filtered: usize,
    pub kept: usize,
}

/// Why a record was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    Quality { qual: f64, threshold: f64 },
    MissingQuality,
    Indel,
    Dp4(String),
    Af1(String),
    Rule(String),
    Malformed(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Quality { qual, threshold } => {
                write!(f, "QUAL {} below {}", qual, threshold)
            }
            Reason::MissingQuality => f.write_str("QUAL missing"),
            Reason::Indel => f.write_str("INDEL"),
            Reason::Dp4(reason) => write!(f, "DP4: {}", reason),
            Reason::Af1(reason) => write!(f, "AF1: {}", reason),
            Reason::Rule(rule) => write!(f, "rule {}", rule),
            Reason::Malformed(reason) => write!(f, "malformed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Keep,
    Discard(Reason),
}

impl Decision {
    pub fn is_kept(&self) -> bool {
        matches!(self, Decision::Keep)
    }
}

/// Decides, record by record, whether a variant call is kept.
#[derive(Debug, Clone)]
pub struct VariantFilter {
    spec: FilterSpec,
}

impl VariantFilter {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Apply, in order, the QUAL threshold, the indel, DP4 and AF1 filters,
    /// then every INFO rule. The first failing check discards the record.
    pub fn check<R: Record + ?Sized>(&self, record: &R) -> Decision {
        let spec = &self.spec;

        if let Some(threshold) = spec.qual_threshold() {
            match record.qual() {
                Some(qual) if qual < threshold => {
                    return Decision::Discard(Reason::Quality { qual, threshold })
                }
                Some(_) => {}
                None => return Decision::Discard(Reason::MissingQuality),
            }
        }

        if spec.apply_indel_filter() && is_indel(record) {
            return Decision::Discard(Reason::Indel);
        }

        if spec.apply_dp4_filter() && record.has_info("DP4") {
            match is_valid_dp4(
                record,
                spec.min_depth(),
                spec.min_depth_strand(),
                spec.min_ratio(),
            ) {
                Verdict::Pass => {}
                Verdict::Fail(reason) => return Decision::Discard(Reason::Dp4(reason)),
                Verdict::Unusable(reason) => warn_skipped(record, "DP4 filter", &reason),
            }
        }

        if spec.apply_af1_filter() && record.has_info("AF1") {
            match is_valid_af1(record, spec.min_af1()) {
                Verdict::Pass => {}
                Verdict::Fail(reason) => return Decision::Discard(Reason::Af1(reason)),
                Verdict::Unusable(reason) => warn_skipped(record, "AF1 filter", &reason),
            }
        }

        for rule in spec.info_rules() {
            let key = rule.key();
            if key.tag() == PV4 && !is_polymorphic(record) {
                continue;
            }
            match key.resolve(record.info(key.tag())) {
                Resolution::Value(value) => {
                    if rule.threshold().evaluate(value) {
                        return Decision::Discard(Reason::Rule(format!(
                            "{} ({}={})",
                            rule.text(),
                            key,
                            value
                        )));
                    }
                }
                Resolution::Missing => debug!(
                    "{}:{}: INFO/{} absent, rule {} not applied",
                    record.chrom(),
                    record.pos(),
                    key.tag(),
                    rule.text()
                ),
                Resolution::Unusable(reason) => warn_skipped(record, rule.text(), &reason),
            }
        }

        Decision::Keep
    }

    pub fn pass(&self) -> FilterPass<'_> {
        FilterPass {
            filter: self,
            state: PassState::Idle,
            result: FilterResult::default(),
        }
    }

    /// Filter `records` into `kept` and `discarded` in one pass.
    ///
    /// Lines the reader could not parse are counted as filtered and written to
    /// `discarded` as they were read; any other error ends the pass.
    pub fn run<I, R, K, D>(&self, records: I, kept: &mut K, discarded: &mut D) -> Result<FilterResult>
    where
        I: IntoIterator<Item = Result<R>>,
        R: Record,
        K: RecordSink<R>,
        D: RecordSink<R>,
    {
        let mut pass = self.pass();
        for item in records {
            pass.process(item, kept, discarded)?;
        }
        kept.finish()?;
        discarded.finish()?;
        pass.finish()
    }
}

fn warn_skipped<R: Record + ?Sized>(record: &R, check: &str, reason: &str) {
    warn!(
        "{}:{}: {} not applied: {}",
        record.chrom(),
        record.pos(),
        check,
        reason
    );
}

/// The state of one pass over a record stream.
pub struct FilterPass<'a> {
    filter: &'a VariantFilter,
    state: PassState,
    result: FilterResult,
}

impl<'a> FilterPass<'a> {
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Counts so far.
    pub fn result(&self) -> FilterResult {
        self.result
    }

    /// Route one item from the reader to `kept` or `discarded`.
    pub fn process<R, K, D>(
        &mut self,
        item: Result<R>,
        kept: &mut K,
        discarded: &mut D,
    ) -> Result<Decision>
    where
        R: Record,
        K: RecordSink<R>,
        D: RecordSink<R>,
    {
        match self.state {
            PassState::Done => return Err(Error::PassFinished),
            PassState::Idle => self.state = PassState::Scanning,
            PassState::Scanning => {}
        }
        let decision = match item {
            Ok(record) => {
                let decision = self.filter.check(&record);
                match &decision {
                    Decision::Keep => kept.write_record(&record)?,
                    Decision::Discard(reason) => {
                        debug!("{}:{}: filtered ({})", record.chrom(), record.pos(), reason);
                        discarded.write_record(&record)?;
                    }
                }
                decision
            }
            Err(Error::MalformedRecord {
                line_number,
                line,
                reason,
            }) => {
                warn!("line {}: {}; record discarded", line_number, reason);
                discarded.write_raw(&line)?;
                Decision::Discard(Reason::Malformed(reason))
            }
            Err(e) => return Err(e),
        };
        self.result.total += 1;
        if decision.is_kept() {
            self.result.kept += 1;
        } else {
            self.result.filtered += 1;
        }
        Ok(decision)
    }

    pub fn finish(&mut self) -> Result<FilterResult> {
        self.state = PassState::Done;
        let result = self.result;
        info!(
            "{} records, {} kept, {} filtered",
            result.total, result.kept, result.filtered
        );
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::VcfRecord;
    use crate::types::Header;

    fn record(alt: &str, qual: &str, info: &str) -> VcfRecord {
        let line = format!("chr1\t100\t.\tA\t{}\t{}\t.\t{}", alt, qual, info);
        VcfRecord::from_line(&line, &Header::default(), 1).unwrap()
    }

    fn filter(spec: crate::filter::FilterSpecBuilder) -> VariantFilter {
        VariantFilter::new(spec.build().unwrap())
    }

    #[test]
    fn test_nothing_configured_keeps_everything() {
        let filter = VariantFilter::new(FilterSpec::default());
        assert_eq!(filter.check(&record("G", ".", "DP=1")), Decision::Keep);
    }

    #[test]
    fn test_qual() {
        let filter = filter(FilterSpec::builder().qual_threshold(50.0));
        assert!(filter.check(&record("G", "50", ".")).is_kept());
        assert_eq!(
            filter.check(&record("G", "17.1", ".")),
            Decision::Discard(Reason::Quality {
                qual: 17.1,
                threshold: 50.0
            })
        );
        assert_eq!(
            filter.check(&record("G", ".", ".")),
            Decision::Discard(Reason::MissingQuality)
        );
    }

    #[test]
    fn test_order_of_checks() {
        let filter = filter(
            FilterSpec::builder()
                .qual_threshold(50.0)
                .indel_filter(true)
                .dp4_filter(true)
                .af1_filter(true)
                .rule("DP", "<30"),
        );
        // fails every check; QUAL comes first
        let bad = record("G,T", "10", "DP=3;DP4=0,0,0,0;AF1=0.1");
        assert!(matches!(filter.check(&bad), Decision::Discard(Reason::Quality { .. })));
        let bad = record("G,T", "60", "DP=3;DP4=0,0,0,0;AF1=0.1");
        assert_eq!(filter.check(&bad), Decision::Discard(Reason::Indel));
        let bad = record("G", "60", "DP=3;DP4=0,0,0,0;AF1=0.1");
        assert!(matches!(filter.check(&bad), Decision::Discard(Reason::Dp4(_))));
        let bad = record("G", "60", "DP=3;DP4=0,0,9,9;AF1=0.1");
        assert!(matches!(filter.check(&bad), Decision::Discard(Reason::Af1(_))));
        let bad = record("G", "60", "DP=3;DP4=0,0,9,9;AF1=1");
        assert!(matches!(filter.check(&bad), Decision::Discard(Reason::Rule(_))));
        assert!(filter
            .check(&record("G", "60", "DP=30;DP4=0,0,9,9;AF1=1"))
            .is_kept());
    }

    #[test]
    fn test_missing_dp4_is_kept() {
        let filter = filter(FilterSpec::builder().dp4_filter(true).af1_filter(true));
        assert!(filter.check(&record("G", "60", "DP=30")).is_kept());
    }

    #[test]
    fn test_builtin_filters_read_valued_tags() {
        let filter = filter(FilterSpec::builder().dp4_filter(true).af1_filter(true));
        let low_depth = record("G", "60", "DP4=0,0,1,1;AF1=1");
        assert!(low_depth.has_info("DP4"));
        assert!(matches!(filter.check(&low_depth), Decision::Discard(Reason::Dp4(_))));
        let low_af1 = record("G", "60", "DP4=0,0,9,9;AF1=0.5");
        assert!(low_af1.has_info("AF1"));
        assert!(matches!(filter.check(&low_af1), Decision::Discard(Reason::Af1(_))));
    }

    #[test]
    fn test_rules_in_order() {
        let filter = filter(
            FilterSpec::builder()
                .rule("MQ", "<30")
                .rule("DP4[2]", "<4")
                .rule("sum(DP4[2],DP4[3])", "<10"),
        );
        match filter.check(&record("G", "60", "MQ=20;DP4=1,1,1,1")) {
            Decision::Discard(Reason::Rule(rule)) => assert!(rule.starts_with("MQ<30")),
            other => panic!("unexpected decision {:?}", other),
        }
        match filter.check(&record("G", "60", "MQ=40;DP4=1,1,5,1")) {
            Decision::Discard(Reason::Rule(rule)) => {
                assert!(rule.starts_with("sum(DP4[2],DP4[3])<10"))
            }
            other => panic!("unexpected decision {:?}", other),
        }
        assert!(filter.check(&record("G", "60", "MQ=40;DP4=1,1,5,5")).is_kept());
    }

    #[test]
    fn test_unusable_values_skip_the_rule() {
        let filter = filter(
            FilterSpec::builder()
                .rule("DP4[7]", "<4")
                .rule("EFF", "<1")
                .rule("MQ", "<30"),
        );
        // absent, out of range and non-numeric: none of them discard
        assert!(filter
            .check(&record("G", "60", "DP4=1,1,1,1;EFF=missense"))
            .is_kept());
    }

    #[test]
    fn test_pv4_rules_skip_reference_sites() {
        let filter = filter(FilterSpec::builder().rule("PV4[0]", "<0.001"));
        assert!(filter
            .check(&record(".", "60", "PV4=0.0001,1,1,1"))
            .is_kept());
        assert!(!filter
            .check(&record("G", "60", "PV4=0.0001,1,1,1"))
            .is_kept());
    }

    #[test]
    fn test_pass() {
        let filter = filter(FilterSpec::builder().rule("DP", "<30"));
        let records = vec![
            Ok(record("G", "60", "DP=50")),
            Err(Error::MalformedRecord {
                line_number: 2,
                line: "chr1\t2\t.\tA\tC\tbad\t.\tDP=50".into(),
                reason: "QUAL `bad` is not numeric".into(),
            }),
            Ok(record("G", "60", "DP=10")),
            Ok(record("G", "60", "DP=30")),
        ];
        let (mut kept, mut discarded): (Vec<VcfRecord>, Vec<VcfRecord>) = (Vec::new(), Vec::new());
        let mut pass = filter.pass();
        assert_eq!(pass.state(), PassState::Idle);
        for item in records {
            pass.process(item, &mut kept, &mut discarded).unwrap();
            assert_eq!(pass.state(), PassState::Scanning);
        }
        let result = pass.finish().unwrap();
        assert_eq!(pass.state(), PassState::Done);
        assert_eq!(
            result,
            FilterResult {
                total: 4,
                filtered: 2,
                kept: 2
            }
        );
        assert_eq!(kept.len(), 2);
        // raw lines cannot be held by a Vec of records
        assert_eq!(discarded.len(), 1);
        assert!(matches!(
            pass.process(Ok(record("G", "60", "DP=50")), &mut kept, &mut discarded),
            Err(Error::PassFinished)
        ));
    }

    #[test]
    fn test_io_error_ends_the_pass() {
        let filter = VariantFilter::new(FilterSpec::default());
        let records: Vec<Result<VcfRecord>> = vec![
            Ok(record("G", "60", ".")),
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"))),
            Ok(record("G", "60", ".")),
        ];
        let (mut kept, mut discarded): (Vec<VcfRecord>, Vec<VcfRecord>) = (Vec::new(), Vec::new());
        assert!(matches!(
            filter.run(records, &mut kept, &mut discarded),
            Err(Error::Io(_))
        ));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_run_is_repeatable() {
        let filter = filter(
            FilterSpec::builder()
                .dp4_filter(true)
                .rule("DP", "<30|>500"),
        );
        let input = vec![
            record(".", "60", "DP=40;DP4=10,10,1,1"),
            record("G", "60", "DP=40;DP4=10,10,1,1"),
            record("G", "60", "DP=600;DP4=0,0,20,20"),
            record("G", "60", "DP=50;DP4=0,0,20,20"),
        ];
        let mut runs = Vec::new();
        for _ in 0..2 {
            let (mut kept, mut discarded): (Vec<VcfRecord>, Vec<VcfRecord>) = (Vec::new(), Vec::new());
            let result = filter
                .run(input.iter().cloned().map(Ok), &mut kept, &mut discarded)
                .unwrap();
            assert_eq!(result.total, result.kept + result.filtered);
            runs.push((result, kept, discarded));
        }
        assert_eq!(runs[0], runs[1]);
        assert_eq!(runs[0].0.kept, 2);
    }
}
