use indexmap::IndexMap;
use itertools::Itertools;

use crate::errors::{Error, Result};
use crate::types::{Header, InfoValue, Value, MISSING};

/// Read access to a variant call, as needed by the filters.
pub trait Record {
    fn chrom(&self) -> &str;

    /// 1-based position, i.e. POS.
    fn pos(&self) -> u64;

    fn ref_allele(&self) -> &str;

    /// ALT alleles; a missing allele (`.`) is `None`.
    fn alt_alleles(&self) -> Vec<Option<&str>>;

    fn qual(&self) -> Option<f64>;

    fn info(&self, tag: &str) -> Option<&InfoValue>;

    /// Whether INFO carries `tag`, with or without a value.
    fn has_info(&self, tag: &str) -> bool {
        self.info(tag).is_some()
    }
}

/// A record of a plain-text VCF file.
///
/// The original line is kept next to the parsed columns, so a record that is
/// written back out is byte-identical to its input.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    chrom: String,
    pos: u64,
    id: Option<String>,
    ref_allele: String,
    alt_alleles: Vec<Option<String>>,
    qual: Option<f64>,
    filters: Vec<String>,
    info: IndexMap<String, InfoValue>,
    line: String,
}

fn missing_or<T>(raw: &str, f: impl FnOnce(&str) -> T) -> Option<T> {
    if raw == MISSING {
        None
    } else {
        Some(f(raw))
    }
}

impl VcfRecord {
    /// Parse one tab-separated data line. INFO values are typed with the
    /// definitions in `header` where available.
    pub fn from_line(line: &str, header: &Header, line_number: usize) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedRecord {
            line_number,
            line: line.to_owned(),
            reason,
        };
        let columns = line.split('\t').collect_vec();
        if columns.len() < 8 {
            return Err(malformed(format!(
                "expected at least 8 columns, found {}",
                columns.len()
            )));
        }
        let pos = columns[1]
            .parse()
            .map_err(|_| malformed(format!("POS `{}` is not a position", columns[1])))?;
        let qual = match missing_or(columns[5], str::parse::<f64>) {
            None => None,
            Some(Ok(qual)) => Some(qual),
            Some(Err(_)) => {
                return Err(malformed(format!("QUAL `{}` is not numeric", columns[5])));
            }
        };
        Ok(VcfRecord {
            chrom: columns[0].to_owned(),
            pos,
            id: missing_or(columns[2], str::to_owned),
            ref_allele: columns[3].to_owned(),
            alt_alleles: columns[4]
                .split(',')
                .map(|allele| missing_or(allele, str::to_owned))
                .collect(),
            qual,
            filters: missing_or(columns[6], |f| f.split(';').map(str::to_owned).collect())
                .unwrap_or_default(),
            info: parse_info(columns[7], header),
            line: line.to_owned(),
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn info_fields(&self) -> &IndexMap<String, InfoValue> {
        &self.info
    }

    /// The line this record was read from.
    pub fn line(&self) -> &str {
        &self.line
    }
}

fn parse_info(field: &str, header: &Header) -> IndexMap<String, InfoValue> {
    if field == MISSING {
        return IndexMap::new();
    }
    field
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            None => (entry.to_owned(), InfoValue::Flag),
            Some((key, raw)) => (key.to_owned(), parse_info_value(key, raw, header)),
        })
        .collect()
}

fn parse_info_value(key: &str, raw: &str, header: &Header) -> InfoValue {
    match header.info_definition(key) {
        Some(definition) if definition.is_flag() => InfoValue::Flag,
        Some(definition) => {
            let mut values = raw.split(',').map(|v| Value::typed(v, definition.kind()));
            if definition.is_scalar() && !raw.contains(',') {
                values.next().map_or(InfoValue::Flag, InfoValue::Scalar)
            } else {
                InfoValue::List(values.collect())
            }
        }
        // undeclared keys: a comma makes a list
        None if raw.contains(',') => InfoValue::List(raw.split(',').map(Value::infer).collect()),
        None => InfoValue::Scalar(Value::infer(raw)),
    }
}

impl Record for VcfRecord {
    fn chrom(&self) -> &str {
        &self.chrom
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    fn alt_alleles(&self) -> Vec<Option<&str>> {
        self.alt_alleles.iter().map(Option::as_deref).collect()
    }

    fn qual(&self) -> Option<f64> {
        self.qual
    }

    fn info(&self, tag: &str) -> Option<&InfoValue> {
        self.info.get(tag)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mpileup_header() -> Header {
        let mut header = Header::default();
        for line in [
            "##fileformat=VCFv4.1",
            r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Raw read depth">"#,
            r##"##INFO=<ID=DP4,Number=4,Type=Integer,Description="# high-quality ref-forward bases, ref-reverse, alt-forward and alt-reverse bases">"##,
            r#"##INFO=<ID=AF1,Number=1,Type=Float,Description="Max-likelihood estimate of the first ALT allele frequency">"#,
            r#"##INFO=<ID=INDEL,Number=0,Type=Flag,Description="Indicates that the variant is an INDEL.">"#,
        ] {
            header.push_meta_line(line).unwrap();
        }
        header
    }

    #[test]
    fn test_from_line() {
        let line = "AE003852\t5414\t.\tG\tA\t222\t.\tDP=179;AF1=1;DP4=0,0,93,82;MQ=60\tGT:PL:GQ\t1/1:255,255,0:99";
        let record = VcfRecord::from_line(line, &mpileup_header(), 12).unwrap();
        assert_eq!(record.chrom(), "AE003852");
        assert_eq!(record.pos(), 5414);
        assert_eq!(record.id(), None);
        assert_eq!(record.ref_allele(), "G");
        assert_eq!(record.alt_alleles(), vec![Some("A")]);
        assert_eq!(record.qual(), Some(222.0));
        assert!(record.filters().is_empty());
        assert_eq!(
            record.info("DP"),
            Some(&InfoValue::Scalar(Value::Integer(179)))
        );
        assert_eq!(
            record.info("AF1"),
            Some(&InfoValue::Scalar(Value::Float(1.0)))
        );
        assert_eq!(record.info("DP4").map(InfoValue::len), Some(4));
        // MQ is not declared, so its type is inferred
        assert_eq!(record.info("MQ"), Some(&InfoValue::Scalar(Value::Integer(60))));
        assert_eq!(record.line(), line);
    }

    #[test]
    fn test_flags_and_missing() {
        let line = "AE003852\t20799\trs1\tT\t.\t.\tPASS;q10\tINDEL;DP=17";
        let record = VcfRecord::from_line(line, &mpileup_header(), 1).unwrap();
        assert_eq!(record.id(), Some("rs1"));
        assert_eq!(record.alt_alleles(), vec![None]);
        assert_eq!(record.qual(), None);
        assert_eq!(record.filters(), ["PASS", "q10"]);
        assert!(record.has_info("INDEL"));
        assert!(!record.has_info("AF1"));
    }

    #[test]
    fn test_empty_info() {
        let record =
            VcfRecord::from_line("chr1\t1\t.\tA\tC\t5\t.\t.", &Header::default(), 1).unwrap();
        assert!(record.info_fields().is_empty());
    }

    #[test]
    fn test_malformed_qual() {
        let line = "AE003852\t20799\t.\tT\tG\thigh\t.\tDP=172";
        match VcfRecord::from_line(line, &mpileup_header(), 7) {
            Err(Error::MalformedRecord {
                line_number,
                line: raw,
                ..
            }) => {
                assert_eq!(line_number, 7);
                assert_eq!(raw, line);
            }
            other => panic!("expected a malformed record, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_columns() {
        let err = VcfRecord::from_line("chr1\t1\tA", &Header::default(), 3).unwrap_err();
        assert!(err.is_recoverable());
    }
}
