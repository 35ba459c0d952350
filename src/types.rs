use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;
use multimap::MultiMap;
use strum::{Display, EnumString};

use crate::errors::{Error, Result};
use crate::parser;

/// The VCF placeholder for an absent value.
pub(crate) const MISSING: &str = ".";

/// A single INFO value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Parse a raw value, trying integer, then float, then falling back to text.
    pub(crate) fn infer(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            Value::Integer(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            Value::Float(v)
        } else {
            Value::String(raw.to_owned())
        }
    }

    /// Parse a raw value according to the type declared in the header.
    /// Values that do not match their declared type are kept as text, so that
    /// rules on them can be reported and skipped rather than failing the line.
    pub(crate) fn typed(raw: &str, kind: &InfoType) -> Self {
        match kind {
            InfoType::Integer => raw
                .parse()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::String(raw.to_owned())),
            InfoType::Float => raw
                .parse()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::String(raw.to_owned())),
            InfoType::Flag | InfoType::Character | InfoType::String => {
                Value::String(raw.to_owned())
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// The contents of one INFO key: a bare flag, a single value, or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Flag,
    Scalar(Value),
    List(Vec<Value>),
}

impl InfoValue {
    pub fn len(&self) -> usize {
        match self {
            InfoValue::Flag => 0,
            InfoValue::Scalar(_) => 1,
            InfoValue::List(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First value, which is what a key without an index refers to.
    pub fn first(&self) -> Option<&Value> {
        match self {
            InfoValue::Flag => None,
            InfoValue::Scalar(v) => Some(v),
            InfoValue::List(values) => values.first(),
        }
    }

    /// Whether the value counts as "set" when used as a boolean, e.g. `INDEL`.
    pub fn is_truthy(&self) -> bool {
        match self {
            InfoValue::Flag => true,
            InfoValue::Scalar(v) => match v {
                Value::Integer(i) => *i != 0,
                Value::Float(x) => *x != 0.0,
                Value::String(s) => !s.is_empty(),
            },
            InfoValue::List(values) => !values.is_empty(),
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Flag => f.write_str("true"),
            InfoValue::Scalar(v) => write!(f, "{}", v),
            InfoValue::List(values) => write!(f, "[{}]", values.iter().join(",")),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, EnumString, Display)]
pub enum InfoType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum InfoNumber {
    Count(usize),
    Alleles,
    AlternateAlleles,
    Genotypes,
    Unknown,
}

#[derive(Debug, Getters, Clone, PartialEq)]
#[getset(get = "pub")]
pub struct HeaderInfo {
    id: String,
    number: InfoNumber,
    kind: InfoType,
    description: String,
    additional: HashMap<String, String>,
}

impl HeaderInfo {
    /// Whether values of this key are stored as a single value rather than a list.
    pub(crate) fn is_scalar(&self) -> bool {
        self.number == InfoNumber::Count(1)
    }

    pub(crate) fn is_flag(&self) -> bool {
        self.kind == InfoType::Flag || self.number == InfoNumber::Count(0)
    }
}

impl<'a> TryFrom<Vec<(&'a str, &'a str)>> for HeaderInfo {
    type Error = Error;

    fn try_from(data: Vec<(&'a str, &'a str)>) -> Result<Self> {
        let mut h: HashMap<_, _> = data.into_iter().collect();
        let mut mandatory = |key: &str| {
            h.remove(key)
                .ok_or_else(|| Error::Header(format!("INFO definition without {}", key)))
        };
        let id = mandatory("ID")?.to_owned();
        let number = mandatory("Number")?;
        let number = parser::info_number(number)
            .map(|(_, number)| number)
            .map_err(|_| Error::Header(format!("unknown Number `{}` for INFO/{}", number, id)))?;
        let kind = mandatory("Type")?;
        let kind = InfoType::from_str(kind)
            .map_err(|_| Error::Header(format!("unknown Type `{}` for INFO/{}", kind, id)))?;
        let description = h.remove("Description").unwrap_or_default().to_owned();
        Ok(HeaderInfo {
            id,
            number,
            kind,
            description,
            additional: h.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Info(HeaderInfo),
    Structured(HashMap<String, String>),
}

pub type Sample = String;

/// The tool a VCF file was produced with, as far as filtering is concerned.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum VcfFlavor {
    /// VCFv4.1 as written by samtools mpileup.
    #[strum(serialize = "mpileup")]
    Mpileup,
    /// VCFv4.2 as written by freebayes.
    #[strum(serialize = "freebayes")]
    Freebayes,
    #[strum(serialize = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Default, Getters)]
#[getset(get = "pub")]
pub struct Header {
    pub(crate) meta: MultiMap<String, HeaderValue>,
    pub(crate) info: IndexMap<String, HeaderInfo>,
    pub(crate) samples: Vec<Sample>,
    /// Header lines as read, including the `#CHROM` line, for writing out unchanged.
    pub(crate) lines: Vec<String>,
}

impl Header {
    /// The VCF version from `##fileformat`, e.g. `4.1`.
    pub fn version(&self) -> Option<&str> {
        match self.meta.get("fileformat") {
            Some(HeaderValue::String(s)) => Some(s.trim_start_matches("VCFv")),
            _ => None,
        }
    }

    /// The producing program from `##source`.
    pub fn source(&self) -> Option<&str> {
        match self.meta.get("source") {
            Some(HeaderValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn flavor(&self) -> VcfFlavor {
        match (self.version(), self.source()) {
            (Some("4.1"), _) => VcfFlavor::Mpileup,
            (Some("4.2"), Some(source)) if source.starts_with("freeBayes") => VcfFlavor::Freebayes,
            _ => VcfFlavor::Unknown,
        }
    }

    pub fn info_definition(&self, tag: &str) -> Option<&HeaderInfo> {
        self.info.get(tag)
    }

    pub(crate) fn push_meta_line(&mut self, line: &str) -> Result<()> {
        let (key, value) = parser::header_entry(line)?;
        if let HeaderValue::Info(info) = &value {
            self.info.insert(info.id().clone(), info.clone());
        }
        self.meta.insert(key, value);
        self.lines.push(line.to_owned());
        Ok(())
    }

    pub(crate) fn push_column_line(&mut self, line: &str) -> Result<()> {
        let columns = line.split('\t').collect_vec();
        if columns.len() < 8 || columns[0] != "#CHROM" {
            return Err(Error::Header(format!("malformed column line `{}`", line)));
        }
        self.samples = columns.iter().skip(9).map(|&s| s.to_owned()).collect();
        self.lines.push(line.to_owned());
        Ok(())
    }
}
