//! Rule keys: which INFO value a threshold is tested against.
//!
//! A key is a plain tag (`DP`), an indexed tag (`DP4[2]`) or a sum over
//! indexed elements of one tag (`sum(DP4[2],DP4[3])`).

use std::fmt;

use itertools::Itertools;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, map_res, opt};
use nom::multi::separated_list1;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;

use crate::errors::{Error, Result};
use crate::types::{InfoValue, Value};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum RuleKey {
    Field { tag: String, index: Option<usize> },
    Sum { tag: String, indices: Vec<usize> },
}

/// Outcome of looking a key up in a record's INFO.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Value(f64),
    /// The tag is absent from this record.
    Missing,
    /// The tag is present but cannot be tested, e.g. an index past the end.
    Unusable(String),
}

fn info_tag(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')(input)
}

fn index(input: &str) -> IResult<&str, usize> {
    delimited(
        char('['),
        delimited(multispace0, map_res(digit1, str::parse), multispace0),
        char(']'),
    )(input)
}

fn field(input: &str) -> IResult<&str, (&str, Option<usize>)> {
    delimited(multispace0, pair(info_tag, opt(index)), multispace0)(input)
}

fn sum_terms(input: &str) -> IResult<&str, Vec<(&str, usize)>> {
    preceded(
        terminated(tag("sum"), multispace0),
        delimited(
            char('('),
            separated_list1(
                one_of(",+"),
                delimited(multispace0, pair(info_tag, index), multispace0),
            ),
            char(')'),
        ),
    )(input)
}

impl RuleKey {
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.trim();
        if let Some((function, _)) = key.split_once('(') {
            if function.trim() != "sum" {
                return Err(Error::configuration(
                    key,
                    format!("unsupported function `{}`, only sum() is available", function.trim()),
                ));
            }
            let (_, terms) = all_consuming(sum_terms)(key).map_err(|_| {
                Error::configuration(key, "expected sum(TAG[i],TAG[j],...)")
            })?;
            let tag = terms[0].0;
            if let Some((other, _)) = terms.iter().find(|(t, _)| *t != tag) {
                return Err(Error::configuration(
                    key,
                    format!("sum() terms must share one tag, found `{}` and `{}`", tag, other),
                ));
            }
            return Ok(RuleKey::Sum {
                tag: tag.to_owned(),
                indices: terms.into_iter().map(|(_, i)| i).collect(),
            });
        }
        match all_consuming(field)(key) {
            Ok((_, (tag, index))) => Ok(RuleKey::Field {
                tag: tag.to_owned(),
                index,
            }),
            Err(_) if key.contains('[') => Err(Error::configuration(
                key,
                "index must be a non-negative integer in brackets, e.g. DP4[2]",
            )),
            Err(_) => Err(Error::configuration(key, "not a valid INFO tag")),
        }
    }

    /// The INFO tag this key reads.
    pub fn tag(&self) -> &str {
        match self {
            RuleKey::Field { tag, .. } | RuleKey::Sum { tag, .. } => tag,
        }
    }

    pub fn resolve(&self, info: Option<&InfoValue>) -> Resolution {
        let info = match info {
            Some(info) => info,
            None => return Resolution::Missing,
        };
        match self {
            RuleKey::Field { index, .. } => match info {
                // a single value has nothing to index into
                InfoValue::Scalar(v) => numeric(self, v),
                InfoValue::Flag => {
                    Resolution::Unusable(format!("{} is a flag, not a number", self.tag()))
                }
                InfoValue::List(values) => {
                    let i = index.unwrap_or(0);
                    match values.get(i) {
                        Some(v) => numeric(self, v),
                        None => out_of_range(self, i, values.len()),
                    }
                }
            },
            RuleKey::Sum { indices, .. } => {
                let values: &[Value] = match info {
                    InfoValue::Scalar(v) => std::slice::from_ref(v),
                    InfoValue::List(values) => values,
                    InfoValue::Flag => {
                        return Resolution::Unusable(format!(
                            "{} is a flag, not a number",
                            self.tag()
                        ))
                    }
                };
                let mut total = 0.0;
                for &i in indices {
                    match values.get(i).map(|v| numeric(self, v)) {
                        Some(Resolution::Value(v)) => total += v,
                        Some(other) => return other,
                        None => return out_of_range(self, i, values.len()),
                    }
                }
                Resolution::Value(total)
            }
        }
    }
}

fn numeric(key: &RuleKey, value: &Value) -> Resolution {
    match value.as_f64() {
        Some(v) => Resolution::Value(v),
        None => Resolution::Unusable(format!("{} value `{}` is not numeric", key, value)),
    }
}

fn out_of_range(key: &RuleKey, index: usize, len: usize) -> Resolution {
    Resolution::Unusable(format!(
        "index {} of {} is out of range for {} values (starts at zero)",
        index,
        key.tag(),
        len
    ))
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKey::Field { tag, index: None } => f.write_str(tag),
            RuleKey::Field {
                tag,
                index: Some(i),
            } => write!(f, "{}[{}]", tag, i),
            RuleKey::Sum { tag, indices } => write!(
                f,
                "sum({})",
                indices.iter().map(|i| format!("{}[{}]", tag, i)).join(",")
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dp4() -> InfoValue {
        InfoValue::List(vec![
            Value::Integer(10),
            Value::Integer(12),
            Value::Integer(3),
            Value::Integer(4),
        ])
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            RuleKey::parse("DP").unwrap(),
            RuleKey::Field {
                tag: "DP".into(),
                index: None
            }
        );
        assert_eq!(
            RuleKey::parse(" DP4[ 2 ] ").unwrap(),
            RuleKey::Field {
                tag: "DP4".into(),
                index: Some(2)
            }
        );
        assert_eq!(
            RuleKey::parse("sum(DP4[2],DP4[0])").unwrap(),
            RuleKey::Sum {
                tag: "DP4".into(),
                indices: vec![2, 0]
            }
        );
        assert_eq!(
            RuleKey::parse("sum(DP4[2]+DP4[3])").unwrap().to_string(),
            "sum(DP4[2],DP4[3])"
        );
    }

    #[test]
    fn test_parse_errors() {
        for key in &[
            "DP4[-1]",
            "DP4[x]",
            "DP4[2",
            "max(DP4[2],DP4[0])",
            "__import__('os')",
            "sum(DP4[2],PV4[0])",
            "sum(DP4)",
            "sum()",
            "DP 4",
            "",
        ] {
            let err = RuleKey::parse(key).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }), "{}", key);
        }
    }

    #[test]
    fn test_resolve() {
        let key = RuleKey::parse("DP4[2]").unwrap();
        assert_eq!(key.resolve(Some(&dp4())), Resolution::Value(3.0));
        assert_eq!(key.resolve(None), Resolution::Missing);

        // no index means the first element
        let key = RuleKey::parse("DP4").unwrap();
        assert_eq!(key.resolve(Some(&dp4())), Resolution::Value(10.0));

        // an index on a single value is ignored
        let key = RuleKey::parse("DP[3]").unwrap();
        let dp = InfoValue::Scalar(Value::Integer(42));
        assert_eq!(key.resolve(Some(&dp)), Resolution::Value(42.0));
    }

    #[test]
    fn test_resolve_sum() {
        let key = RuleKey::parse("sum(DP4[2],DP4[3])").unwrap();
        assert_eq!(key.resolve(Some(&dp4())), Resolution::Value(7.0));
    }

    #[test]
    fn test_unusable() {
        let key = RuleKey::parse("DP4[4]").unwrap();
        assert!(matches!(key.resolve(Some(&dp4())), Resolution::Unusable(_)));

        let key = RuleKey::parse("sum(DP4[0],DP4[9])").unwrap();
        assert!(matches!(key.resolve(Some(&dp4())), Resolution::Unusable(_)));

        let key = RuleKey::parse("EFF").unwrap();
        let eff = InfoValue::Scalar(Value::String("missense".into()));
        assert!(matches!(key.resolve(Some(&eff)), Resolution::Unusable(_)));

        let key = RuleKey::parse("INDEL").unwrap();
        assert!(matches!(key.resolve(Some(&InfoValue::Flag)), Resolution::Unusable(_)));
    }
}
