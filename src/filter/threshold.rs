//! Threshold expressions such as `<30`, `>=10&<60` or `<0.1|>0.9`.

use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::multispace0;
use nom::combinator::{all_consuming, map, value, verify};
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use strum::{Display, EnumString};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString)]
pub enum Comparator {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl Comparator {
    pub fn compare(self, value: f64, operand: f64) -> bool {
        match self {
            Comparator::Lt => value < operand,
            Comparator::Le => value <= operand,
            Comparator::Gt => value > operand,
            Comparator::Ge => value >= operand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clause {
    pub comparator: Comparator,
    pub operand: f64,
}

/// A parsed threshold. Clauses are joined either all by `&` or all by `|`.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdExpr {
    Clause(Clause),
    And(Box<ThresholdExpr>, Box<ThresholdExpr>),
    Or(Box<ThresholdExpr>, Box<ThresholdExpr>),
}

fn comparator(input: &str) -> IResult<&str, Comparator> {
    // two-character operators first
    alt((
        value(Comparator::Le, tag("<=")),
        value(Comparator::Lt, tag("<")),
        value(Comparator::Ge, tag(">=")),
        value(Comparator::Gt, tag(">")),
    ))(input)
}

fn clause(input: &str) -> IResult<&str, Clause> {
    all_consuming(delimited(
        multispace0,
        map(
            pair(
                comparator,
                preceded(multispace0, verify(double, |v: &f64| v.is_finite())),
            ),
            |(comparator, operand)| Clause {
                comparator,
                operand,
            },
        ),
        multispace0,
    ))(input)
}

impl ThresholdExpr {
    pub fn parse(expr: &str) -> Result<Self> {
        if expr.contains('&') && expr.contains('|') {
            return Err(Error::configuration(
                expr,
                "`&` and `|` cannot be combined in one threshold",
            ));
        }
        Self::parse_part(expr, expr)
    }

    fn parse_part(part: &str, whole: &str) -> Result<Self> {
        if let Some((left, right)) = part.split_once('&') {
            return Ok(ThresholdExpr::And(
                Box::new(Self::parse_part(left, whole)?),
                Box::new(Self::parse_part(right, whole)?),
            ));
        }
        if let Some((left, right)) = part.split_once('|') {
            return Ok(ThresholdExpr::Or(
                Box::new(Self::parse_part(left, whole)?),
                Box::new(Self::parse_part(right, whole)?),
            ));
        }
        clause(part).map(|(_, c)| ThresholdExpr::Clause(c)).map_err(|_| {
            let reason = if comparator(part.trim_start()).is_err() {
                format!("`{}` does not start with one of <, <=, >, >=", part.trim())
            } else {
                format!("`{}` is not a comparison with a number", part.trim())
            };
            Error::configuration(whole, reason)
        })
    }

    /// Whether `value` satisfies this threshold.
    pub fn evaluate(&self, value: f64) -> bool {
        match self {
            ThresholdExpr::Clause(c) => c.comparator.compare(value, c.operand),
            ThresholdExpr::And(left, right) => left.evaluate(value) && right.evaluate(value),
            ThresholdExpr::Or(left, right) => left.evaluate(value) || right.evaluate(value),
        }
    }
}

impl FromStr for ThresholdExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ThresholdExpr::parse(s)
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdExpr::Clause(c) => write!(f, "{}{}", c.comparator, c.operand),
            ThresholdExpr::And(left, right) => write!(f, "{}&{}", left, right),
            ThresholdExpr::Or(left, right) => write!(f, "{}|{}", left, right),
        }
    }
}

/// Parse `expr` and test `value` against it in one go.
pub fn evaluate(expr: &str, value: f64) -> Result<bool> {
    Ok(ThresholdExpr::parse(expr)?.evaluate(value))
}
