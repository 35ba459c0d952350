use std::collections::HashMap;

use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag};
use nom::character::complete::{char, digit1, none_of, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, rest, value};
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::IResult;

use crate::errors::{Error, Result};
use crate::types::{HeaderInfo, HeaderValue, InfoNumber};

pub(crate) fn info_number(input: &str) -> IResult<&str, InfoNumber> {
    all_consuming(alt((
        map(map_res(digit1, str::parse::<usize>), InfoNumber::Count),
        value(InfoNumber::AlternateAlleles, tag("A")),
        value(InfoNumber::Alleles, tag("R")),
        value(InfoNumber::Genotypes, tag("G")),
        value(InfoNumber::Unknown, tag(".")),
    )))(input)
}

fn string(input: &str) -> IResult<&str, &str> {
    delimited(
        char('"'),
        map(
            opt(escaped(none_of("\\\""), '\\', one_of("\\\""))),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn keys_and_values(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
        separated_pair(is_not("<,=>"), char('='), alt((string, is_not(",>"))))(input)
    }
    separated_list0(char(','), key_value)(input)
}

fn structured(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    all_consuming(delimited(char('<'), keys_and_values, char('>')))(input)
}

fn meta_line(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(tag("##"), separated_pair(is_not("="), char('='), rest))(input)
}

/// Parse one `##key=value` header line.
pub(crate) fn header_entry(line: &str) -> Result<(String, HeaderValue)> {
    let malformed = || Error::Header(format!("malformed meta line `{}`", line));
    let (_, (key, raw)) = meta_line(line).map_err(|_| malformed())?;
    let value = if raw.starts_with('<') {
        let (_, data) = structured(raw).map_err(|_| malformed())?;
        match key {
            "INFO" => HeaderValue::Info(HeaderInfo::try_from(data)?),
            _ => HeaderValue::Structured(
                data.into_iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect::<HashMap<_, _>>(),
            ),
        }
    } else {
        HeaderValue::String(raw.to_owned())
    };
    Ok((key.to_owned(), value))
}
