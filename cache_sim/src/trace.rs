use std::io::Read;

use anyhow::Result;
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{digit1, hex_digit1, oct_digit1},
    combinator::{all_consuming, map},
    sequence::preceded,
    IResult,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("`{0}` is not an address")]
    Malformed(String),
    #[error("`{0}` does not fit in 64 bits")]
    Overflow(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {source}")]
pub struct TraceError {
    pub line: usize,
    #[source]
    pub source: LiteralError,
}

fn is_bin_digit(c: char) -> bool {
    c == '0' || c == '1'
}

/// radix and digits of an unsigned literal
fn literal(input: &str) -> IResult<&str, (u32, &str)> {
    alt((
        map(preceded(tag_no_case("0x"), hex_digit1), |d| (16, d)),
        map(preceded(tag_no_case("0o"), oct_digit1), |d| (8, d)),
        map(preceded(tag_no_case("0b"), take_while1(is_bin_digit)), |d| {
            (2, d)
        }),
        map(digit1, |d| (10, d)),
    ))(input)
}

/// Parses one address literal: `0x` hex, `0o` octal, `0b` binary or decimal.
pub fn parse_address(token: &str) -> Result<u64, LiteralError> {
    let (_, (radix, digits)) =
        all_consuming(literal)(token).map_err(|_| LiteralError::Malformed(token.to_owned()))?;
    // digits are already validated, so the only failure left is overflow
    u64::from_str_radix(digits, radix).map_err(|_| LiteralError::Overflow(token.to_owned()))
}

/// Parses a whitespace separated address trace. `#` comments out the rest of
/// a line.
pub fn parse_trace(text: &str) -> Result<Vec<u64>, TraceError> {
    let mut addresses = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let code = line.split_once('#').map_or(line, |(code, _)| code);
        for token in code.split_whitespace() {
            let address =
                parse_address(token).map_err(|source| TraceError { line: n + 1, source })?;
            addresses.push(address);
        }
    }
    Ok(addresses)
}

pub fn read_trace(mut reader: impl Read) -> Result<Vec<u64>> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    Ok(parse_trace(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(Ok(16), parse_address("16"));
        assert_eq!(Ok(0x90), parse_address("0x90"));
        assert_eq!(Ok(0xdead_beef), parse_address("0XDeadBeef"));
        assert_eq!(Ok(0o17), parse_address("0o17"));
        assert_eq!(Ok(0b1010), parse_address("0b1010"));
        assert_eq!(Ok(u64::MAX), parse_address("0xffffffffffffffff"));
    }
    #[test]
    fn test_bad_literals() {
        for token in ["0x", "0b102", "12a", "-4", "0o8", "1_000", ""] {
            assert_eq!(
                Err(LiteralError::Malformed(token.to_owned())),
                parse_address(token),
                "{token:?}"
            );
        }
        assert_eq!(
            Err(LiteralError::Overflow("0x10000000000000000".to_owned())),
            parse_address("0x10000000000000000")
        );
    }
    #[test]
    fn test_trace() {
        let trace = "# header\n0x10 0x10\n\n  144 # conflict\n0b0\t0o20\n";
        assert_eq!(Ok(vec![0x10, 0x10, 0x90, 0, 0x10]), parse_trace(trace));
    }
    #[test]
    fn test_trace_error_line() {
        let err = parse_trace("0x10\n0x20 zz\n").unwrap_err();
        assert_eq!(2, err.line);
        assert_eq!(LiteralError::Malformed("zz".to_owned()), err.source);
        assert_eq!("line 2: `zz` is not an address", err.to_string());
    }
    #[test]
    fn test_read_trace() {
        let addresses = read_trace("1 2 3".as_bytes()).unwrap();
        assert_eq!(vec![1, 2, 3], addresses);
    }
}
