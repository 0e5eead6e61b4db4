//! Statement and credential parsing using nom.
//!
//! # Statement splitting
//!
//! The server driver executes one statement per call, so multi-statement text
//! is split on `;` before it is sent:
//!
//! ```text
//! insert into t values ('a;b'); -- done; really
//! ───────────────┬──────────── ┬──────┬───────
//!                │             │      └── comment: `;` ignored
//!                │             └── separator
//!                └── quoted literal: `;` ignored
//! ```
//!
//! Quoted literals (`'…'`, `"…"`) may contain `;`, doubled quotes and
//! backslash escapes. Quoted identifiers (`` `…` ``) only know doubled
//! backticks. `#` and `-- ` line comments and `/* … */` block comments are
//! carried along with the statement they sit in. As in MySQL, `--` only opens
//! a comment when whitespace, a control character or the end of input follows,
//! so `x--1` stays an expression.
//!
//! # Credential strings
//!
//! `user=root,password=secret,host=localhost,port=3306`

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{anychar, char, not_line_ending, one_of, satisfy},
    combinator::{all_consuming, eof, peek, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, separated_pair},
    IResult,
};

use crate::error::{SqlError, SqlResult};

/// Split statement text into individual, trimmed, non-empty statements.
pub fn split_statements(input: &str) -> SqlResult<Vec<&str>> {
    match separated_list0(char(';'), statement_body)(input) {
        Ok(("", parts)) => Ok(parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()),
        Ok((remaining, _)) => Err(SqlError::parse(
            input.len() - remaining.len(),
            format!("Unterminated quoted literal: '{}'", remaining),
        )),
        Err(e) => Err(SqlError::parse(0, format!("Split failed: {:?}", e))),
    }
}

/// Everything up to the next top-level `;`.
fn statement_body(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((
        line_comment,
        block_comment,
        quoted('\''),
        quoted('"'),
        backticked,
        plain_text,
        recognize(one_of("-/")),
    ))))(input)
}

/// Run of characters with no special meaning.
fn plain_text(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !matches!(c, ';' | '\'' | '"' | '`' | '#' | '-' | '/'))(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(char('#'), not_line_ending)),
        recognize(pair(pair(tag("--"), peek(dash_comment_end)), not_line_ending)),
    ))(input)
}

fn dash_comment_end(input: &str) -> IResult<&str, &str> {
    alt((eof, recognize(satisfy(|c: char| c.is_whitespace() || c.is_control()))))(input)
}

/// A backtick-quoted identifier; only doubled backticks escape.
fn backticked(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('`'),
        many0(alt((take_while1(|c: char| c != '`'), tag("``")))),
        char('`'),
    ))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(delimited(tag("/*"), take_until("*/"), tag("*/")))(input)
}

/// A literal delimited by `q`, with doubled-quote and backslash escapes.
fn quoted<'a>(q: char) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        recognize(delimited(
            char(q),
            many0(alt((
                take_while1(move |c: char| c != q && c != '\\'),
                recognize(pair(char('\\'), anychar)),
                recognize(pair(char(q), char(q))),
            ))),
            char(q),
        ))(input)
    }
}

/// Parse `key=value,key=value` into ordered, trimmed pairs.
///
/// Values run to the next comma and may contain `=`.
pub fn parse_key_values(input: &str) -> SqlResult<Vec<(String, String)>> {
    let input = input.trim();

    match all_consuming(separated_list1(char(','), key_value))(input) {
        Ok((_, pairs)) => Ok(pairs
            .into_iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect()),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SqlError::parse(
            input.len() - e.input.len(),
            format!("Expected key=value pairs near '{}'", e.input),
        )),
        Err(e) => Err(SqlError::parse(0, format!("Parse failed: {:?}", e))),
    }
}

fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        delimited(
            take_while(char::is_whitespace),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            take_while(char::is_whitespace),
        ),
        char('='),
        take_while(|c: char| c != ','),
    )(input)
}

/// Check that a name can be placed in statement text unquoted.
///
/// Accepts `[A-Za-z0-9_$]+`, optionally qualified once as `schema.name`.
pub fn is_identifier(name: &str) -> bool {
    let mut parts = name.split('.');
    let valid = |part: &str| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), None, _) => valid(a),
        (Some(a), Some(b), None) => valid(a) && valid(b),
        _ => false,
    }
}

/// Validate an identifier, returning it unchanged.
pub fn identifier(name: &str) -> SqlResult<&str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(SqlError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let stmts = split_statements("drop table if exists t; create table t (id int);").unwrap();
        assert_eq!(stmts, vec!["drop table if exists t", "create table t (id int)"]);
    }

    #[test]
    fn test_split_ignores_empty() {
        assert!(split_statements("  ;; \n ;").unwrap().is_empty());
        assert_eq!(split_statements("select 1;;select 2").unwrap().len(), 2);
    }

    #[test]
    fn test_split_respects_quotes() {
        let stmts =
            split_statements("insert into t values ('a;b', \"c;d\"); select `we;ird` from t").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "insert into t values ('a;b', \"c;d\")");
        assert_eq!(stmts[1], "select `we;ird` from t");
    }

    #[test]
    fn test_split_escapes() {
        let stmts = split_statements(r"select 'it''s; fine', 'back\'slash;'; select 2").unwrap();
        assert_eq!(stmts, vec![r"select 'it''s; fine', 'back\'slash;'", "select 2"]);
    }

    #[test]
    fn test_split_comments() {
        let stmts = split_statements("select 1 -- one; two\n; /* a;b */ select 2 - 1 / 1").unwrap();
        assert_eq!(stmts, vec!["select 1 -- one; two", "/* a;b */ select 2 - 1 / 1"]);
    }

    #[test]
    fn test_split_hash_comments() {
        assert_eq!(split_statements("select 1 # a;b\n").unwrap(), vec!["select 1 # a;b"]);
        assert_eq!(
            split_statements("select 1 # it's fine\n; select 2").unwrap(),
            vec!["select 1 # it's fine", "select 2"]
        );
    }

    #[test]
    fn test_split_double_dash_needs_whitespace() {
        assert_eq!(
            split_statements("update t set x = x--1; select 2").unwrap(),
            vec!["update t set x = x--1", "select 2"]
        );
        assert_eq!(
            split_statements("select 1 --\tnote; here\n; select 2 --").unwrap(),
            vec!["select 1 --\tnote; here", "select 2 --"]
        );
    }

    #[test]
    fn test_split_backticks_have_no_backslash_escape() {
        assert_eq!(
            split_statements(r"select `a\`; select `b``;c` from t").unwrap(),
            vec![r"select `a\`", "select `b``;c` from t"]
        );
    }

    #[test]
    fn test_split_unterminated_quote() {
        let err = split_statements("select 1; select 'oops").unwrap_err();
        match err {
            SqlError::Parse { position, .. } => assert_eq!(position, 17),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_values() {
        let pairs =
            parse_key_values("user=root, password=p=w,host=localhost ,port=3306").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("user".to_string(), "root".to_string()),
                ("password".to_string(), "p=w".to_string()),
                ("host".to_string(), "localhost".to_string()),
                ("port".to_string(), "3306".to_string()),
            ]
        );
    }

    #[test]
    fn test_key_values_rejects_garbage() {
        assert!(parse_key_values("user root").is_err());
        assert!(parse_key_values("").is_err());
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("orders_combined"));
        assert!(is_identifier("tech_store.orders"));
        assert!(!is_identifier("orders; drop table x"));
        assert!(!is_identifier("a.b.c"));
        assert!(!is_identifier(""));
        assert!(identifier("bad name").is_err());
    }
}
