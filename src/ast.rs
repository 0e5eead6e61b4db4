//! Building blocks for the query builders.

use crate::error::SqlError;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a WHERE condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

impl FromStr for Operator {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "like" => Ok(Operator::Like),
            "not like" => Ok(Operator::NotLike),
            _ => Err(SqlError::invalid(format!("unknown operator '{}'", s))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A `column <op> value` filter; the value is always bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    /// Build from the `(column, "op", value)` tuple form.
    pub fn parse(column: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self, SqlError> {
        Ok(Self::new(column, op.parse()?, value))
    }
}

/// A `column = value` pair of an UPDATE's SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl<C: Into<String>, V: Into<Value>> From<(C, V)> for Assignment {
    fn from((column, value): (C, V)) -> Self {
        Self::new(column, value)
    }
}

/// Column selection of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    #[default]
    All,
    List(Vec<String>),
}

impl From<&str> for Columns {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | "*" => Columns::All,
            name => Columns::List(vec![name.to_string()]),
        }
    }
}

impl From<Option<&str>> for Columns {
    fn from(s: Option<&str>) -> Self {
        s.map(Columns::from).unwrap_or_default()
    }
}

impl From<Vec<String>> for Columns {
    fn from(v: Vec<String>) -> Self {
        if v.is_empty() { Columns::All } else { Columns::List(v) }
    }
}

impl From<Vec<&str>> for Columns {
    fn from(v: Vec<&str>) -> Self {
        v.into_iter().map(String::from).collect::<Vec<_>>().into()
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(v: [&str; N]) -> Self {
        Vec::from(v).into()
    }
}

/// Join flavour used by the join builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Cross => "cross",
        };
        f.write_str(s)
    }
}

impl FromStr for JoinType {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "cross" => Ok(JoinType::Cross),
            _ => Err(SqlError::invalid(format!("unknown join type '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!("NOT   like".parse::<Operator>().unwrap(), Operator::NotLike);
        assert!("~".parse::<Operator>().is_err());
    }

    #[test]
    fn test_columns_from() {
        assert_eq!(Columns::from("*"), Columns::All);
        assert_eq!(Columns::from(None), Columns::All);
        assert_eq!(
            Columns::from("first_name"),
            Columns::List(vec!["first_name".into()])
        );
        assert_eq!(
            Columns::from(["last_name", "country"]),
            Columns::List(vec!["last_name".into(), "country".into()])
        );
    }

    #[test]
    fn test_condition_tuple_form() {
        let cond = Condition::parse("product_name", "=", "Smartphone").unwrap();
        assert_eq!(cond.op, Operator::Eq);
        assert_eq!(cond.value, Value::Text("Smartphone".into()));
    }

    #[test]
    fn test_join_type_display() {
        assert_eq!("INNER".parse::<JoinType>().unwrap().to_string(), "inner");
    }
}
