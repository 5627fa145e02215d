//! Operators accepted inside an operator object.

use std::str::FromStr;

use serde::Serialize;

use crate::error::SqlError;

/// A comparison or pattern operator, e.g. `{"age": {"gte": 18}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `<>`, or `IS NOT NULL` against null
    Ne,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    Nin,
    /// `LIKE`
    Like,
    /// `LIKE ... COLLATE NOCASE`
    Ilike,
    /// `REGEXP`
    Regex,
    /// `IS NOT NULL` / `IS NULL`
    Exists,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Ne,
        Operator::In,
        Operator::Nin,
        Operator::Like,
        Operator::Ilike,
        Operator::Regex,
        Operator::Exists,
    ];

    /// Key used in the filter document.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Ne => "ne",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::Regex => "regex",
            Operator::Exists => "exists",
        }
    }

    /// SQL emitted for the operator; `?` marks bound operands.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Gt => "> ?",
            Operator::Gte => ">= ?",
            Operator::Lt => "< ?",
            Operator::Lte => "<= ?",
            Operator::Ne => "<> ?",
            Operator::In => "IN (?,...)",
            Operator::Nin => "NOT IN (?,...)",
            Operator::Like => "LIKE ?",
            Operator::Ilike => "LIKE ? COLLATE NOCASE",
            Operator::Regex => "REGEXP ?",
            Operator::Exists => "IS NOT NULL",
        }
    }

    /// What the operand must be.
    pub fn operand(&self) -> &'static str {
        match self {
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => "a scalar",
            Operator::Ne => "a scalar or null",
            Operator::In | Operator::Nin => "a non-empty array",
            Operator::Like | Operator::Ilike | Operator::Regex => "a string",
            Operator::Exists => "a boolean",
        }
    }
}

impl FromStr for Operator {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| SqlError::UnknownOperator(s.to_string()))
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all() {
        for op in Operator::ALL {
            assert_eq!(op.name().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown() {
        let err = "bogus".parse::<Operator>().unwrap_err();
        assert!(matches!(err, SqlError::UnknownOperator(ref n) if n == "bogus"));
        // Operator names are case-sensitive.
        assert!("GT".parse::<Operator>().is_err());
    }
}
