//! Identifier validation and quoting.
//!
//! Column names, JSON-path segments and table aliases all share one grammar:
//!
//! ```text
//! ^[A-Za-z_][A-Za-z0-9_]*$
//! ```
//!
//! Anything else is rejected outright; nothing is escaped or stripped.

use nom::{
    bytes::complete::take_while,
    character::complete::satisfy,
    combinator::{all_consuming, recognize},
    sequence::pair,
    IResult,
};

use crate::error::{SqlError, SqlResult};

/// Parse one identifier (ASCII letter or `_`, then letters, digits, `_`).
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// Whether `name` is a bare identifier.
pub fn is_identifier(name: &str) -> bool {
    all_consuming(identifier)(name).is_ok()
}

/// Validate a column name and return it double-quoted.
///
/// # Example
///
/// ```
/// use safesql::validate_identifier;
///
/// assert_eq!(validate_identifier("created_at").unwrap(), "\"created_at\"");
/// assert!(validate_identifier("a; DROP TABLE x").is_err());
/// ```
pub fn validate_identifier(name: &str) -> SqlResult<String> {
    if is_identifier(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(SqlError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate a table alias. Aliases are emitted bare, as in `t2."col"`.
pub fn validate_alias(name: &str) -> SqlResult<&str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(SqlError::InvalidIdentifier(name.to_string()))
    }
}

/// Quote a validated column, optionally qualified by an alias.
pub(crate) fn qualified_column(column: &str, alias: Option<&str>) -> SqlResult<String> {
    let quoted = validate_identifier(column)?;
    Ok(match alias {
        Some(alias) => format!("{}.{}", alias, quoted),
        None => quoted,
    })
}
