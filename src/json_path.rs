//! Dotted field names addressing values inside JSON columns.
//!
//! `"meta.address.city"` targets column `meta` with path `$.address.city`,
//! compiled as `json_extract("meta", ?)` with the path bound as a parameter.

use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::ident::{is_identifier, qualified_column};

/// A field split into its real column and the path inside its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    pub column: String,
    pub path: String,
}

/// A field is a JSON path iff it contains a dot.
pub fn is_json_path(field: &str) -> bool {
    field.contains('.')
}

/// Split `column.seg1.seg2` into `column` and `$.seg1.seg2`.
///
/// Every segment must be non-empty; path segments must also be bare
/// identifiers. The column itself is validated by the caller.
pub fn resolve(field: &str) -> SqlResult<JsonPath> {
    let mut segments = field.split('.');
    let column = segments.next().unwrap_or_default();
    if column.is_empty() {
        return Err(SqlError::json_path(field, "missing column"));
    }

    let mut path = String::from("$");
    let mut any = false;
    for segment in segments {
        if segment.is_empty() {
            return Err(SqlError::json_path(field, "empty segment"));
        }
        if !is_identifier(segment) {
            return Err(SqlError::json_path(field, "segment is not an identifier"));
        }
        path.push('.');
        path.push_str(segment);
        any = true;
    }
    if !any {
        return Err(SqlError::json_path(field, "missing path"));
    }

    Ok(JsonPath {
        column: column.to_string(),
        path,
    })
}

impl JsonPath {
    /// `json_extract(<column>, ?)` carrying the path as its parameter.
    pub fn extract(&self, alias: Option<&str>) -> SqlResult<Fragment> {
        let column = qualified_column(&self.column, alias)?;
        Ok(Fragment::new(
            format!("json_extract({}, ?)", column),
            vec![self.path.clone().into()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlValue;

    #[test]
    fn test_resolve() {
        let p = resolve("a.b.c").unwrap();
        assert_eq!(p.column, "a");
        assert_eq!(p.path, "$.b.c");
    }

    #[test]
    fn test_resolve_empty_segments() {
        for field in [".a", "a.", "a..b", "."] {
            let err = resolve(field).unwrap_err();
            assert!(
                matches!(err, SqlError::InvalidJsonPath { .. }),
                "{} should fail",
                field
            );
        }
    }

    #[test]
    fn test_resolve_rejects_bad_segment() {
        assert!(matches!(
            resolve("meta.a-b").unwrap_err(),
            SqlError::InvalidJsonPath { .. }
        ));
    }

    #[test]
    fn test_extract() {
        let frag = resolve("meta.city").unwrap().extract(Some("u")).unwrap();
        assert_eq!(frag.text(), "json_extract(u.\"meta\", ?)");
        assert_eq!(frag.values(), &[SqlValue::Text("$.city".into())]);
    }

    #[test]
    fn test_extract_validates_column() {
        let err = resolve("bad col.x").unwrap().extract(None).unwrap_err();
        assert!(matches!(err, SqlError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_is_json_path() {
        assert!(is_json_path("a.b"));
        assert!(!is_json_path("ab"));
    }
}
