//! Parameterized SQL fragments and query assembly.
//!
//! A [`Fragment`] is SQL text plus the values bound to its `?` placeholders,
//! in order. Values never enter the text; only trusted literals passed to
//! [`Fragment::raw`] or [`QueryBuilder::push`] do.
//!
//! ```
//! use safesql::{compile_filter, FilterValue, QueryBuilder};
//!
//! let filter: FilterValue = serde_json::json!({"status": "ACTIVE"}).into();
//! let mut qb = QueryBuilder::new();
//! qb.push("SELECT * FROM users WHERE ")
//!     .push_fragment(compile_filter(&filter).unwrap())
//!     .push(" LIMIT ")
//!     .push_bind(10);
//! let query = qb.build().unwrap();
//! assert_eq!(query.text(), "SELECT * FROM users WHERE ((\"status\" = ?)) LIMIT ?");
//! assert_eq!(query.values().len(), 2);
//! ```

use tracing::debug;

use crate::config::Limits;
use crate::error::{SqlError, SqlResult};
use crate::ident::validate_identifier;
use crate::scan;
use crate::value::{coerce_value, FilterValue, SqlValue};

/// SQL text with its positional parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    text: String,
    values: Vec<SqlValue>,
}

impl Fragment {
    pub(crate) fn new(text: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            values,
        }
    }

    /// Trusted SQL text with no parameters.
    ///
    /// Never pass user input here.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// A single `?` bound to the coerced value.
    pub fn param(value: &FilterValue) -> SqlResult<Self> {
        Ok(Self::new("?", vec![coerce_value(value)?]))
    }

    /// A single `?` bound to an already canonical value (blobs included).
    pub fn bind(value: impl Into<SqlValue>) -> Self {
        Self::new("?", vec![value.into()])
    }

    /// A validated, double-quoted identifier.
    pub fn identifier(name: &str) -> SqlResult<Self> {
        Ok(Self::raw(validate_identifier(name)?))
    }

    /// Concatenate fragments with a literal separator.
    pub fn join<I>(fragments: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut out = Fragment::default();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.text.push_str(separator);
            }
            out.append(fragment);
        }
        out
    }

    /// Surround with one pair of parentheses.
    pub fn wrap(self) -> Self {
        Self {
            text: format!("({})", self.text),
            values: self.values,
        }
    }

    pub(crate) fn append(&mut self, other: Fragment) {
        self.text.push_str(&other.text);
        self.values.extend(other.values);
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Take the text and values apart, e.g. to hand them to a driver.
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.text, self.values)
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// `(?,?,...)` with one placeholder per item.
///
/// `operator` only labels errors (`in`, `nin`).
pub fn build_in_clause(
    operator: &'static str,
    items: &[FilterValue],
    max_items: usize,
) -> SqlResult<Fragment> {
    if items.is_empty() {
        return Err(SqlError::EmptyArrayNotAllowed(operator));
    }
    if items.len() > max_items {
        return Err(SqlError::ArrayTooLarge {
            operator,
            len: items.len(),
            max: max_items,
        });
    }
    let params = items
        .iter()
        .map(Fragment::param)
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(Fragment::join(params, ",").wrap())
}

/// Incremental query assembly.
///
/// Binding errors are held until [`QueryBuilder::build`] so calls chain.
/// `build` also screens the final text for stacked statements and length.
#[derive(Debug)]
pub struct QueryBuilder {
    query: Fragment,
    limits: Limits,
    error: Option<SqlError>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            query: Fragment::default(),
            limits,
            error: None,
        }
    }

    fn record(&mut self, result: SqlResult<Fragment>) -> &mut Self {
        match result {
            Ok(fragment) => self.query.append(fragment),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
        self
    }

    /// Append trusted SQL text.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.query.push_str(sql);
        self
    }

    /// Append `?` and bind the value.
    pub fn push_bind(&mut self, value: impl Into<FilterValue>) -> &mut Self {
        let result = Fragment::param(&value.into());
        self.record(result)
    }

    /// Append `?` bound to a blob.
    pub fn push_blob(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.record(Ok(Fragment::bind(SqlValue::Blob(bytes.into()))))
    }

    /// Append a validated, quoted identifier.
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        let result = Fragment::identifier(name);
        self.record(result)
    }

    /// Append `(?,?,...)` for the given items.
    pub fn push_in<T: Into<FilterValue>>(&mut self, items: Vec<T>) -> &mut Self {
        let items: Vec<FilterValue> = items.into_iter().map(Into::into).collect();
        let result = build_in_clause("in", &items, self.limits.max_in_items);
        self.record(result)
    }

    /// Append a pre-built fragment verbatim.
    pub fn push_fragment(&mut self, fragment: Fragment) -> &mut Self {
        self.record(Ok(fragment))
    }

    /// Finish the query.
    pub fn build(self) -> SqlResult<Fragment> {
        if let Some(e) = self.error {
            return Err(e);
        }
        scan::screen(self.query.text(), self.limits.max_query_length)?;
        debug!(
            len = self.query.text().len(),
            params = self.query.values().len(),
            "built query"
        );
        Ok(self.query)
    }
}
