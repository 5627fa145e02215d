//! # safesql — parameterized SQLite queries from code and JSON filters
//!
//! > **No value ever becomes SQL text.** Values become `?` plus an entry in
//! > the parallel values list.
//!
//! Two ways in:
//!
//! - [`QueryBuilder`] assembles hand-written SQL with bound values, screening
//!   the result for stacked statements.
//! - [`compile_filter`] turns a MongoDB-style JSON filter into one
//!   parenthesized boolean expression ready to splice into a `WHERE`.
//!
//! ## Quick Example
//!
//! ```
//! use safesql::prelude::*;
//!
//! let filter: FilterValue = serde_json::json!({
//!     "age": {"gte": 18, "lt": 65},
//!     "or": [{"role": "admin"}, {"meta.beta": true}]
//! }).into();
//!
//! let mut qb = QueryBuilder::new();
//! qb.push("SELECT id FROM users WHERE ")
//!     .push_fragment(compile_filter(&filter)?);
//! let (sql, values) = qb.build()?.into_parts();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT id FROM users WHERE ((((\"role\" = ?) OR (json_extract(\"meta\", ?) = ?)) \
//!      AND (\"age\" >= ? AND \"age\" < ?)))"
//! );
//! assert_eq!(values.len(), 5);
//! # Ok::<(), SqlError>(())
//! ```
//!
//! ## Operators
//!
//! | Key      | SQL                         | Operand            |
//! |----------|-----------------------------|--------------------|
//! | `gt`     | `> ?`                       | scalar             |
//! | `gte`    | `>= ?`                      | scalar             |
//! | `lt`     | `< ?`                       | scalar             |
//! | `lte`    | `<= ?`                      | scalar             |
//! | `ne`     | `<> ?` / `IS NOT NULL`      | scalar or null     |
//! | `in`     | `IN (?,...)`                | non-empty array    |
//! | `nin`    | `NOT IN (?,...)`            | non-empty array    |
//! | `like`   | `LIKE ?`                    | string             |
//! | `ilike`  | `LIKE ? COLLATE NOCASE`     | string             |
//! | `regex`  | `REGEXP ?`                  | string             |
//! | `exists` | `IS NOT NULL` / `IS NULL`   | boolean            |

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod fragment;
pub mod ident;
pub mod json_path;
pub mod operator;
pub mod scan;
pub mod value;

pub use config::Limits;
pub use error::{ErrorKind, SqlError, SqlResult};
pub use filter::{compile_filter, compile_filter_with};
pub use fragment::{build_in_clause, Fragment, QueryBuilder};
pub use ident::{validate_alias, validate_identifier};
pub use operator::Operator;
pub use value::{coerce_value, FilterValue, SqlValue};

pub mod prelude {
    pub use crate::config::Limits;
    pub use crate::error::*;
    pub use crate::filter::{compile_filter, compile_filter_with};
    pub use crate::fragment::{Fragment, QueryBuilder};
    pub use crate::value::{FilterValue, SqlValue};
}
