//! MongoDB-style JSON filter compiler.
//!
//! Turns a filter document into one parenthesized SQLite boolean expression
//! plus its positional parameters.
//!
//! # Grammar
//!
//! ```text
//! filter    := { key: entry, ... }               (at least one clause)
//! key       := "and" | "or"                      -> [filter, ...]
//!            | "$" alias                         -> filter (fields qualified as alias."col")
//!            | field                             -> condition
//! field     := column | column "." seg ("." seg)*     (JSON path)
//! condition := scalar                            -> = ? / IS NULL
//!            | { op: operand, ... }              -> operator object
//! op        := gt | gte | lt | lte | ne | in | nin | like | ilike | regex | exists
//! ```
//!
//! Within one filter object, clauses are emitted as: `and`, then `or`, then
//! plain fields in key order, then alias blocks in key order. Two or more
//! clauses are joined with `AND` and parenthesized.
//!
//! # Example
//!
//! ```
//! use safesql::{compile_filter, FilterValue, SqlValue};
//!
//! let filter: FilterValue = serde_json::json!({
//!     "status": "ACTIVE",
//!     "$t2": {"n": {"gte": 100}}
//! }).into();
//!
//! let compiled = compile_filter(&filter).unwrap();
//! assert_eq!(compiled.text(), "(((\"status\" = ?) AND (t2.\"n\" >= ?)))");
//! assert_eq!(compiled.values(), &[SqlValue::Text("ACTIVE".into()), SqlValue::Integer(100)]);
//! ```

use tracing::{debug, trace};

use crate::config::Limits;
use crate::context::CompileContext;
use crate::error::{SqlError, SqlResult};
use crate::fragment::{build_in_clause, Fragment};
use crate::ident::{qualified_column, validate_alias};
use crate::json_path::{self, is_json_path};
use crate::operator::Operator;
use crate::value::{coerce_value, FilterValue, SqlValue};

/// `and` / `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logical {
    And,
    Or,
}

impl Logical {
    fn key(self) -> &'static str {
        match self {
            Logical::And => "and",
            Logical::Or => "or",
        }
    }

    fn joiner(self) -> &'static str {
        match self {
            Logical::And => " AND ",
            Logical::Or => " OR ",
        }
    }
}

/// What a key of a filter object stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Key<'a> {
    Logical(Logical),
    Alias(&'a str),
    Field(&'a str),
}

impl<'a> Key<'a> {
    fn classify(key: &'a str) -> Self {
        match key {
            "and" => Key::Logical(Logical::And),
            "or" => Key::Logical(Logical::Or),
            _ => match key.strip_prefix('$') {
                Some(alias) => Key::Alias(alias),
                None => Key::Field(key),
            },
        }
    }
}

/// The entries of one filter object, sorted into emission order.
#[derive(Debug, Default)]
struct Clauses<'a> {
    and: Option<&'a FilterValue>,
    or: Option<&'a FilterValue>,
    fields: Vec<(&'a str, &'a FilterValue)>,
    aliases: Vec<(&'a str, &'a FilterValue)>,
}

impl<'a> Clauses<'a> {
    /// Undefined entries and non-object alias values are dropped here.
    fn partition(entries: &'a [(String, FilterValue)]) -> Self {
        let mut out = Clauses::default();
        for (key, value) in entries {
            if value.is_undefined() {
                continue;
            }
            match Key::classify(key) {
                Key::Logical(Logical::And) => out.and = Some(value),
                Key::Logical(Logical::Or) => out.or = Some(value),
                Key::Alias(name) => {
                    if matches!(value, FilterValue::Object(_)) {
                        out.aliases.push((name, value));
                    }
                }
                Key::Field(name) => out.fields.push((name, value)),
            }
        }
        out
    }
}

/// Compile a filter with the default [`Limits`].
pub fn compile_filter(filter: &FilterValue) -> SqlResult<Fragment> {
    compile_filter_with(filter, &Limits::default())
}

/// Compile a filter under explicit limits.
///
/// The returned text is wrapped in one extra pair of parentheses and holds
/// exactly one `?` per returned value.
pub fn compile_filter_with(filter: &FilterValue, limits: &Limits) -> SqlResult<Fragment> {
    let mut ctx = CompileContext::new(limits);
    let text = compile_node(filter, &mut ctx, None)?;
    let operators = ctx.operator_count();
    let compiled = Fragment::new(text, ctx.into_values()).wrap();
    debug!(
        len = compiled.text().len(),
        params = compiled.values().len(),
        operators,
        "compiled filter"
    );
    Ok(compiled)
}

fn compile_node(
    filter: &FilterValue,
    ctx: &mut CompileContext<'_>,
    alias: Option<&str>,
) -> SqlResult<String> {
    let entries = filter
        .as_object()
        .ok_or(SqlError::FilterMustBeObject(filter.type_name()))?;

    ctx.nested(|ctx| {
        let parts = Clauses::partition(entries);
        let mut clauses = Vec::new();

        if let Some(items) = parts.and {
            clauses.push(compile_logical(Logical::And, items, ctx, alias)?);
        }
        if let Some(items) = parts.or {
            clauses.push(compile_logical(Logical::Or, items, ctx, alias)?);
        }
        for (field, condition) in parts.fields {
            clauses.push(compile_field(field, condition, ctx, alias)?);
        }
        for (name, block) in parts.aliases {
            if let Some(outer) = alias {
                return Err(SqlError::NestedAlias {
                    outer: outer.to_string(),
                    inner: name.to_string(),
                });
            }
            let name = validate_alias(name)?;
            clauses.push(compile_node(block, ctx, Some(name))?);
        }

        match clauses.len() {
            0 => Err(SqlError::EmptyFilter),
            1 => Ok(clauses.remove(0)),
            _ => Ok(format!("({})", clauses.join(" AND "))),
        }
    })
}

fn compile_logical(
    logical: Logical,
    items: &FilterValue,
    ctx: &mut CompileContext<'_>,
    alias: Option<&str>,
) -> SqlResult<String> {
    let FilterValue::Array(items) = items else {
        return Err(SqlError::LogicalNotArray(logical.key()));
    };
    if items.is_empty() {
        return Err(SqlError::EmptyLogical(logical.key()));
    }
    ctx.count_operator()?;

    let parts = items
        .iter()
        .map(|item| compile_node(item, ctx, alias))
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(format!("({})", parts.join(logical.joiner())))
}

/// Left-hand side of a field clause.
///
/// JSON paths carry their path parameter, which is bound again each time
/// the target is emitted.
struct Target(Fragment);

impl Target {
    fn resolve(field: &str, alias: Option<&str>) -> SqlResult<Self> {
        let fragment = if is_json_path(field) {
            json_path::resolve(field)?.extract(alias)?
        } else {
            Fragment::raw(qualified_column(field, alias)?)
        };
        Ok(Target(fragment))
    }

    fn emit(&self, ctx: &mut CompileContext<'_>) -> String {
        ctx.extend_params(self.0.values());
        self.0.text().to_string()
    }
}

fn compile_field(
    field: &str,
    condition: &FilterValue,
    ctx: &mut CompileContext<'_>,
    alias: Option<&str>,
) -> SqlResult<String> {
    if matches!(condition, FilterValue::Array(_)) {
        return Err(SqlError::ArrayFieldNotAllowed(field.to_string()));
    }
    let target = Target::resolve(field, alias)?;

    let clause = match condition {
        FilterValue::Object(ops) => compile_operators(field, &target, ops, ctx)?,
        c if c.is_nullish() => format!("({} IS NULL)", target.emit(ctx)),
        c => {
            let value = coerce_value(c)?;
            let lhs = target.emit(ctx);
            format!("({} = {})", lhs, ctx.add_param(value))
        }
    };
    trace!(field, clause = %clause, "compiled field");
    Ok(clause)
}

fn compile_operators(
    field: &str,
    target: &Target,
    ops: &[(String, FilterValue)],
    ctx: &mut CompileContext<'_>,
) -> SqlResult<String> {
    // Every key is checked before anything is emitted.
    let ops = ops
        .iter()
        .map(|(name, operand)| name.parse::<Operator>().map(|op| (op, operand)))
        .collect::<SqlResult<Vec<_>>>()?;

    let exists = ops
        .iter()
        .find(|(op, operand)| *op == Operator::Exists && !operand.is_undefined());
    if let Some((_, operand)) = exists {
        let FilterValue::Bool(present) = operand else {
            return Err(SqlError::mismatch("exists", "a boolean"));
        };
        ctx.count_operator()?;
        let test = if *present { "IS NOT NULL" } else { "IS NULL" };
        return Ok(format!("({} {})", target.emit(ctx), test));
    }

    let mut clauses = Vec::new();
    for (op, operand) in ops {
        if let Some(clause) = compile_operator(op, operand, target, ctx)? {
            clauses.push(clause);
        }
    }
    if clauses.is_empty() {
        return Err(SqlError::EmptyOperatorObject(field.to_string()));
    }
    Ok(format!("({})", clauses.join(" AND ")))
}

/// One operator clause, or `None` when the operand is undefined.
fn compile_operator(
    op: Operator,
    operand: &FilterValue,
    target: &Target,
    ctx: &mut CompileContext<'_>,
) -> SqlResult<Option<String>> {
    if operand.is_undefined() && op != Operator::Ne {
        return Ok(None);
    }

    let clause = match op {
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let value = coerce_value(operand)?;
            ctx.count_operator()?;
            let lhs = target.emit(ctx);
            ctx.add_param(value);
            format!("{} {}", lhs, op.sql())
        }
        Operator::Ne => {
            ctx.count_operator()?;
            if operand.is_nullish() {
                format!("{} IS NOT NULL", target.emit(ctx))
            } else {
                let value = coerce_value(operand)?;
                let lhs = target.emit(ctx);
                ctx.add_param(value);
                format!("{} {}", lhs, op.sql())
            }
        }
        Operator::In | Operator::Nin => {
            let FilterValue::Array(items) = operand else {
                return Err(SqlError::mismatch(op.name(), "an array"));
            };
            let list = build_in_clause(op.name(), items, ctx.limits().max_in_items)?;
            ctx.count_operator()?;
            let lhs = target.emit(ctx);
            ctx.extend_params(list.values());
            let keyword = if op == Operator::In { "IN" } else { "NOT IN" };
            format!("{} {} {}", lhs, keyword, list.text())
        }
        Operator::Like | Operator::Ilike | Operator::Regex => {
            let Some(pattern) = operand.as_str() else {
                return Err(SqlError::mismatch(op.name(), "a string"));
            };
            ctx.count_operator()?;
            let lhs = target.emit(ctx);
            ctx.add_param(SqlValue::Text(pattern.to_string()));
            format!("{} {}", lhs, op.sql())
        }
        // A defined `exists` short-circuits in compile_operators.
        Operator::Exists => return Ok(None),
    };
    Ok(Some(clause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(value: serde_json::Value) -> SqlResult<Fragment> {
        compile_filter(&value.into())
    }

    #[test]
    fn test_scalar_equality() {
        let f = compile(json!({"name": "bob", "age": 30})).unwrap();
        assert_eq!(f.text(), "(((\"name\" = ?) AND (\"age\" = ?)))");
        assert_eq!(
            f.values(),
            &[SqlValue::Text("bob".into()), SqlValue::Integer(30)]
        );
    }

    #[test]
    fn test_null_semantics() {
        let f = compile(json!({"x": null})).unwrap();
        assert_eq!(f.text(), "((\"x\" IS NULL))");
        assert!(f.values().is_empty());

        let f = compile(json!({"x": {"ne": null}})).unwrap();
        assert_eq!(f.text(), "((\"x\" IS NOT NULL))");
        assert!(f.values().is_empty());
    }

    #[test]
    fn test_json_path() {
        let f = compile(json!({"a.b.c": {"gt": 1}})).unwrap();
        assert_eq!(f.text(), "((json_extract(\"a\", ?) > ?))");
        assert_eq!(
            f.values(),
            &[SqlValue::Text("$.b.c".into()), SqlValue::Integer(1)]
        );
    }

    #[test]
    fn test_json_path_repeats_path_per_operator() {
        let f = compile(json!({"meta.score": {"gte": 1, "lt": 5}})).unwrap();
        assert_eq!(
            f.text(),
            "((json_extract(\"meta\", ?) >= ? AND json_extract(\"meta\", ?) < ?))"
        );
        assert_eq!(
            f.values(),
            &[
                SqlValue::Text("$.score".into()),
                SqlValue::Integer(1),
                SqlValue::Text("$.score".into()),
                SqlValue::Integer(5),
            ]
        );
    }

    #[test]
    fn test_logical_before_fields_before_aliases() {
        let f = compile(json!({
            "$u": {"id": 1},
            "name": "a",
            "or": [{"x": 1}, {"y": 2}],
            "and": [{"z": 3}]
        }))
        .unwrap();
        assert_eq!(
            f.text(),
            "((((\"z\" = ?)) AND ((\"x\" = ?) OR (\"y\" = ?)) AND (\"name\" = ?) AND (u.\"id\" = ?)))"
        );
        assert_eq!(
            f.values(),
            &[
                SqlValue::Integer(3),
                SqlValue::Integer(1),
                SqlValue::Integer(2),
                SqlValue::Text("a".into()),
                SqlValue::Integer(1),
            ]
        );
    }

    #[test]
    fn test_exists_wins() {
        let f = compile(json!({"deleted_at": {"gt": 5, "exists": false}})).unwrap();
        assert_eq!(f.text(), "((\"deleted_at\" IS NULL))");
        assert!(f.values().is_empty());

        let f = compile(json!({"email": {"exists": true}})).unwrap();
        assert_eq!(f.text(), "((\"email\" IS NOT NULL))");
    }

    #[test]
    fn test_exists_still_rejects_unknown_operator() {
        let err = compile(json!({"a": {"exists": true, "bogus": 1}})).unwrap_err();
        assert!(matches!(err, SqlError::UnknownOperator(ref n) if n == "bogus"));
    }

    #[test]
    fn test_exists_requires_bool() {
        let err = compile(json!({"a": {"exists": 1}})).unwrap_err();
        assert!(matches!(err, SqlError::TypeMismatch { operator: "exists", .. }));
    }

    #[test]
    fn test_in_and_nin() {
        let f = compile(json!({"role": {"in": ["a", "b"], "nin": ["c"]}})).unwrap();
        assert_eq!(f.text(), "((\"role\" IN (?,?) AND \"role\" NOT IN (?)))");
        assert_eq!(f.values().len(), 3);
    }

    #[test]
    fn test_pattern_operators() {
        let f = compile(json!({"name": {"like": "a%", "ilike": "B%", "regex": "^c"}})).unwrap();
        assert_eq!(
            f.text(),
            "((\"name\" LIKE ? AND \"name\" LIKE ? COLLATE NOCASE AND \"name\" REGEXP ?))"
        );
        let err = compile(json!({"name": {"like": 5}})).unwrap_err();
        assert!(matches!(err, SqlError::TypeMismatch { operator: "like", .. }));
        let err = compile(json!({"name": {"ilike": 1}})).unwrap_err();
        assert!(matches!(err, SqlError::TypeMismatch { operator: "ilike", .. }));
        let err = compile(json!({"name": {"regex": true}})).unwrap_err();
        assert!(matches!(err, SqlError::TypeMismatch { operator: "regex", .. }));
    }

    #[test]
    fn test_not_equal() {
        let f = compile(json!({"a": {"ne": 4}})).unwrap();
        assert_eq!(f.text(), "((\"a\" <> ?))");
        assert_eq!(f.values(), &[SqlValue::Integer(4)]);
    }

    #[test]
    fn test_in_requires_array() {
        let err = compile(json!({"a": {"in": 5}})).unwrap_err();
        assert!(matches!(err, SqlError::TypeMismatch { operator: "in", .. }));
        let err = compile(json!({"a": {"nin": "x"}})).unwrap_err();
        assert!(matches!(err, SqlError::TypeMismatch { operator: "nin", .. }));
        let err = compile(json!({"a": {"in": []}})).unwrap_err();
        assert!(matches!(err, SqlError::EmptyArrayNotAllowed("in")));
    }

    #[test]
    fn test_in_list_size_limit() {
        let items: Vec<i64> = (0..999).collect();
        let f = compile(json!({"id": {"in": items}})).unwrap();
        assert_eq!(f.values().len(), 999);
        assert!(f.text().starts_with("((\"id\" IN (?,?,"));

        let items: Vec<i64> = (0..1000).collect();
        let err = compile(json!({"id": {"nin": items}})).unwrap_err();
        assert!(matches!(
            err,
            SqlError::ArrayTooLarge { operator: "nin", len: 1000, max: 999 }
        ));
    }

    #[test]
    fn test_unsigned_beyond_signed_range_rejected() {
        let err = compile(json!({"id": 18446744073709551615u64})).unwrap_err();
        assert!(matches!(err, SqlError::UnsupportedValue(_)));
        let err = compile(json!({"id": {"in": [1, 18446744073709551615u64]}})).unwrap_err();
        assert!(matches!(err, SqlError::UnsupportedValue(_)));
    }

    #[test]
    fn test_undefined_entries_dropped() {
        let filter = FilterValue::object([
            ("a", FilterValue::Undefined),
            ("b", FilterValue::Int(1)),
            ("$t", FilterValue::Int(3)),
        ]);
        let f = compile_filter(&filter).unwrap();
        assert_eq!(f.text(), "((\"b\" = ?))");

        let filter = FilterValue::object([("a", FilterValue::Undefined)]);
        assert!(matches!(compile_filter(&filter), Err(SqlError::EmptyFilter)));
    }

    #[test]
    fn test_undefined_operands() {
        let ops = FilterValue::object([("gt", FilterValue::Undefined), ("lt", FilterValue::Int(4))]);
        let f = compile_filter(&FilterValue::object([("n", ops)])).unwrap();
        assert_eq!(f.text(), "((\"n\" < ?))");

        let ops = FilterValue::object([("ne", FilterValue::Undefined)]);
        let f = compile_filter(&FilterValue::object([("n", ops)])).unwrap();
        assert_eq!(f.text(), "((\"n\" IS NOT NULL))");

        let ops = FilterValue::object([("gt", FilterValue::Undefined)]);
        let err = compile_filter(&FilterValue::object([("n", ops)])).unwrap_err();
        assert!(matches!(err, SqlError::EmptyOperatorObject(ref f) if f == "n"));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(compile(json!({})), Err(SqlError::EmptyFilter)));
        assert!(matches!(compile(json!([1])), Err(SqlError::FilterMustBeObject("array"))));
        assert!(matches!(compile(json!(null)), Err(SqlError::FilterMustBeObject("null"))));
        assert!(matches!(compile(json!({"and": []})), Err(SqlError::EmptyLogical("and"))));
        assert!(matches!(compile(json!({"or": {}})), Err(SqlError::LogicalNotArray("or"))));
        assert!(matches!(
            compile(json!({"tags": ["a"]})),
            Err(SqlError::ArrayFieldNotAllowed(ref f)) if f == "tags"
        ));
        assert!(matches!(
            compile(json!({"a": {}})),
            Err(SqlError::EmptyOperatorObject(_))
        ));
        assert!(matches!(compile(json!({"$t": {}})), Err(SqlError::EmptyFilter)));
        assert!(matches!(
            compile(json!({"and": [{"x": 1}, 2]})),
            Err(SqlError::FilterMustBeObject("number"))
        ));
    }

    #[test]
    fn test_nested_alias_rejected() {
        let err = compile(json!({"$a": {"$b": {"x": 1}}})).unwrap_err();
        assert!(matches!(err, SqlError::NestedAlias { ref outer, ref inner } if outer == "a" && inner == "b"));

        let err = compile(json!({"$a": {"or": [{"$b": {"x": 1}}]}})).unwrap_err();
        assert!(matches!(err, SqlError::NestedAlias { .. }));
    }

    #[test]
    fn test_alias_applies_through_combinators() {
        let f = compile(json!({"$o": {"or": [{"total": {"gt": 10}}, {"meta.vip": true}]}})).unwrap();
        assert_eq!(
            f.text(),
            "(((o.\"total\" > ?) OR (json_extract(o.\"meta\", ?) = ?)))"
        );
        assert_eq!(
            f.values(),
            &[
                SqlValue::Integer(10),
                SqlValue::Text("$.vip".into()),
                SqlValue::Bool(true)
            ]
        );
    }

    #[test]
    fn test_invalid_alias_name() {
        let err = compile(json!({"$bad alias": {"x": 1}})).unwrap_err();
        assert!(matches!(err, SqlError::InvalidIdentifier(ref n) if n == "bad alias"));
    }

    #[test]
    fn test_binary_operand_rejected() {
        let filter = FilterValue::object([("blob", FilterValue::Bytes(vec![1, 2]))]);
        assert!(matches!(compile_filter(&filter), Err(SqlError::BinaryNotAllowed)));
    }

    #[test]
    fn test_date_operand() {
        let dt = chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let filter = FilterValue::object([("created_at", FilterValue::object([("gte", dt)]))]);
        let f = compile_filter(&filter).unwrap();
        assert_eq!(f.values(), &[SqlValue::Text("2025-01-02 03:04:05".into())]);
    }
}
