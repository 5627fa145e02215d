//! Per-call state threaded through filter compilation.

use crate::config::Limits;
use crate::error::{SqlError, SqlResult};
use crate::value::SqlValue;

/// Context for one `compile_filter` call. Never shared between calls.
#[derive(Debug)]
pub struct CompileContext<'a> {
    limits: &'a Limits,
    /// Filter objects currently being compiled (root = 1).
    depth: usize,
    /// `and`/`or`/comparison operators consumed so far.
    operator_count: usize,
    /// Collected parameter values in placeholder order.
    values: Vec<SqlValue>,
}

impl<'a> CompileContext<'a> {
    pub fn new(limits: &'a Limits) -> Self {
        Self {
            limits,
            depth: 0,
            operator_count: 0,
            values: Vec::new(),
        }
    }

    pub fn limits(&self) -> &Limits {
        self.limits
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn operator_count(&self) -> usize {
        self.operator_count
    }

    /// Run `f` one filter level deeper.
    ///
    /// The depth is restored whether `f` succeeds or fails.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> SqlResult<T>) -> SqlResult<T> {
        if self.depth >= self.limits.max_nesting_depth {
            return Err(SqlError::NestingTooDeep {
                max: self.limits.max_nesting_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Account for one more operator.
    pub fn count_operator(&mut self) -> SqlResult<()> {
        self.operator_count += 1;
        if self.operator_count > self.limits.max_operators {
            return Err(SqlError::TooManyOperators {
                max: self.limits.max_operators,
            });
        }
        Ok(())
    }

    /// Add a value and return the placeholder for it.
    pub fn add_param(&mut self, value: SqlValue) -> &'static str {
        self.values.push(value);
        "?"
    }

    /// Add the values of an already rendered fragment.
    pub fn extend_params(&mut self, values: &[SqlValue]) {
        self.values.extend_from_slice(values);
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_restored_after_error() {
        let limits = Limits::builder().max_nesting_depth(2).build();
        let mut ctx = CompileContext::new(&limits);

        let result: SqlResult<()> = ctx.nested(|ctx| ctx.nested(|ctx| ctx.nested(|_| Ok(()))));
        assert!(matches!(result, Err(SqlError::NestingTooDeep { max: 2 })));
        assert_eq!(ctx.depth(), 0);

        let depth = ctx.nested(|ctx| ctx.nested(|ctx| Ok(ctx.depth()))).unwrap();
        assert_eq!(depth, 2);
    }

    #[test]
    fn test_operator_limit() {
        let limits = Limits::builder().max_operators(2).build();
        let mut ctx = CompileContext::new(&limits);
        assert!(ctx.count_operator().is_ok());
        assert!(ctx.count_operator().is_ok());
        assert!(matches!(
            ctx.count_operator(),
            Err(SqlError::TooManyOperators { max: 2 })
        ));
    }

    #[test]
    fn test_params_in_order() {
        let limits = Limits::default();
        let mut ctx = CompileContext::new(&limits);
        assert_eq!(ctx.add_param(1.into()), "?");
        ctx.extend_params(&["$.a".into(), 2.into()]);
        assert_eq!(
            ctx.into_values(),
            vec![
                SqlValue::Integer(1),
                SqlValue::Text("$.a".into()),
                SqlValue::Integer(2)
            ]
        );
    }
}
