//! Rewriting of `if`, `eval` and user macro invocations.
//!
//! Each rewrite produces a new expression. While that expression is a call
//! whose head is again `if`, `eval` or a macro, resolution continues in the
//! same loop; the first expression that is anything else is handed back to
//! the trampoline, so the selected branch stays in tail position.

use std::rc::Rc;

use crate::Error;
use crate::ast::{Macro, Value};
use crate::builtinops::SpecialForm;
use crate::evaluator::Program;
use crate::evaluator::binder;
use crate::evaluator::scope::Frame;

/// Outcome of resolution
#[derive(Debug)]
pub(crate) enum Resolved {
    /// A call to a builtin, a function or a non-callable value
    Call { head: Value, args: Vec<Value> },
    /// An expression that is not a call: nil or an atom, still unevaluated
    Expr(Value),
}

enum Rewrite {
    Special(SpecialForm),
    Macro(Rc<Macro>),
}

pub(crate) fn resolve(
    program: &mut Program,
    mut head: Value,
    mut tail: Vec<Value>,
) -> Result<Resolved, Error> {
    loop {
        let rewrite = match &head {
            Value::Builtin(op) => op.special_form().map(Rewrite::Special),
            Value::Macro(mac) => Some(Rewrite::Macro(Rc::clone(mac))),
            _ => None,
        };
        let Some(rewrite) = rewrite else {
            tracing::debug!(%head, args = tail.len(), "resolved call");
            return Ok(Resolved::Call { head, args: tail });
        };
        tracing::debug!(%head, args = tail.len(), "resolve");

        let expression = match rewrite {
            Rewrite::Special(SpecialForm::If) => {
                let [condition, then_branch, else_branch] = exact_args("if", tail)?;
                if program.evaluate(&condition)?.is_truthy() {
                    then_branch
                } else {
                    else_branch
                }
            }
            Rewrite::Special(SpecialForm::Eval) => {
                let [expr] = exact_args("eval", tail)?;
                program.evaluate(&expr)?
            }
            Rewrite::Macro(mac) => {
                let bindings = binder::bind(program, &[], &mac.params, tail)?;
                substitute(&mac.body, &bindings).check_nesting()?
            }
        };

        match expression {
            Value::List(items) if !items.is_empty() => {
                head = program.evaluate(&items[0])?;
                tail = items[1..].to_vec();
            }
            other => {
                tracing::debug!(expr = %other, "resolved expression");
                return Ok(Resolved::Expr(other));
            }
        }
    }
}

fn exact_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], Error> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| Error::ArityError {
        callee: name.to_owned(),
        expected: N.to_string(),
        got,
    })
}

/// Replace every bound symbol in `expr`, at any depth
pub(crate) fn substitute(expr: &Value, bindings: &Frame) -> Value {
    match expr {
        Value::List(items) => Value::List(items.iter().map(|item| substitute(item, bindings)).collect()),
        Value::Symbol(name) => bindings.get(name).cloned().unwrap_or_else(|| expr.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};
    use crate::builtinops::find_builtin;
    use pretty_assertions::assert_eq;

    fn builtin(name: &str) -> Value {
        Value::Builtin(find_builtin(name).unwrap())
    }

    fn expect_expr(resolved: Resolved) -> Value {
        match resolved {
            Resolved::Expr(value) => value,
            Resolved::Call { head, args } => panic!("expected expression, got call {head} {args:?}"),
        }
    }

    #[test]
    fn test_substitute() {
        let bindings = Frame::from([("x".to_owned(), val(3)), ("y".to_owned(), sym("z"))]);
        let body = val(vec![sym("+"), sym("x"), val(vec![sym("y"), sym("x"), val("x")])]);
        assert_eq!(
            substitute(&body, &bindings),
            val(vec![sym("+"), val(3), val(vec![sym("z"), val(3), val("x")])])
        );
        assert_eq!(substitute(&sym("w"), &bindings), sym("w"));
    }

    #[test]
    fn test_if_selects_branch_unevaluated() {
        let mut program = Program::for_tests();

        let resolved = resolve(
            &mut program,
            builtin("if"),
            vec![val(0), val(vec![sym("/"), val(1), val(0)]), val(42)],
        )
        .unwrap();
        assert_eq!(expect_expr(resolved), val(42));

        // The selected branch is returned as a call for the trampoline
        let resolved = resolve(
            &mut program,
            builtin("if"),
            vec![val(1), val(vec![sym("+"), val(1), val(2)]), nil()],
        )
        .unwrap();
        match resolved {
            Resolved::Call { head, args } => {
                assert_eq!(head, builtin("+"));
                assert_eq!(args, vec![val(1), val(2)]);
            }
            other => panic!("expected call, got {other:?}"),
        }

        let err = resolve(&mut program, builtin("if"), vec![val(1), val(2)]).unwrap_err();
        assert_eq!(err.to_string(), "if takes 3 arguments, got 2");
    }

    #[test]
    fn test_eval_and_chained_rewrites() {
        let mut program = Program::for_tests();

        // (eval (q (if 0 1 "no")))
        let code = val(vec![sym("q"), val(vec![sym("if"), val(0), val(1), val("no")])]);
        let resolved = resolve(&mut program, builtin("eval"), vec![code]).unwrap();
        assert_eq!(expect_expr(resolved), val("no"));

        let err = resolve(&mut program, builtin("eval"), vec![]).unwrap_err();
        assert_eq!(err.to_string(), "eval takes 1 arguments, got 0");
    }

    #[test]
    fn test_macro_substitutes_unevaluated_arguments() {
        let mut program = Program::for_tests();
        // (macro (x) (q (+ x x))) applied to an expression that would fail if evaluated
        let double = Value::new_macro(
            val(vec![sym("x")]),
            val(vec![sym("q"), val(vec![sym("+"), sym("x"), sym("x")])]),
        );
        let arg = val(vec![sym("/"), val(1), val(0)]);
        let resolved = resolve(&mut program, double, vec![arg.clone()]).unwrap();
        match resolved {
            Resolved::Call { head, args } => {
                assert_eq!(head, builtin("q"));
                assert_eq!(args, vec![val(vec![sym("+"), arg.clone(), arg])]);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_non_rewritable_heads_pass_through() {
        let mut program = Program::for_tests();
        let resolved = resolve(&mut program, val(5), vec![val(1)]).unwrap();
        assert!(matches!(resolved, Resolved::Call { head, .. } if head == val(5)));
    }
}
