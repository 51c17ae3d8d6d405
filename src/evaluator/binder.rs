//! Parameter binding for user functions and macros.
//!
//! A parameter list is either a single Symbol, which receives the
//! whole argument list, or a List of entries. An entry is a Symbol, `(name)`
//! (optional, default nil) or `(name default-expr)`. Defaults are evaluated in
//! the scope of the caller, only when the argument is missing.

use crate::Error;
use crate::ast::{List, Value, nil};
use crate::evaluator::Program;
use crate::evaluator::scope::Frame;

/// Build the frame for one invocation: the capture list first, then the
/// parameters.
pub(crate) fn bind(
    program: &mut Program,
    environment: &[Value],
    params: &Value,
    args: Vec<Value>,
) -> Result<Frame, Error> {
    let mut frame = seed_environment(environment)?;

    match params {
        Value::Symbol(name) => {
            warn_if_shadowing(program, name);
            frame.insert(name.clone(), Value::List(List::new(args)).check_nesting()?);
        }
        Value::List(entries) => bind_list(program, &mut frame, entries, args)?,
        other => {
            return Err(Error::BindingError(format!(
                "parameters must either be Symbol or List of Symbols, not {other}"
            )));
        }
    }

    Ok(frame)
}

fn seed_environment(environment: &[Value]) -> Result<Frame, Error> {
    let mut frame = Frame::with_capacity(environment.len());
    for pair in environment {
        match pair {
            Value::List(items) if items.len() == 2 => match &items[0] {
                Value::Symbol(name) => {
                    frame.insert(name.clone(), items[1].clone());
                }
                other => {
                    return Err(Error::BindingError(format!(
                        "expected (name value) pair in function's environment; got {} instead of name",
                        other.type_name()
                    )));
                }
            },
            other => {
                return Err(Error::BindingError(format!(
                    "expected (name value) pair in function's environment; got {other} instead"
                )));
            }
        }
    }
    Ok(frame)
}

/// Walk parameters and arguments together, zip-longest style
fn bind_list(
    program: &mut Program,
    frame: &mut Frame,
    entries: &[Value],
    args: Vec<Value>,
) -> Result<(), Error> {
    let mut params = entries.iter();
    let mut args = args.into_iter();
    let mut name_count = 0;
    let mut value_count = 0;

    loop {
        let (param, arg) = match (params.next(), args.next()) {
            (None, None) => break,
            pair => pair,
        };

        let (name, default) = match param {
            Some(Value::List(entry)) => match entry.as_slice() {
                [name] => (Some(name), Some(nil())),
                [name, default] => (Some(name), Some(default.clone())),
                _ => {
                    return Err(Error::BindingError(
                        "default parameter must be given as a List of either one or two elements"
                            .to_owned(),
                    ));
                }
            },
            other => (other, None),
        };

        let value = match (arg, default) {
            (Some(value), _) => Some(value),
            (None, Some(default)) => Some(program.evaluate(&default)?),
            (None, None) => None,
        };

        match (name, value) {
            (None, _) => value_count += 1,
            (Some(_), None) => name_count += 1,
            (Some(Value::Symbol(name)), Some(value)) => {
                warn_if_shadowing(program, name);
                frame.insert(name.clone(), value);
                name_count += 1;
                value_count += 1;
            }
            (Some(other), Some(_)) => {
                return Err(Error::BindingError(format!(
                    "parameter list must contain Symbols, not {other}"
                )));
            }
        }
    }

    if name_count != value_count {
        return Err(Error::arity_error(name_count, value_count));
    }
    Ok(())
}

fn warn_if_shadowing(program: &mut Program, name: &str) {
    if program.scope().is_global(name) {
        program.warn(format!("parameter name shadows global name {name}"));
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{sym, val};
    use crate::diagnostics::Severity;
    use pretty_assertions::assert_eq;

    fn sorted(frame: Frame) -> Vec<(String, Value)> {
        let mut pairs: Vec<_> = frame.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    fn pairs(items: &[(&str, Value)]) -> Vec<(String, Value)> {
        items
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn test_positional_binding() {
        let mut program = Program::for_tests();
        let frame = bind(
            &mut program,
            &[],
            &val(vec![sym("a"), sym("b")]),
            vec![val(1), val("two")],
        )
        .unwrap();
        assert_eq!(sorted(frame), pairs(&[("a", val(1)), ("b", val("two"))]));
    }

    #[test]
    fn test_variadic_binding() {
        let mut program = Program::for_tests();
        let frame = bind(&mut program, &[], &sym("args"), vec![val(1), val(2)]).unwrap();
        assert_eq!(sorted(frame), pairs(&[("args", val([1, 2]))]));

        let frame = bind(&mut program, &[], &sym("args"), vec![]).unwrap();
        assert_eq!(sorted(frame), pairs(&[("args", nil())]));
    }

    #[test]
    fn test_environment_seeds_frame() {
        let mut program = Program::for_tests();
        let env = vec![val(vec![sym("y"), val(10)]), val(vec![sym("x"), val(0)])];
        // Parameters override captured names
        let frame = bind(&mut program, &env, &val(vec![sym("x")]), vec![val(5)]).unwrap();
        assert_eq!(sorted(frame), pairs(&[("x", val(5)), ("y", val(10))]));
    }

    #[test]
    fn test_defaults() {
        let mut program = Program::for_tests();
        let params = val(vec![
            sym("a"),
            val(vec![sym("b")]),
            val(vec![sym("c"), val(vec![sym("+"), val(1), val(2)])]),
        ]);

        let frame = bind(&mut program, &[], &params, vec![val(1)]).unwrap();
        assert_eq!(sorted(frame), pairs(&[("a", val(1)), ("b", nil()), ("c", val(3))]));

        // Supplied arguments win; defaults are not evaluated
        let params_with_bad_default = val(vec![val(vec![sym("d"), val(vec![sym("/"), val(1), val(0)])])]);
        let frame = bind(&mut program, &[], &params_with_bad_default, vec![val(7)]).unwrap();
        assert_eq!(sorted(frame), pairs(&[("d", val(7))]));
    }

    #[test]
    fn test_binding_errors() {
        let mut program = Program::for_tests();

        let test_cases: Vec<(Vec<Value>, Value, Vec<Value>, Error)> = vec![
            (vec![], val(vec![sym("a"), sym("b")]), vec![val(1)], Error::arity_error(2, 1)),
            (vec![], val(vec![sym("a")]), vec![val(1), val(2), val(3)], Error::arity_error(1, 3)),
            (vec![], val(vec![sym("a")]), vec![], Error::arity_error(1, 0)),
            (
                vec![],
                val(vec![val(1)]),
                vec![val(1)],
                Error::BindingError("parameter list must contain Symbols, not 1".into()),
            ),
            (
                vec![],
                val(vec![val(vec![sym("a"), val(1), val(2)])]),
                vec![],
                Error::BindingError(
                    "default parameter must be given as a List of either one or two elements".into(),
                ),
            ),
            (
                vec![],
                val(5),
                vec![],
                Error::BindingError("parameters must either be Symbol or List of Symbols, not 5".into()),
            ),
            (
                vec![val(vec![val(1), val(2)])],
                nil(),
                vec![],
                Error::BindingError(
                    "expected (name value) pair in function's environment; got Integer instead of name".into(),
                ),
            ),
            (
                vec![val(vec![sym("y")])],
                nil(),
                vec![],
                Error::BindingError(
                    "expected (name value) pair in function's environment; got (y) instead".into(),
                ),
            ),
        ];

        for (i, (env, params, args, expected)) in test_cases.into_iter().enumerate() {
            let result = bind(&mut program, &env, &params, args);
            assert_eq!(result.unwrap_err(), expected, "test case #{}", i + 1);
        }
    }

    #[test]
    fn test_shadowing_warns() {
        let mut program = Program::for_tests();
        let frame = bind(&mut program, &[], &val(vec![sym("head")]), vec![val(1)]).unwrap();
        assert_eq!(sorted(frame), pairs(&[("head", val(1))]));

        let diagnostics = program.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].message, "parameter name shadows global name head");
    }
}
