//! Builtin operations registry.
//!
//! Every builtin is described once by a [`BuiltinOp`]: its name, how it
//! receives arguments, its [`Arity`] and where it may be called from. The
//! evaluator consults this metadata before dispatching, so implementations
//! can assume their argument count is valid.
//!
//! ## Functions, Macros and Special Forms
//!
//! - **Functions** receive evaluated arguments (e.g. `+`, `cons`, `write`)
//! - **Macros** receive their argument expressions unevaluated (e.g. `def`, `q`)
//! - **Special forms** (`if`, `eval`) are rewritten by the resolver before
//!   dispatch, which keeps their result in tail position
//!
//! ## Call Contexts
//!
//! Two independent flags restrict where a builtin may run. `top_level_only`
//! builtins (`def`, `load`, `comment`) must be a direct top-level form, and
//! `repl_only` builtins (`help`, `restart`, `quit`) need an interactive
//! session. Marking a builtin REPL-only also marks it top-level-only.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** with the signature [`BuiltinFn`]
//! 2. **Add it to BUILTIN_OPS** with its name, kind, arity and call-context flags
//! 3. **Add tests** covering edge cases and error conditions

use std::collections::HashMap;
use std::sync::LazyLock;

use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

use crate::Error;
use crate::ast::{IntegerType, List, Value, nil, truth};
use crate::evaluator::Program;

/// Canonical builtin signature: the program context plus the argument list
/// (evaluated for functions, raw expressions for macros).
pub type BuiltinFn = fn(&mut Program, Vec<Value>) -> Result<Value, Error>;

/// Argument count bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    /// Check an argument count, naming `callee` in the error
    pub fn validate(&self, callee: &str, got: usize) -> Result<(), Error> {
        let expected = match *self {
            Arity::Exact(n) if got != n => n.to_string(),
            Arity::AtLeast(min) if got < min => format!("at least {min}"),
            _ => return Ok(()),
        };
        Err(Error::ArityError {
            callee: callee.to_owned(),
            expected,
            got,
        })
    }
}

/// Forms the resolver rewrites instead of calling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    /// `(if cond then else)`: only the selected branch is evaluated
    If,
    /// `(eval expr)`: the value of `expr` is evaluated as code
    Eval,
}

impl SpecialForm {
    /// `if` takes its branches unevaluated; `eval` evaluates its argument
    pub fn is_macro(self) -> bool {
        matches!(self, SpecialForm::If)
    }
}

/// Represents the implementation of a builtin
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Takes evaluated arguments
    Function(BuiltinFn),
    /// Takes unevaluated arguments
    Macro(BuiltinFn),
    /// Handled by the resolver
    SpecialForm(SpecialForm),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::Macro(_) => write!(f, "Macro(<fn>)"),
            OpKind::SpecialForm(form) => write!(f, "SpecialForm({form:?})"),
        }
    }
}

/// Definition of a builtin operation
#[derive(Debug)]
pub struct BuiltinOp {
    pub name: &'static str,
    pub op_kind: OpKind,
    pub arity: Arity,
    /// Only as a direct top-level form, never from inside a function body
    pub top_level_only: bool,
    /// Only in an interactive session
    pub repl_only: bool,
    /// Value is not displayed when the call is a top-level form of a script
    pub quiet: bool,
}

impl BuiltinOp {
    fn function(name: &'static str, arity: Arity, func: BuiltinFn) -> Self {
        BuiltinOp {
            name,
            op_kind: OpKind::Function(func),
            arity,
            top_level_only: false,
            repl_only: false,
            quiet: false,
        }
    }

    fn macro_op(name: &'static str, arity: Arity, func: BuiltinFn) -> Self {
        BuiltinOp {
            op_kind: OpKind::Macro(func),
            ..BuiltinOp::function(name, arity, func)
        }
    }

    fn special(name: &'static str, arity: Arity, form: SpecialForm) -> Self {
        BuiltinOp {
            name,
            op_kind: OpKind::SpecialForm(form),
            arity,
            top_level_only: false,
            repl_only: false,
            quiet: false,
        }
    }

    fn top_level_only(self) -> Self {
        BuiltinOp {
            top_level_only: true,
            ..self
        }
    }

    fn repl_only(self) -> Self {
        BuiltinOp {
            top_level_only: true,
            repl_only: true,
            ..self
        }
    }

    fn quiet(self) -> Self {
        BuiltinOp {
            quiet: true,
            ..self
        }
    }

    /// Check if this operation receives its arguments unevaluated
    pub fn is_macro(&self) -> bool {
        match self.op_kind {
            OpKind::Function(_) => false,
            OpKind::Macro(_) => true,
            OpKind::SpecialForm(form) => form.is_macro(),
        }
    }

    pub(crate) fn special_form(&self) -> Option<SpecialForm> {
        match self.op_kind {
            OpKind::SpecialForm(form) => Some(form),
            _ => None,
        }
    }
}

//
// Argument helpers
//

/// Destructure an argument list whose length the registry already checked
fn fixed<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], Error> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| Error::ArityError {
        callee: name.to_owned(),
        expected: N.to_string(),
        got,
    })
}

fn integer(value: Value, verb: &str) -> Result<IntegerType, Error> {
    match value {
        Value::Integer(n) => Ok(n),
        other => Err(Error::type_mismatch(format!(
            "cannot {verb} {}",
            other.type_name()
        ))),
    }
}

/// `(+ (1 2 3))` sums the list itself
fn spread_single_list(args: Vec<Value>) -> Vec<Value> {
    match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items.to_vec(),
        Ok([other]) => vec![other],
        Err(args) => args,
    }
}

//
// Builtin Function Implementations
//

fn builtin_cons(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [head, tail] = fixed("cons", args)?;
    match tail {
        Value::List(items) => Ok(Value::List(
            std::iter::once(head).chain(items.iter().cloned()).collect(),
        )),
        Value::String(s) => {
            let Value::Integer(code) = head else {
                return Err(Error::type_mismatch(format!(
                    "cannot cons {} to String",
                    head.type_name()
                )));
            };
            let ch = code
                .to_u32()
                .and_then(char::from_u32)
                .ok_or_else(|| Error::type_mismatch(format!("{code} is not a character code")))?;
            let mut result = String::with_capacity(s.len() + ch.len_utf8());
            result.push(ch);
            result.push_str(&s);
            Ok(Value::String(result))
        }
        other => Err(Error::type_mismatch(format!(
            "second argument of cons must be List or String, not {}",
            other.type_name()
        ))),
    }
}

fn builtin_head(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = fixed("head", args)?;
    match value {
        Value::List(items) => Ok(items.first().cloned().unwrap_or_else(nil)),
        Value::String(s) => Ok(s.chars().next().map_or_else(nil, |c| Value::from(u32::from(c)))),
        other => Err(Error::type_mismatch(format!(
            "cannot get head of {}",
            other.type_name()
        ))),
    }
}

fn builtin_tail(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = fixed("tail", args)?;
    match value {
        Value::List(items) => Ok(Value::List(items.tail())),
        Value::String(s) => Ok(Value::String(s.chars().skip(1).collect())),
        other => Err(Error::type_mismatch(format!(
            "cannot get tail of {}",
            other.type_name()
        ))),
    }
}

fn builtin_add(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let mut sum = IntegerType::zero();
    for arg in spread_single_list(args) {
        sum += integer(arg, "add")?;
    }
    Ok(Value::Integer(sum))
}

/// `(-)` is -1 and `(- x)` negates
fn builtin_sub(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let mut args = args.into_iter();
    let Some(first) = args.next() else {
        return Ok(Value::from(-1));
    };
    if args.len() == 0 {
        return Ok(Value::Integer(-integer(first, "negate")?));
    }
    let mut result = integer(first, "subtract from")?;
    for arg in args {
        result -= integer(arg, "subtract")?;
    }
    Ok(Value::Integer(result))
}

fn builtin_mul(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let mut product = IntegerType::from(1);
    for arg in spread_single_list(args) {
        product *= integer(arg, "multiply")?;
    }
    Ok(Value::Integer(product))
}

/// Floor division, rounding toward negative infinity
fn builtin_div(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let mut args = args.into_iter();
    let Some(first) = args.next() else {
        return Err(Error::arity_error(2, 0));
    };
    let mut result = integer(first, "divide")?;
    for arg in args {
        let divisor = integer(arg, "divide by")?;
        if divisor.is_zero() {
            return Err(Error::DivisionByZero);
        }
        result = result.div_floor(&divisor);
    }
    Ok(Value::Integer(result))
}

/// Floor modulo: the result takes the sign of the divisor
fn builtin_mod(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [a, b] = fixed("mod", args)?;
    let (Value::Integer(a), Value::Integer(b)) = (&a, &b) else {
        return Err(Error::type_mismatch(format!(
            "cannot mod {} and {}",
            a.type_name(),
            b.type_name()
        )));
    };
    if b.is_zero() {
        return Err(Error::ModByZero);
    }
    Ok(Value::Integer(a.mod_floor(b)))
}

fn builtin_less(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let mut increasing = true;
    for pair in args.windows(2) {
        match (&pair[0], &pair[1]) {
            (Value::Integer(a), Value::Integer(b)) => increasing &= a < b,
            (a, b) => {
                return Err(Error::type_mismatch(format!(
                    "cannot compare {} and {}",
                    a.type_name(),
                    b.type_name()
                )));
            }
        }
    }
    Ok(truth(increasing))
}

fn builtin_equal(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let all_equal = match args.split_first() {
        Some((first, rest)) => rest.iter().all(|arg| arg == first),
        None => true,
    };
    Ok(truth(all_equal))
}

fn builtin_same_type(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let all_same = match args.split_first() {
        Some((first, rest)) => rest.iter().all(|arg| arg.type_name() == first.type_name()),
        None => true,
    };
    Ok(truth(all_same))
}

fn builtin_unparse(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [value] = fixed("unparse", args)?;
    Ok(Value::String(value.to_string()))
}

fn builtin_write(program: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    for arg in args {
        match arg {
            // Strings are written without quotes
            Value::String(s) => program.write_output(&s),
            other => program.write_output(&other.to_string()),
        }
    }
    Ok(nil())
}

fn builtin_locals(program: &mut Program, _: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::List(
        program
            .scope()
            .current_bindings()
            .into_iter()
            .map(|(name, value)| Value::List(List::new(vec![Value::Symbol(name), value])))
            .collect(),
    ))
}

fn builtin_function(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [environment, params, body] = fixed("function", args)?;
    match environment {
        Value::List(pairs) => Ok(Value::new_function(pairs, params, body)),
        other => Err(Error::type_mismatch(format!(
            "function environment must be List, not {}",
            other.type_name()
        ))),
    }
}

fn builtin_lambda(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [params, body] = fixed("lambda", args)?;
    Ok(Value::new_function(List::default(), params, body))
}

fn builtin_macro(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [params, body] = fixed("macro", args)?;
    Ok(Value::new_macro(params, body))
}

fn builtin_def(program: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [name, expr] = fixed("def", args)?;
    let Value::Symbol(name) = name else {
        return Err(Error::type_mismatch(format!(
            "def expected Symbol, not {}",
            name.type_name()
        )));
    };
    if program.scope().is_global(&name) {
        return Err(Error::NameInUse(name));
    }
    let value = program.evaluate(&expr)?;
    program.scope_mut().define_global(name.clone(), value);
    Ok(Value::Symbol(name))
}

fn builtin_quote(_: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [expr] = fixed("q", args)?;
    Ok(expr)
}

fn builtin_load(program: &mut Program, args: Vec<Value>) -> Result<Value, Error> {
    let [module] = fixed("load", args)?;
    match module {
        Value::Symbol(name) | Value::String(name) => {
            program.load_module(&name)?;
            Ok(nil())
        }
        other => Err(Error::type_mismatch(format!(
            "load requires module name, not {}",
            other.type_name()
        ))),
    }
}

fn builtin_comment(_: &mut Program, _: Vec<Value>) -> Result<Value, Error> {
    Ok(nil())
}

fn builtin_help(program: &mut Program, _: Vec<Value>) -> Result<Value, Error> {
    program.show_help();
    Ok(nil())
}

fn builtin_restart(program: &mut Program, _: Vec<Value>) -> Result<Value, Error> {
    program.inform("Restarting...");
    program.restart();
    Ok(nil())
}

fn builtin_quit(program: &mut Program, _: Vec<Value>) -> Result<Value, Error> {
    program.request_quit();
    Ok(nil())
}

/// Global registry of all builtin operations.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    use Arity::*;

    vec![
        // List and string structure
        BuiltinOp::function("cons", Exact(2), builtin_cons),
        BuiltinOp::function("head", Exact(1), builtin_head),
        BuiltinOp::function("tail", Exact(1), builtin_tail),
        // Arithmetic
        BuiltinOp::function("+", Any, builtin_add),
        BuiltinOp::function("-", Any, builtin_sub),
        BuiltinOp::function("*", Any, builtin_mul),
        BuiltinOp::function("/", AtLeast(2), builtin_div),
        BuiltinOp::function("mod", Exact(2), builtin_mod),
        // Comparison
        BuiltinOp::function("<", AtLeast(1), builtin_less),
        BuiltinOp::function("=", AtLeast(1), builtin_equal),
        BuiltinOp::function("same-type?", AtLeast(1), builtin_same_type),
        // Text and introspection
        BuiltinOp::function("unparse", Exact(1), builtin_unparse),
        BuiltinOp::function("write", Any, builtin_write),
        BuiltinOp::function("locals", Exact(0), builtin_locals),
        // Callable constructors
        BuiltinOp::function("function", Exact(3), builtin_function),
        BuiltinOp::macro_op("lambda", Exact(2), builtin_lambda),
        BuiltinOp::macro_op("macro", Exact(2), builtin_macro),
        // Control flow
        BuiltinOp::special("eval", Exact(1), SpecialForm::Eval),
        BuiltinOp::special("if", Exact(3), SpecialForm::If),
        BuiltinOp::macro_op("q", Exact(1), builtin_quote),
        // Program structure
        BuiltinOp::macro_op("def", Exact(2), builtin_def)
            .top_level_only()
            .quiet(),
        BuiltinOp::macro_op("load", Exact(1), builtin_load)
            .top_level_only()
            .quiet(),
        BuiltinOp::macro_op("comment", Any, builtin_comment)
            .top_level_only()
            .quiet(),
        // Interactive session
        BuiltinOp::macro_op("help", Exact(0), builtin_help).repl_only(),
        BuiltinOp::macro_op("restart", Exact(0), builtin_restart).repl_only(),
        BuiltinOp::macro_op("quit", Exact(0), builtin_quit).repl_only(),
    ]
});

static BUILTINS_BY_NAME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| {
        let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
        ops.iter().map(|op| (op.name, op)).collect()
    });

/// Get all builtin operations (installed into every new global scope)
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by name
pub fn find_builtin(name: &str) -> Option<&'static BuiltinOp> {
    BUILTINS_BY_NAME.get(name).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{sym, val};
    use pretty_assertions::assert_eq;

    /// Invoke a builtin directly through the registry, bypassing the
    /// evaluator's arity and context checks.
    fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value, Error> {
        let op = find_builtin(name).unwrap();
        let mut program = Program::for_tests();
        match op.op_kind {
            OpKind::Function(func) | OpKind::Macro(func) => func(&mut program, args),
            OpKind::SpecialForm(_) => panic!("special forms are not directly callable: {name}"),
        }
    }

    fn success<T: Into<Value>>(value: T) -> Result<Value, Error> {
        Ok(val(value))
    }

    #[test]
    fn test_builtin_ops_registry() {
        let cons = find_builtin("cons").unwrap();
        assert_eq!(cons.arity, Arity::Exact(2));
        assert!(!cons.is_macro());
        assert!(!cons.top_level_only);
        assert!(!cons.repl_only);

        let def = find_builtin("def").unwrap();
        assert!(def.is_macro());
        assert!(def.quiet);
        assert!(def.top_level_only);
        assert!(!def.repl_only);

        let quit = find_builtin("quit").unwrap();
        assert!(quit.top_level_only);
        assert!(quit.repl_only);

        assert_eq!(find_builtin("if").unwrap().special_form(), Some(SpecialForm::If));
        assert!(find_builtin("if").unwrap().is_macro());
        assert_eq!(find_builtin("eval").unwrap().special_form(), Some(SpecialForm::Eval));
        assert!(!find_builtin("eval").unwrap().is_macro());

        assert!(find_builtin("lambda").unwrap().special_form().is_none());
        assert!(find_builtin("car").is_none());

        // Names are unique
        assert_eq!(BUILTINS_BY_NAME.len(), get_builtin_ops().len());
    }

    #[test]
    fn test_arity_validation() {
        use Arity::*;

        Exact(2).validate("f", 2).unwrap();
        Exact(2).validate("f", 1).unwrap_err();
        Exact(2).validate("f", 3).unwrap_err();

        AtLeast(2).validate("f", 2).unwrap();
        AtLeast(2).validate("f", 200).unwrap();
        AtLeast(2).validate("f", 1).unwrap_err();

        Any.validate("f", 0).unwrap();
        Any.validate("f", 100).unwrap();

        assert_eq!(
            AtLeast(2).validate("/", 1).unwrap_err().to_string(),
            "/ takes at least 2 arguments, got 1"
        );
        match Exact(3).validate("if", 2).unwrap_err() {
            Error::ArityError { callee, expected, got } => {
                assert_eq!(callee, "if");
                assert_eq!(expected, "3");
                assert_eq!(got, 2);
            }
            other => panic!("expected ArityError, got {other:?}"),
        }
    }

    #[test]
    fn test_builtin_functions_data_driven() {
        let big = "100000000000000000000".parse::<IntegerType>().unwrap();
        let test_cases: Vec<(&str, Vec<Value>, Result<Value, Error>)> = vec![
            // cons
            ("cons", vec![val(1), val([2, 3])], success([1, 2, 3])),
            ("cons", vec![val([1]), nil()], Ok(val(vec![val([1])]))),
            ("cons", vec![val(104), val("i")], success("hi")),
            ("cons", vec![val("h"), val("i")], Err(Error::TypeMismatch("cannot cons String to String".into()))),
            ("cons", vec![val(-1), val("")], Err(Error::TypeMismatch("-1 is not a character code".into()))),
            ("cons", vec![val(1), val(2)], Err(Error::TypeMismatch("second argument of cons must be List or String, not Integer".into()))),
            // head / tail
            ("head", vec![val([1, 2])], success(1)),
            ("head", vec![nil()], Ok(nil())),
            ("head", vec![val("abc")], success(97)),
            ("head", vec![val("")], Ok(nil())),
            ("head", vec![sym("x")], Err(Error::TypeMismatch("cannot get head of Symbol".into()))),
            ("tail", vec![val([1, 2, 3])], success([2, 3])),
            ("tail", vec![nil()], Ok(nil())),
            ("tail", vec![val("abc")], success("bc")),
            ("tail", vec![val("")], success("")),
            ("tail", vec![val(5)], Err(Error::TypeMismatch("cannot get tail of Integer".into()))),
            // arithmetic
            ("+", vec![], success(0)),
            ("+", vec![val(1), val(2), val(3)], success(6)),
            ("+", vec![val([1, 2, 3, 4])], success(10)),
            ("+", vec![Value::Integer(big.clone()), Value::Integer(big.clone())], Ok(Value::Integer(&big + &big))),
            ("+", vec![val(1), val("2")], Err(Error::TypeMismatch("cannot add String".into()))),
            ("-", vec![], success(-1)),
            ("-", vec![val(5)], success(-5)),
            ("-", vec![val(10), val(3), val(2)], success(5)),
            ("-", vec![val("a")], Err(Error::TypeMismatch("cannot negate String".into()))),
            ("-", vec![nil(), val(1)], Err(Error::TypeMismatch("cannot subtract from List".into()))),
            ("*", vec![], success(1)),
            ("*", vec![val(2), val(3), val(4)], success(24)),
            ("*", vec![val([2, 5])], success(10)),
            ("*", vec![Value::Integer(big.clone()), Value::Integer(big.clone())], Ok(Value::Integer(&big * &big))),
            ("/", vec![val(7), val(2)], success(3)),
            ("/", vec![val(-7), val(2)], success(-4)),
            ("/", vec![val(100), val(5), val(2)], success(10)),
            ("/", vec![val(1), val(0)], Err(Error::DivisionByZero)),
            ("/", vec![val(1), sym("x")], Err(Error::TypeMismatch("cannot divide by Symbol".into()))),
            ("mod", vec![val(7), val(3)], success(1)),
            ("mod", vec![val(-7), val(3)], success(2)),
            ("mod", vec![val(7), val(-3)], success(-2)),
            ("mod", vec![val(7), val(0)], Err(Error::ModByZero)),
            ("mod", vec![val("7"), val(3)], Err(Error::TypeMismatch("cannot mod String and Integer".into()))),
            // comparison
            ("<", vec![val(1)], success(1)),
            ("<", vec![val(1), val(2), val(3)], success(1)),
            ("<", vec![val(1), val(3), val(2)], success(0)),
            ("<", vec![val(2), val(2)], success(0)),
            ("<", vec![val(1), val("2")], Err(Error::TypeMismatch("cannot compare Integer and String".into()))),
            ("=", vec![val(1)], success(1)),
            ("=", vec![val([1, 2]), val([1, 2]), val([1, 2])], success(1)),
            ("=", vec![val("a"), sym("a")], success(0)),
            ("=", vec![nil(), val(0)], success(0)),
            ("same-type?", vec![val(1), val(2)], success(1)),
            ("same-type?", vec![val("a"), sym("a")], success(0)),
            ("same-type?", vec![nil(), val([1, 2])], success(1)),
            // text
            ("unparse", vec![val(vec![sym("q"), val("x")])], success("(q \"x\")")),
            ("unparse", vec![val(-12)], success("-12")),
            // constructors
            ("function", vec![val(1), nil(), nil()], Err(Error::TypeMismatch("function environment must be List, not Integer".into()))),
            // quoting and comments
            ("q", vec![val(vec![sym("/"), val(1), val(0)])], Ok(val(vec![sym("/"), val(1), val(0)]))),
            ("comment", vec![sym("anything"), val(1)], Ok(nil())),
        ];

        for (i, (name, args, expected)) in test_cases.into_iter().enumerate() {
            let actual = call_builtin(name, args.clone());
            assert_eq!(actual, expected, "test case #{} ({name} {args:?})", i + 1);
        }
    }

    #[test]
    fn test_callable_constructors() {
        let lambda = call_builtin("lambda", vec![val(vec![sym("x")]), sym("x")]).unwrap();
        match lambda {
            Value::Function(f) => {
                assert!(f.environment.is_empty());
                assert_eq!(f.params, val(vec![sym("x")]));
                assert_eq!(f.body, sym("x"));
            }
            other => panic!("expected Function, got {other:?}"),
        }

        let function = call_builtin(
            "function",
            vec![val(vec![val(vec![sym("y"), val(10)])]), sym("args"), sym("args")],
        )
        .unwrap();
        match function {
            Value::Function(f) => assert_eq!(f.environment.to_vec(), vec![val(vec![sym("y"), val(10)])]),
            other => panic!("expected Function, got {other:?}"),
        }

        let mac = call_builtin("macro", vec![val(vec![sym("e")]), sym("e")]).unwrap();
        assert!(matches!(mac, Value::Macro(_)));
    }
}
