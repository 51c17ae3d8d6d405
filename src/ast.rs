//! This module defines the core value type of the interpreter. [`Value`] is used
//! both for data and for code: a parse tree is just a nested [`Value::List`]
//! whose leaves are integers, strings and symbols. Callables are explicit
//! variants, so a list is only ever data, whatever its length. Ergonomic
//! helpers such as [`val`], [`sym`] and [`nil`] build trees in code and tests,
//! and the [`Display`](std::fmt::Display) impl is the unparser: it writes
//! literal values back in a form the parser reads again.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::builtinops::{BuiltinOp, OpKind};
use crate::{Error, MAX_NESTING_DEPTH};

/// Type alias for integer values in the interpreter
pub type IntegerType = BigInt;

/// An immutable list.
///
/// Copies share their storage, so cloning a list and taking its tail are
/// O(1). The nesting depth is computed once, when the list is built; a tail
/// reports the depth of the list it was taken from.
#[derive(Clone)]
pub struct List {
    items: Rc<[Value]>,
    start: usize,
    depth: usize,
}

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        let depth = 1 + items.iter().map(Value::depth).max().unwrap_or(0);
        List {
            items: items.into(),
            start: 0,
            depth,
        }
    }

    /// Nesting depth: nil is 1, a list holding nil is 2
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Everything after the first element; nil for nil
    pub fn tail(&self) -> List {
        List {
            items: Rc::clone(&self.items),
            start: (self.start + 1).min(self.items.len()),
            depth: self.depth,
        }
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items[self.start..]
    }
}

impl Default for List {
    fn default() -> Self {
        List::new(Vec::new())
    }
}

impl Deref for List {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl From<Vec<Value>> for List {
    fn from(items: Vec<Value>) -> Self {
        List::new(items)
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        List::new(iter.into_iter().collect())
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        (Rc::ptr_eq(&self.items, &other.items) && self.start == other.start)
            || self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// A user-defined macro: its arguments are substituted into `body` unevaluated.
#[derive(Debug)]
pub struct Macro {
    pub params: Value,
    pub body: Value,
    depth: usize,
}

/// A user-defined function.
///
/// `environment` is the capture list: `(name value)` pairs bound into every
/// call frame before the parameters. There is no implicit closure over the
/// defining scope.
#[derive(Debug)]
pub struct Function {
    pub environment: List,
    pub params: Value,
    pub body: Value,
    depth: usize,
}

/// Core value type
///
/// To build a tree, use the helper functions:
/// - `val(42)` for integers and strings, `sym("name")` for symbols, `nil()` for
///   the empty list
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("+"), val(1), val(2)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    /// Lists; the empty list is nil, the canonical false value
    List(List),
    /// Arbitrary-precision integers
    Integer(IntegerType),
    /// String literals
    String(String),
    /// Symbols (identifiers when evaluated)
    Symbol(String),
    /// Builtin operations, compared by identity
    Builtin(&'static BuiltinOp),
    /// User macros, created by the `macro` builtin
    Macro(Rc<Macro>),
    /// User functions, created by the `lambda` and `function` builtins
    Function(Rc<Function>),
}

impl Value {
    /// Check if a value represents nil (empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Nil, the empty string and zero are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::List(items) => !items.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Integer(n) => !n.is_zero(),
            Value::Symbol(_) | Value::Builtin(_) | Value::Macro(_) | Value::Function(_) => true,
        }
    }

    /// Name of the value's type, as reported by `same-type?` and in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::List(_) => "List",
            Value::Integer(_) => "Integer",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Builtin(_) => "Builtin",
            Value::Macro(_) => "Macro",
            Value::Function(_) => "Function",
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&IntegerType> {
        match self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// How deeply lists and callables nest inside this value; atoms are 0
    pub fn depth(&self) -> usize {
        match self {
            Value::List(list) => list.depth(),
            Value::Macro(mac) => mac.depth,
            Value::Function(func) => func.depth,
            Value::Integer(_) | Value::String(_) | Value::Symbol(_) | Value::Builtin(_) => 0,
        }
    }

    /// Reject values nested deeper than [`MAX_NESTING_DEPTH`]
    pub fn check_nesting(self) -> Result<Self, Error> {
        if self.depth() > MAX_NESTING_DEPTH {
            return Err(Error::NestingLimitExceeded);
        }
        Ok(self)
    }

    /// Build a user macro value
    pub fn new_macro(params: Value, body: Value) -> Self {
        let depth = 1 + params.depth().max(body.depth());
        Value::Macro(Rc::new(Macro {
            params,
            body,
            depth,
        }))
    }

    /// Build a user function value with an explicit capture list
    pub fn new_function(environment: impl Into<List>, params: Value, body: Value) -> Self {
        let environment = environment.into();
        let depth = 1 + environment
            .depth()
            .max(params.depth())
            .max(body.depth());
        Value::Function(Rc::new(Function {
            environment,
            params,
            body,
            depth,
        }))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Builtin(op) => write!(f, "Builtin({})", op.name),
            Value::Macro(m) => write!(f, "Macro(params={:?}, body={:?})", m.params, m.body),
            Value::Function(func) => write!(
                f,
                "Function(env={:?}, params={:?}, body={:?})",
                func.environment, func.params, func.body
            ),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<IntegerType> for Value {
    fn from(n: IntegerType) -> Self {
        Value::Integer(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(IntegerType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);
impl_from_integer!(u64);
impl_from_integer!(usize);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// The empty list, nil
pub fn nil() -> Value {
    Value::List(List::default())
}

/// Integer truth value as returned by comparison builtins
pub(crate) fn truth(b: bool) -> Value {
    Value::Integer(IntegerType::from(u8::from(b)))
}

/// Text form of a value, as written by `unparse` and the REPL.
pub fn unparse(value: &Value) -> String {
    value.to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Integer(n) => write!(f, "{n}"),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c if c.is_control() && (c as u32) < 0x100 => {
                            write!(f, "\\x{:02x}", c as u32)?;
                        }
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Symbol(s) => write!(f, "{s}"),
            // Callables have no literal syntax
            Value::Builtin(op) => {
                let kind = match op.op_kind {
                    OpKind::Macro(_) => "macro",
                    OpKind::SpecialForm(form) if form.is_macro() => "macro",
                    _ => "function",
                };
                write!(f, "<builtin {kind} {}>", op.name)
            }
            Value::Macro(_) => write!(f, "<macro>"),
            Value::Function(_) => write!(f, "<function>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Macro(a), Value::Macro(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false, // Different variants are never equal
        }
    }
}
