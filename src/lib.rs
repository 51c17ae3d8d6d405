//! tinylisp - a minimal Lisp with fexpr macros and a tail-calling evaluator
//!
//! Source text is scanned and parsed into S-expression trees ([`parser`]),
//! which a [`Program`](evaluator::Program) evaluates one top-level form at a
//! time. The language is deliberately small:
//!
//! ```text
//! (def square (lambda (x) (* x x)))
//! (square 12)                      ; 144
//! (def twice (macro (e) (q (e e))))
//! (if (< 1 2) "yes" (/ 1 0))       ; "yes" - the untaken branch never runs
//! ```
//!
//! ## Evaluation model
//!
//! - **Tail calls** into user functions are a state update of the evaluator
//!   loop, not a native call, so tail recursion runs in constant stack.
//! - **Macros** receive their arguments unevaluated and expand by symbol
//!   substitution; `if` and `eval` are resolved in the same loop.
//! - **Scoping** has two levels: the innermost local frame and the global
//!   table. Functions close over nothing implicitly; a function carries an
//!   explicit list of `(name value)` pairs instead.
//! - **Errors** never end a session: a faulting top-level form reports a
//!   diagnostic and evaluates to nil.
//!
//! ## Modules
//!
//! - `ast`: the value model, truthiness, equality and unparsing
//! - `parser`: scanner and parser for source text
//! - `evaluator`: the program context, trampoline, scopes, binder and resolver
//! - `builtinops`: the builtin registry
//! - `modules`: module path resolution and the loaded-module registry
//! - `diagnostics`: non-fatal error and warning reporting

use thiserror::Error;

/// Maximum depth of native (non-tail) evaluation recursion.
///
/// Arguments, `if` conditions and call heads are evaluated recursively;
/// only calls in tail position are free. Programs that nest deeper than this
/// fail with [`Error::RecursionLimitExceeded`].
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Maximum nesting depth of lists and callables.
///
/// The parser drops deeper expressions with an error diagnostic, and a
/// builtin, macro expansion or argument list that would build a deeper value
/// fails with [`Error::NestingLimitExceeded`]. Values are walked recursively
/// when they are printed, compared and dropped.
pub const MAX_NESTING_DEPTH: usize = 1_000;

/// Prompt shown by the interactive session
pub const PROMPT: &str = "tl> ";

/// Evaluation errors.
///
/// Every error is local to the top-level form that raised it: the form
/// evaluates to nil and the session continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0} is not defined")]
    UnboundName(String),

    #[error("{callee} takes {expected} arguments, got {got}")]
    ArityError {
        callee: String,
        expected: String,
        got: usize,
    },

    /// Malformed parameter list or environment pair
    #[error("{0}")]
    BindingError(String),

    #[error("{0} is not a function or macro")]
    NotCallable(String),

    #[error("{0}")]
    TypeMismatch(String),

    /// A top-level-only or REPL-only builtin used outside its context
    #[error("{name} {restriction}")]
    CallContextError {
        name: String,
        restriction: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("mod by zero")]
    ModByZero,

    #[error("recursion depth exceeded. How could you forget to use tail calls?!")]
    RecursionLimitExceeded,

    #[error("maximum nesting depth exceeded")]
    NestingLimitExceeded,

    #[error("calculation interrupted by user.")]
    UserInterrupt,

    #[error("name {0} already in use")]
    NameInUse(String),

    #[error("could not load {module} from {directory}")]
    LoadError { module: String, directory: String },
}

impl Error {
    /// Create an ArityError for a user-defined callable
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            callee: "function".to_owned(),
            expected: expected.to_string(),
            got,
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Error::TypeMismatch(message.into())
    }
}

pub mod ast;
pub mod builtinops;
pub mod diagnostics;
pub mod evaluator;
pub mod modules;
pub mod parser;
mod stack;

pub use ast::Value;
pub use evaluator::{Options, Program};
