//! The program context and its evaluation loop.
//!
//! A [`Program`] owns all interpreter state: the global table and local frames
//! ([`scope`]), the module registry, collected diagnostics and the output
//! sink. Evaluation is a trampoline. Each iteration resolves `if`, `eval` and
//! macros ([`resolver`]), then either calls a builtin, which ends the loop, or
//! binds a user function's arguments ([`binder`]) and continues with its body
//! in a fresh frame. Calls in tail position therefore use no native stack.
//!
//! Everything else (arguments, conditions, call heads, defaults) is evaluated
//! recursively through [`Program::evaluate`], bounded by [`MAX_EVAL_DEPTH`].

pub mod binder;
pub mod resolver;
pub mod scope;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ast::{Value, nil};
use crate::builtinops::{BuiltinOp, OpKind};
use crate::diagnostics::{Diagnostic, DiagnosticQueue};
use crate::modules::{CORE_LIBRARY, ModuleRegistry};
use crate::parser::{Parser, TokenStream, parse};
use crate::stack::ensure_sufficient_stack;
use crate::{Error, MAX_EVAL_DEPTH};

use resolver::Resolved;
use scope::{Frame, Scope};

const HELP_TEXT: &str = "\
tinylisp: everything is a list, an integer, a string or a symbol.
  (def name value)           define a global name (top level only)
  (lambda (params) body)     make a function; (macro (params) body) a macro
  (function env params body) make a function capturing env, e.g. (locals)
  (q expr)                   quote; (eval expr) evaluate; (if c then else)
  (load module)              run a module file once
  (restart) (quit)           reset the session; leave
The last value is bound to _.";

/// Program configuration
#[derive(Debug, Clone)]
pub struct Options {
    /// Interactive session: REPL-only builtins allowed, every value displayed
    pub repl: bool,
    /// Load the core library at startup and on restart
    pub library: bool,
    /// Print diagnostics to stderr as they are reported
    pub echo_diagnostics: bool,
    /// Directory that top-level `load` calls resolve against
    pub base_dir: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            repl: false,
            library: true,
            echo_diagnostics: true,
            base_dir: PathBuf::from("."),
        }
    }
}

/// One trampoline iteration's outcome
enum Step {
    Done(Value),
    TailCall { body: Value, frame: Frame },
}

/// Interpreter state
pub struct Program {
    options: Options,
    scope: Scope,
    modules: ModuleRegistry,
    diagnostics: DiagnosticQueue,
    output: Box<dyn Write>,
    interrupt: Arc<AtomicBool>,
    depth: usize,
    quit_requested: bool,
}

impl Program {
    /// A program writing to stdout
    pub fn new(options: Options) -> Self {
        Self::with_output(options, io::stdout())
    }

    /// A program writing displayed values and `write` output to `output`
    pub fn with_output(options: Options, output: impl Write + 'static) -> Self {
        let mut program = Program {
            scope: Scope::new(),
            modules: ModuleRegistry::new(&options.base_dir),
            diagnostics: DiagnosticQueue::new(options.echo_diagnostics),
            output: Box::new(output),
            interrupt: Arc::new(AtomicBool::new(false)),
            depth: 0,
            quit_requested: false,
            options,
        };
        program.load_library();
        program
    }

    fn load_library(&mut self) {
        if self.options.library {
            if let Err(err) = self.load_module(CORE_LIBRARY) {
                self.report_error(&err);
            }
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.scope.global(name).cloned()
    }

    /// Bind a global name unconditionally (the REPL's `_`)
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.scope.define_global(name.to_owned(), value);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Flag that aborts the running top-level form when set, e.g. from a
    /// Ctrl-C handler
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    /// Reinitialize all program state, keeping options, output and the
    /// interrupt flag
    pub fn restart(&mut self) {
        tracing::debug!("restarting program");
        self.scope = Scope::new();
        self.modules = ModuleRegistry::new(&self.options.base_dir);
        self.quit_requested = false;
        self.load_library();
    }

    //
    // Top level
    //

    /// Run source text, displaying each top-level value. Returns the value of
    /// the last form, if any.
    ///
    /// If any line has more closing than opening parentheses the text is
    /// parsed as a whole; otherwise each line is parsed on its own, with
    /// missing closing parentheses supplied at the end of the line.
    pub fn execute(&mut self, source: &str) -> Option<Value> {
        let multiline = source
            .split('\n')
            .any(|line| line.matches(')').count() > line.matches('(').count());

        if multiline {
            return self.execute_parsed(parse(source));
        }
        let mut last = None;
        for line in source.split('\n') {
            if self.quit_requested {
                break;
            }
            if let Some(value) = self.execute_parsed(parse(line)) {
                last = Some(value);
            }
        }
        last
    }

    fn execute_parsed<T: TokenStream>(&mut self, mut parser: Parser<T>) -> Option<Value> {
        let mut last = None;
        while let Some(expr) = parser.next() {
            self.report_parse_diagnostics(&mut parser);
            last = Some(self.execute_form(&expr));
            if self.quit_requested {
                return last;
            }
        }
        self.report_parse_diagnostics(&mut parser);
        last
    }

    fn report_parse_diagnostics<T: TokenStream>(&mut self, parser: &mut Parser<T>) {
        for diagnostic in parser.drain_diagnostics() {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Evaluate and display one top-level form
    fn execute_form(&mut self, expr: &Value) -> Value {
        let quiet = !self.options.repl && self.is_quiet_form(expr);
        match self.evaluate_form(expr) {
            Ok(value) => {
                if !quiet && !self.quit_requested {
                    self.display(&value);
                }
                value
            }
            Err(err) => {
                self.report_error(&err);
                nil()
            }
        }
    }

    /// Is `expr` a call to a builtin whose value is not displayed?
    fn is_quiet_form(&self, expr: &Value) -> bool {
        match expr {
            Value::List(items) => match items.first() {
                Some(Value::Symbol(name)) => {
                    matches!(self.scope.lookup(name), Ok(Value::Builtin(op)) if op.quiet)
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Evaluate one top-level form. A failing form reports a diagnostic and
    /// evaluates to nil.
    pub fn execute_one(&mut self, expr: &Value) -> Value {
        self.evaluate_form(expr).unwrap_or_else(|err| {
            self.report_error(&err);
            nil()
        })
    }

    /// Evaluate one top-level form, returning any error
    pub fn evaluate_form(&mut self, expr: &Value) -> Result<Value, Error> {
        ensure_sufficient_stack(|| self.run(expr.clone(), true))
    }

    /// Run a source file, resolving its `load` calls against its directory
    pub fn run_file(&mut self, path: &Path) -> Result<Option<Value>, Error> {
        let code = fs::read_to_string(path).map_err(|err| {
            tracing::debug!(path = %path.display(), %err, "file read failed");
            Error::LoadError {
                module: path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned()),
                directory: path
                    .parent()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_default(),
            }
        })?;
        if let Some(directory) = path.parent() {
            self.modules.set_base_directory(directory);
        }
        Ok(self.execute(&code))
    }

    /// Load a module once, with display suppressed while it runs
    pub(crate) fn load_module(&mut self, name: &str) -> Result<(), Error> {
        let module = self.modules.resolve(name);
        if self.modules.is_loaded(&module) {
            self.inform(&format!("Already loaded {}", module.name));
            return Ok(());
        }
        let code = module.read()?;
        tracing::debug!(
            module = %module.name,
            path = %module.path.display(),
            embedded = module.is_embedded(),
            "loading module"
        );

        self.modules.enter(&module);
        self.execute(&code);
        self.modules.leave();

        self.inform(&format!("Loaded {}", module.name));
        Ok(())
    }

    //
    // Output
    //

    fn display(&mut self, value: &Value) {
        if !self.modules.is_loading() {
            self.emit(&format!("{value}\n"));
        }
    }

    /// Messages for the interactive user; silent in scripts and while loading
    pub(crate) fn inform(&mut self, message: &str) {
        if self.options.repl && !self.modules.is_loading() {
            self.emit(&format!("{message}\n"));
        }
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        self.emit(text);
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush());
        if let Err(err) = result {
            tracing::warn!(%err, "failed to write program output");
        }
    }

    pub(crate) fn show_help(&mut self) {
        self.inform(HELP_TEXT);
        let names = self.scope.global_names().join(" ");
        self.inform(&format!("Defined names: {names}"));
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(message));
    }

    fn report_error(&mut self, err: &Error) {
        self.diagnostics.push(Diagnostic::error(err.to_string()));
    }

    //
    // Evaluation
    //

    /// Evaluate a subexpression in the current scope
    pub(crate) fn evaluate(&mut self, expr: &Value) -> Result<Value, Error> {
        match expr {
            Value::Symbol(name) => return self.scope.lookup(name),
            Value::List(items) if !items.is_empty() => {}
            other => return Ok(other.clone()),
        }

        if self.depth >= MAX_EVAL_DEPTH {
            return Err(Error::RecursionLimitExceeded);
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.run(expr.clone(), false));
        self.depth -= 1;
        result
    }

    /// The trampoline
    fn run(&mut self, mut expr: Value, mut top_level: bool) -> Result<Value, Error> {
        let mut pending_frame = None;
        loop {
            self.check_interrupt()?;
            let step = self.with_frame(pending_frame.take(), |program| program.step(expr, top_level))?;
            match step {
                Step::Done(value) => return Ok(value),
                Step::TailCall { body, frame } => {
                    tracing::trace!(%body, "tail call");
                    expr = body;
                    top_level = false;
                    pending_frame = Some(frame);
                }
            }
        }
    }

    /// Run `f` with `frame` as the innermost scope, popping it on every exit
    /// path. Without a frame the current scope is used.
    pub(crate) fn with_frame<R>(&mut self, frame: Option<Frame>, f: impl FnOnce(&mut Self) -> R) -> R {
        let Some(frame) = frame else {
            return f(self);
        };
        self.scope.push_frame(frame);
        let result = f(self);
        self.scope.pop_frame();
        result
    }

    fn check_interrupt(&self) -> Result<(), Error> {
        if self.interrupt.swap(false, Ordering::SeqCst) {
            tracing::debug!("evaluation interrupted");
            return Err(Error::UserInterrupt);
        }
        Ok(())
    }

    fn step(&mut self, expr: Value, top_level: bool) -> Result<Step, Error> {
        let Value::List(items) = expr else {
            return self.evaluate(&expr).map(Step::Done);
        };
        let Some(head_expr) = items.first() else {
            return Ok(Step::Done(nil()));
        };

        let head = self.evaluate(head_expr)?;
        tracing::debug!(%head, top_level, "step");
        match resolver::resolve(self, head, items[1..].to_vec())? {
            // Never a non-empty list, so this does not recurse further
            Resolved::Expr(expr) => self.evaluate(&expr).map(Step::Done),
            Resolved::Call { head, args } => self.apply(head, args, top_level),
        }
    }

    fn apply(&mut self, head: Value, args: Vec<Value>, top_level: bool) -> Result<Step, Error> {
        match head {
            Value::Builtin(op) => self.call_builtin(op, args, top_level).map(Step::Done),
            Value::Function(function) => {
                let args = self.evaluate_args(&args)?;
                let frame = binder::bind(self, &function.environment, &function.params, args)?;
                Ok(Step::TailCall {
                    body: function.body.clone(),
                    frame,
                })
            }
            other => Err(Error::NotCallable(other.to_string())),
        }
    }

    fn evaluate_args(&mut self, args: &[Value]) -> Result<Vec<Value>, Error> {
        args.iter().map(|arg| self.evaluate(arg)).collect()
    }

    fn call_builtin(
        &mut self,
        op: &'static BuiltinOp,
        args: Vec<Value>,
        top_level: bool,
    ) -> Result<Value, Error> {
        if op.top_level_only && !top_level {
            return Err(Error::CallContextError {
                name: op.name.to_owned(),
                restriction: "can only be called at top level",
            });
        }
        if op.repl_only && !self.options.repl {
            return Err(Error::CallContextError {
                name: op.name.to_owned(),
                restriction: "can only be used in REPL mode",
            });
        }

        let args = if op.is_macro() {
            args
        } else {
            self.evaluate_args(&args)?
        };
        op.arity.validate(op.name, args.len())?;

        match op.op_kind {
            OpKind::Function(func) | OpKind::Macro(func) => func(self, args)?.check_nesting(),
            // Rewritten by the resolver before dispatch
            OpKind::SpecialForm(_) => Err(Error::NotCallable(op.name.to_owned())),
        }
    }
}

#[cfg(test)]
impl Program {
    /// A quiet program without the core library, discarding output
    pub(crate) fn for_tests() -> Self {
        Program::with_output(
            Options {
                library: false,
                echo_diagnostics: false,
                ..Options::default()
            },
            io::sink(),
        )
    }
}
