//! Two-level name resolution: the innermost local frame, then the global
//! table. Outer frames stay on the stack but are never consulted.

use std::collections::HashMap;

use crate::Error;
use crate::ast::Value;
use crate::builtinops::get_builtin_ops;

/// Local bindings of one function or macro invocation
pub type Frame = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Scope {
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
}

impl Scope {
    /// Globals pre-populated with every builtin, and one empty top-level frame
    pub fn new() -> Self {
        let globals = get_builtin_ops()
            .iter()
            .map(|op| (op.name.to_owned(), Value::Builtin(op)))
            .collect();
        Scope {
            globals,
            frames: vec![Frame::new()],
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
            .ok_or_else(|| Error::UnboundName(name.to_owned()))
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Bind a global name, replacing any previous binding
    pub fn define_global(&mut self, name: String, value: Value) {
        self.globals.insert(name, value);
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        tracing::trace!(depth = self.frames.len(), bindings = frame.len(), "push frame");
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) {
        // The base frame is never popped
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        tracing::trace!(depth = self.frames.len(), "pop frame");
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame's bindings, sorted by name
    pub fn current_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<_> = self
            .frames
            .last()
            .map(|frame| {
                frame
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    pub fn global_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.globals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
