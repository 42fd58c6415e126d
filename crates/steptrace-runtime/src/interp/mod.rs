//! Tree-walking interpreter for the traced language.
//!
//! # Architecture
//!
//! [`Interpreter`] executes a parsed [`Module`] straight from the AST. Its state
//! is a stack of [`Frame`]s (the module body, one per active function or lambda
//! call, one per class body being executed), the module globals, and the
//! captured `print` output.
//!
//! - `exec` runs statements; `return`/`break`/`continue` travel up as a
//!   [`Flow`] value, exceptions as `Err`.
//! - `eval` evaluates expressions, assignments and comprehensions.
//! - `call` binds arguments and runs functions, classes and native methods.
//! - `ops` implements operators, comparison and truthiness, dispatching to
//!   dunder methods on instances.
//! - `subscript` implements indexing and slicing.
//!
//! Immediately before a source line runs, the interpreter calls the borrowed
//! [`LineHook`] with a view of the whole frame stack.

mod call;
mod eval;
mod exec;
mod ops;
mod subscript;

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use steptrace_syntax::ast::Module;

use crate::builtins;
use crate::error::{raise, ExcKind, Exception, RtResult, TracebackEntry};
use crate::hook::{LineContext, LineHook};
use crate::scope::ScopeInfo;
use crate::value::{
    new_scope, Bindings, ClassBase, Cursor, DictKind, Env, ExceptionObj, Function, FunctionCode,
    Method, Module as ModuleObj, Name, Scope, Value,
};

pub use call::Args;
pub(crate) use exec::Flow;

/// Configuration for the interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Maximum number of active frames, the module frame included.
    /// Default: 256. `sys.setrecursionlimit` may lower it but never raise it.
    pub max_recursion_depth: usize,
    /// How the program identifies itself in tracebacks and to line hooks.
    pub source_id: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_recursion_depth: 256,
            source_id: "<string>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Module,
    Function,
    Class,
}

/// One activation on the interpreter's frame stack.
pub(crate) struct Frame {
    pub name: Name,
    /// The line most recently reported for this frame.
    pub line: u32,
    pub kind: FrameKind,
    /// For the module frame this is the globals scope itself.
    pub locals: Scope,
    /// Enclosing function scopes visible to this frame.
    pub env: Option<Rc<Env>>,
    pub info: Rc<ScopeInfo>,
    /// Scopes of comprehensions currently running in this frame, innermost
    /// last. Comprehensions run inline and get no frame of their own.
    pub comp_scopes: Vec<Scope>,
    pub function: Option<Rc<Function>>,
}

/// Executes one program. Each instance owns all of its state; nothing is
/// shared between interpreters.
pub struct Interpreter<'h> {
    config: InterpreterConfig,
    hook: &'h mut dyn LineHook,
    globals: Scope,
    /// Never empty: the module frame is pushed on creation and never popped.
    frames: Vec<Frame>,
    output: String,
    inputs: VecDeque<Value>,
    scope_cache: HashMap<usize, Rc<ScopeInfo>>,
    modules: HashMap<&'static str, Rc<ModuleObj>>,
    /// Exceptions whose `except` clause is currently running, for bare
    /// `raise`.
    handling: Vec<Rc<ExceptionObj>>,
    recursion_limit: usize,
}

impl<'h> Interpreter<'h> {
    pub fn new(config: InterpreterConfig, hook: &'h mut dyn LineHook) -> Self {
        let globals = new_scope();
        let module_frame = Frame {
            name: Rc::from("<module>"),
            line: 0,
            kind: FrameKind::Module,
            locals: globals.clone(),
            env: None,
            info: Rc::new(ScopeInfo::default()),
            comp_scopes: Vec::new(),
            function: None,
        };
        let recursion_limit = config.max_recursion_depth;
        Interpreter {
            config,
            hook,
            globals,
            frames: vec![module_frame],
            output: String::new(),
            inputs: VecDeque::new(),
            scope_cache: HashMap::new(),
            modules: HashMap::new(),
            handling: Vec::new(),
            recursion_limit,
        }
    }

    /// Supplies the values `input()` returns, in order. A non-empty list is
    /// also bound to the global `input_data`.
    pub fn set_inputs(&mut self, inputs: Vec<Value>) {
        if !inputs.is_empty() {
            self.globals
                .borrow_mut()
                .insert(Rc::from("input_data"), Value::list(inputs.clone()));
        }
        self.inputs = inputs.into();
    }

    /// Runs the program to completion or to its first uncaught exception.
    pub fn run(&mut self, module: &Module) -> RtResult<()> {
        tracing::debug!(statements = module.body.len(), "running module");
        self.exec_body(&module.body).map(|_| ())
    }

    /// Everything the program printed so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// The module globals in binding order.
    pub fn globals(&self) -> Vec<(Name, Value)> {
        self.globals
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Tears down every object graph reachable from the globals so that
    /// reference cycles created by the program (a list containing itself,
    /// a function that closes over its own scope) are freed.
    pub fn reclaim(self) {
        let mut seen = HashSet::new();
        let mut pending: Vec<Value> = std::mem::take(&mut *self.globals.borrow_mut())
            .into_values()
            .collect();
        for module in self.modules.values() {
            pending.extend(module.attrs.values().cloned());
        }

        while let Some(value) = pending.pop() {
            let Some(id) = value.identity() else { continue };
            if !seen.insert(id) {
                continue;
            }
            match &value {
                Value::List(list) => pending.extend(list.items.borrow_mut().drain(..)),
                Value::Tuple(items) => pending.extend(items.iter().cloned()),
                Value::Dict(dict) => {
                    if let DictKind::DefaultDict(factory) = &dict.kind {
                        pending.push(factory.clone());
                    }
                    let entries = std::mem::take(&mut *dict.entries.borrow_mut());
                    for (_, (k, v)) in entries {
                        pending.push(k);
                        pending.push(v);
                    }
                }
                Value::Set(set) => {
                    pending.extend(std::mem::take(&mut *set.items.borrow_mut()).into_values())
                }
                Value::Function(func) => {
                    pending.extend(func.defaults.iter().cloned());
                    let mut env = func.closure.borrow_mut().take();
                    while let Some(current) = env {
                        pending.extend(drain(&current.scope));
                        env = current.parent.clone();
                    }
                }
                Value::BoundMethod(method) => {
                    pending.push(method.receiver.clone());
                    if let Method::Function(func) = &method.method {
                        pending.push(Value::Function(func.clone()));
                    }
                }
                Value::Class(class) => {
                    pending.extend(std::mem::take(&mut *class.attrs.borrow_mut()).into_values());
                    if let Some(ClassBase::User(base)) = &class.base {
                        pending.push(Value::Class(base.clone()));
                    }
                }
                Value::Instance(instance) => {
                    pending.extend(std::mem::take(&mut *instance.attrs.borrow_mut()).into_values());
                    pending.push(Value::Class(instance.class.clone()));
                }
                Value::Exception(exc) => {
                    pending.extend(exc.args.borrow_mut().drain(..));
                    pending.extend(std::mem::take(&mut *exc.attrs.borrow_mut()).into_values());
                    if let Some(class) = &exc.class {
                        pending.push(Value::Class(class.clone()));
                    }
                }
                Value::Super(sup) => {
                    pending.push(sup.receiver.clone());
                    pending.push(Value::Class(sup.class.clone()));
                }
                Value::Module(module) => pending.extend(module.attrs.values().cloned()),
                Value::Iterator(it) => {
                    let cursor = std::mem::replace(
                        &mut *it.cursor.borrow_mut(),
                        Cursor::Items {
                            items: Rc::from(Vec::new()),
                            index: 0,
                        },
                    );
                    match cursor {
                        Cursor::Items { items, .. } => pending.extend(items.iter().cloned()),
                        Cursor::List { list, .. } => pending.push(Value::List(list)),
                        Cursor::Dict { dict, .. } => pending.push(Value::Dict(dict)),
                        Cursor::Set { set, .. } => pending.push(Value::Set(set)),
                        Cursor::Iter(inner) => pending.push(Value::Iterator(inner)),
                        Cursor::Chars { .. } | Cursor::Range { .. } => {}
                    }
                }
                _ => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Frames and line events
    // -----------------------------------------------------------------------

    pub(crate) fn frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Marks `line` as executing in the current frame and notifies the hook.
    pub(crate) fn fire_line(&mut self, line: u32) {
        self.frame_mut().line = line;
        let ctx = LineContext {
            source_id: &self.config.source_id,
            frames: &self.frames,
        };
        self.hook.on_line(&ctx);
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) -> RtResult<()> {
        if self.frames.len() >= self.recursion_limit {
            return raise(ExcKind::RecursionError, "maximum recursion depth exceeded");
        }
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Records where an exception was raised, the first time it leaves a
    /// statement.
    pub(crate) fn attach_traceback(&self, mut exc: Exception) -> Exception {
        if exc.traceback.is_empty() {
            exc.traceback = self
                .frames
                .iter()
                .map(|frame| TracebackEntry {
                    function: frame.name.clone(),
                    line: frame.line,
                })
                .collect();
        }
        exc
    }

    pub(crate) fn scope_info(&mut self, func: &Function) -> Rc<ScopeInfo> {
        let key = match &func.code {
            FunctionCode::Def(def) => Rc::as_ptr(def) as *const () as usize,
            FunctionCode::Lambda(lambda) => Rc::as_ptr(lambda) as *const () as usize,
        };
        self.scope_cache
            .entry(key)
            .or_insert_with(|| {
                Rc::new(match &func.code {
                    FunctionCode::Def(def) => ScopeInfo::for_function(&def.params, &def.body),
                    FunctionCode::Lambda(lambda) => ScopeInfo::for_lambda(&lambda.params),
                })
            })
            .clone()
    }

    pub(crate) fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Lowers (or restores) the frame limit, capped at the configured
    /// maximum.
    pub(crate) fn set_recursion_limit(&mut self, limit: i64) -> RtResult<()> {
        if limit < 1 {
            return raise(
                ExcKind::ValueError,
                "recursion limit must be greater or equal than 1",
            );
        }
        let limit = (limit as u64).min(self.config.max_recursion_depth as u64) as usize;
        if limit <= self.frames.len() {
            return raise(
                ExcKind::RecursionError,
                format!(
                    "cannot set the recursion limit to {limit} at the recursion depth {}: the limit is too low",
                    self.frames.len()
                ),
            );
        }
        self.recursion_limit = limit;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    pub(crate) fn load_name(&self, name: &str) -> RtResult<Value> {
        let frame = self.frame();
        for scope in frame.comp_scopes.iter().rev() {
            if let Some(value) = scope.borrow().get(name) {
                return Ok(value.clone());
            }
        }
        match frame.kind {
            FrameKind::Function if !frame.info.globals.contains(name) => {
                if frame.info.locals.contains(name) {
                    return match frame.locals.borrow().get(name) {
                        Some(value) => Ok(value.clone()),
                        None => raise(
                            ExcKind::UnboundLocalError,
                            format!(
                                "cannot access local variable '{name}' where it is not associated with a value"
                            ),
                        ),
                    };
                }
                if let Some(value) = lookup_env(frame.env.as_ref(), name) {
                    return Ok(value);
                }
            }
            FrameKind::Class => {
                if let Some(value) = frame.locals.borrow().get(name) {
                    return Ok(value.clone());
                }
                if let Some(value) = lookup_env(frame.env.as_ref(), name) {
                    return Ok(value);
                }
            }
            FrameKind::Function | FrameKind::Module => {}
        }
        if let Some(value) = self.globals.borrow().get(name) {
            return Ok(value.clone());
        }
        builtins::lookup(name).ok_or_else(|| {
            Exception::new(ExcKind::NameError, format!("name '{name}' is not defined"))
        })
    }

    /// The scope an assignment to `name` writes to in the current frame.
    fn binding_scope(&self, name: &str) -> Scope {
        let frame = self.frame();
        if let Some(scope) = frame.comp_scopes.last() {
            return scope.clone();
        }
        match frame.kind {
            FrameKind::Module => self.globals.clone(),
            _ if frame.info.globals.contains(name) => self.globals.clone(),
            FrameKind::Function if frame.info.nonlocals.contains(name) => frame
                .env
                .as_ref()
                .and_then(|env| env.find(name))
                .unwrap_or_else(|| frame.locals.clone()),
            FrameKind::Function | FrameKind::Class => frame.locals.clone(),
        }
    }

    pub(crate) fn store_name(&mut self, name: &str, value: Value) -> RtResult<()> {
        self.binding_scope(name)
            .borrow_mut()
            .insert(Rc::from(name), value);
        Ok(())
    }

    pub(crate) fn delete_name(&mut self, name: &str) -> RtResult<()> {
        match self.binding_scope(name).borrow_mut().shift_remove(name) {
            Some(_) => Ok(()),
            None => raise(ExcKind::NameError, format!("name '{name}' is not defined")),
        }
    }

    /// The environment a function defined right now closes over.
    pub(crate) fn closure_env(&self) -> Option<Rc<Env>> {
        let frame = self.frame();
        let mut env = match frame.kind {
            FrameKind::Module => None,
            FrameKind::Function => Some(Rc::new(Env {
                scope: frame.locals.clone(),
                parent: frame.env.clone(),
            })),
            FrameKind::Class => frame.env.clone(),
        };
        for scope in &frame.comp_scopes {
            env = Some(Rc::new(Env {
                scope: scope.clone(),
                parent: env,
            }));
        }
        env
    }

    // -----------------------------------------------------------------------
    // I/O
    // -----------------------------------------------------------------------

    pub(crate) fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub(crate) fn next_input(&mut self) -> Option<Value> {
        self.inputs.pop_front()
    }

    pub(crate) fn module(&mut self, name: &str) -> RtResult<Rc<ModuleObj>> {
        if let Some(module) = self.modules.get(name) {
            return Ok(module.clone());
        }
        let (key, module) = crate::modules::load(name)?;
        self.modules.insert(key, module.clone());
        Ok(module)
    }
}

fn lookup_env(env: Option<&Rc<Env>>, name: &str) -> Option<Value> {
    let scope = env?.find(name)?;
    let value = scope.borrow().get(name).cloned();
    value
}

fn drain(scope: &Scope) -> Vec<Value> {
    let bindings: Bindings = std::mem::take(&mut *scope.borrow_mut());
    bindings.into_values().collect()
}
