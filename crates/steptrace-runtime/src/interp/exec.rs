//! Statement execution.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use steptrace_syntax::ast::{
    Alias, BinOp, ClassDef, CondBranch, ExceptHandler, Expr, FunctionDef, Stmt, StmtKind,
};

use super::{Args, Frame, FrameKind, Interpreter};
use crate::builtins::Builtin;
use crate::error::{raise, ExcKind, Exception, RtResult};
use crate::scope::ScopeInfo;
use crate::value::{new_scope, Class, ClassBase, Cursor, Function, FunctionCode, Value};

/// How a statement finished, other than by raising.
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

impl Interpreter<'_> {
    /// Runs a module, function or class body. Its first statement always
    /// reports its line.
    pub(crate) fn exec_body(&mut self, body: &[Stmt]) -> RtResult<Flow> {
        self.exec_stmts(body, None)
    }

    /// Runs the suite of a compound statement. A first statement written on
    /// the header's own line (`if x: y = 1`) does not report that line again.
    pub(crate) fn exec_suite(&mut self, body: &[Stmt]) -> RtResult<Flow> {
        let header = self.frame().line;
        self.exec_stmts(body, Some(header))
    }

    fn exec_stmts(&mut self, body: &[Stmt], mut last_line: Option<u32>) -> RtResult<Flow> {
        for stmt in body {
            if last_line != Some(stmt.line) {
                self.fire_line(stmt.line);
                last_line = Some(stmt.line);
            }
            match self.exec_stmt(stmt) {
                Ok(Flow::Normal) => {}
                Ok(flow) => return Ok(flow),
                Err(exc) => return Err(self.attach_traceback(exc)),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> RtResult<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,
            StmtKind::AnnAssign { target, value } => {
                if let Some(value) = value {
                    let value = self.eval(value)?;
                    self.assign(target, value)?;
                }
            }
            StmtKind::If { branches, orelse } => return self.exec_if(branches, orelse.as_deref()),
            StmtKind::While { test, body, orelse } => {
                return self.exec_while(stmt.line, test, body, orelse.as_deref())
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => return self.exec_for(stmt.line, target, iter, body, orelse.as_deref()),
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass | StmtKind::Global(_) | StmtKind::Nonlocal(_) => {}
            StmtKind::FunctionDef(def) => {
                let func = self.make_function(def)?;
                self.store_name(&def.name, func)?;
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::ClassDef(class) => self.exec_class(class)?,
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => return self.exec_try(body, handlers, orelse.as_deref(), finalbody.as_deref()),
            StmtKind::Raise(expr) => {
                return Err(self.exception_to_raise(expr.as_ref()).unwrap_or_else(|e| e))
            }
            StmtKind::Assert { test, msg } => {
                let test = self.eval(test)?;
                if !self.truthy(&test)? {
                    let args = match msg {
                        Some(msg) => vec![self.eval(msg)?],
                        None => Vec::new(),
                    };
                    return Err(Exception::with_args(ExcKind::AssertionError, args));
                }
            }
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
            }
            StmtKind::Import(aliases) => self.exec_import(aliases)?,
            StmtKind::ImportFrom { module, names } => self.exec_import_from(module, names)?,
        }
        Ok(Flow::Normal)
    }

    fn exec_aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> RtResult<()> {
        match target {
            Expr::Name(name) => {
                let current = self.load_name(name)?;
                let rhs = self.eval(value)?;
                let result = self.inplace_op(op, current, rhs)?;
                self.store_name(name, result)
            }
            Expr::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                let current = self.get_attr(&object, attr)?;
                let rhs = self.eval(value)?;
                let result = self.inplace_op(op, current, rhs)?;
                self.set_attr(&object, attr, result)
            }
            Expr::Subscript {
                value: object,
                index,
            } => {
                let object = self.eval(object)?;
                let index = self.eval_index(index)?;
                let current = self.get_item(&object, &index)?;
                let rhs = self.eval(value)?;
                let result = self.inplace_op(op, current, rhs)?;
                self.set_item(&object, &index, result)
            }
            _ => raise(
                ExcKind::TypeError,
                "illegal expression for augmented assignment",
            ),
        }
    }

    fn exec_if(&mut self, branches: &[CondBranch], orelse: Option<&[Stmt]>) -> RtResult<Flow> {
        for (i, branch) in branches.iter().enumerate() {
            if i > 0 {
                self.fire_line(branch.line);
            }
            let test = self.eval(&branch.test)?;
            if self.truthy(&test)? {
                return self.exec_suite(&branch.body);
            }
        }
        match orelse {
            Some(body) => self.exec_suite(body),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_while(
        &mut self,
        line: u32,
        test: &Expr,
        body: &[Stmt],
        orelse: Option<&[Stmt]>,
    ) -> RtResult<Flow> {
        let mut first = true;
        loop {
            if !first {
                self.fire_line(line);
            }
            first = false;
            let cond = self.eval(test)?;
            if !self.truthy(&cond)? {
                break;
            }
            match self.exec_suite(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        match orelse {
            Some(body) => self.exec_suite(body),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_for(
        &mut self,
        line: u32,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        orelse: Option<&[Stmt]>,
    ) -> RtResult<Flow> {
        let iterable = self.eval(iter)?;
        let mut cursor = self.cursor(&iterable)?;
        let mut first = true;
        loop {
            if !first {
                self.fire_line(line);
            }
            first = false;
            let Some(item) = cursor.next()? else { break };
            self.assign(target, item)?;
            match self.exec_suite(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        match orelse {
            Some(body) => self.exec_suite(body),
            None => Ok(Flow::Normal),
        }
    }

    /// Iteration over any value, including instances defining `__iter__`.
    pub(crate) fn cursor(&mut self, value: &Value) -> RtResult<Cursor> {
        if let Value::Instance(instance) = value {
            if let Some(method) = instance.class.lookup("__iter__") {
                let iterator = self.call_value(&method, Args::positional(vec![value.clone()]))?;
                return Cursor::over(&iterator);
            }
        }
        Cursor::over(value)
    }

    /// Every item of an iterable, eagerly.
    pub(crate) fn iter_values(&mut self, value: &Value) -> RtResult<Vec<Value>> {
        match value {
            Value::Instance(_) => {
                let mut cursor = self.cursor(value)?;
                let mut items = Vec::new();
                while let Some(item) = cursor.next()? {
                    items.push(item);
                }
                Ok(items)
            }
            other => crate::value::collect(other),
        }
    }

    // -----------------------------------------------------------------------
    // Exceptions
    // -----------------------------------------------------------------------

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: Option<&[Stmt]>,
        finalbody: Option<&[Stmt]>,
    ) -> RtResult<Flow> {
        let outcome = match self.exec_suite(body) {
            Ok(Flow::Normal) => match orelse {
                Some(orelse) => self.exec_suite(orelse),
                None => Ok(Flow::Normal),
            },
            Ok(flow) => Ok(flow),
            Err(exc) => self.handle_exception(exc, handlers),
        };
        let Some(finalbody) = finalbody else {
            return outcome;
        };
        match self.exec_suite(finalbody)? {
            Flow::Normal => outcome,
            flow => Ok(flow),
        }
    }

    fn handle_exception(&mut self, exc: Exception, handlers: &[ExceptHandler]) -> RtResult<Flow> {
        for handler in handlers {
            self.fire_line(handler.line);
            let matched = match &handler.kind {
                None => true,
                Some(kind) => {
                    let class = self.eval(kind)?;
                    check_exception_class(&class)?;
                    exc.value.matches(&class)
                }
            };
            if !matched {
                continue;
            }
            if let Some(name) = &handler.name {
                self.store_name(name, Value::Exception(exc.value.clone()))?;
            }
            self.handling.push(exc.value.clone());
            let result = self.exec_suite(&handler.body);
            self.handling.pop();
            if let Some(name) = &handler.name {
                let _ = self.delete_name(name);
            }
            return result;
        }
        Err(exc)
    }

    /// The exception a `raise` statement raises. An `Err` here is a failure
    /// while evaluating the operand, which is raised instead.
    fn exception_to_raise(&mut self, expr: Option<&Expr>) -> RtResult<Exception> {
        let Some(expr) = expr else {
            return match self.handling.last() {
                Some(active) => Ok(Exception::from_obj(active.clone())),
                None => raise(ExcKind::RuntimeError, "No active exception to reraise"),
            };
        };
        let value = match self.eval(expr)? {
            Value::ExcClass(kind) => return Ok(Exception::with_args(kind, Vec::new())),
            Value::Class(class) if class.exception_root().is_some() => {
                self.instantiate(&class, Args::default())?
            }
            other => other,
        };
        match value {
            Value::Exception(obj) => Ok(Exception::from_obj(obj)),
            _ => raise(
                ExcKind::TypeError,
                "exceptions must derive from BaseException",
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    pub(crate) fn make_function(&mut self, def: &Rc<FunctionDef>) -> RtResult<Value> {
        let defaults = self.eval_defaults(&def.params)?;
        Ok(Value::Function(Rc::new(Function {
            name: Rc::from(def.name.as_str()),
            code: FunctionCode::Def(def.clone()),
            defaults,
            closure: RefCell::new(self.closure_env()),
            owner: RefCell::new(Weak::new()),
        })))
    }

    fn exec_class(&mut self, def: &Rc<ClassDef>) -> RtResult<()> {
        let base = match &def.base {
            None => None,
            Some(expr) => match self.eval(expr)? {
                Value::Class(class) => Some(ClassBase::User(class)),
                Value::ExcClass(kind) => Some(ClassBase::Exception(kind)),
                Value::Builtin(Builtin::Object) => None,
                Value::Builtin(builtin) if builtin.is_type() => {
                    return raise(
                        ExcKind::TypeError,
                        format!("subclassing '{}' is not supported", builtin.name()),
                    )
                }
                _ => return raise(ExcKind::TypeError, "bases must be types"),
            },
        };

        let key = Rc::as_ptr(def) as *const () as usize;
        let info = self
            .scope_cache
            .entry(key)
            .or_insert_with(|| Rc::new(ScopeInfo::for_block(&def.body)))
            .clone();
        let locals = new_scope();
        let frame = Frame {
            name: Rc::from(def.name.as_str()),
            line: def.line,
            kind: FrameKind::Class,
            locals: locals.clone(),
            env: self.closure_env(),
            info,
            comp_scopes: Vec::new(),
            function: None,
        };
        self.push_frame(frame)?;
        let result = self.exec_body(&def.body);
        self.pop_frame();
        result?;

        let attrs = std::mem::replace(&mut *locals.borrow_mut(), IndexMap::new());
        let class = Rc::new(Class {
            name: Rc::from(def.name.as_str()),
            base,
            attrs: RefCell::new(attrs),
        });
        for value in class.attrs.borrow().values() {
            if let Value::Function(func) = value {
                *func.owner.borrow_mut() = Rc::downgrade(&class);
            }
        }
        self.store_name(&def.name, Value::Class(class))
    }

    // -----------------------------------------------------------------------
    // Imports
    // -----------------------------------------------------------------------

    fn exec_import(&mut self, aliases: &[Alias]) -> RtResult<()> {
        for alias in aliases {
            let module = self.module(&alias.name)?;
            let bound = match &alias.asname {
                Some(asname) => asname.as_str(),
                None => alias.name.split('.').next().unwrap_or_default(),
            };
            self.store_name(bound, Value::Module(module))?;
        }
        Ok(())
    }

    fn exec_import_from(&mut self, module_name: &str, names: &[Alias]) -> RtResult<()> {
        let module = self.module(module_name)?;
        for alias in names {
            let value = module.attrs.get(alias.name.as_str()).cloned().ok_or_else(|| {
                Exception::new(
                    ExcKind::ImportError,
                    format!("cannot import name '{}' from '{module_name}'", alias.name),
                )
            })?;
            let bound = alias.asname.as_deref().unwrap_or(&alias.name);
            self.store_name(bound, value)?;
        }
        Ok(())
    }
}

/// `except` accepts exception classes and tuples of them, nothing else.
fn check_exception_class(class: &Value) -> RtResult<()> {
    match class {
        Value::Tuple(options) => options.iter().try_for_each(check_exception_class),
        other if other.is_exception_class() => Ok(()),
        _ => raise(
            ExcKind::TypeError,
            "catching classes that do not inherit from BaseException is not allowed",
        ),
    }
}
