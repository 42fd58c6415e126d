//! Calls: argument binding, functions, classes, attributes and `super()`.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Frame, FrameKind, Interpreter};
use crate::error::{raise, ExcKind, Exception, RtResult};
use crate::methods;
use crate::value::{
    new_scope, BoundMethod, Class, ClassBase, DictKind, DictObj, ExceptionObj, Function,
    FunctionCode, Instance, Method, Name, Scope, SuperObj, Value,
};

/// Evaluated call arguments.
#[derive(Debug, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(Name, Value)>,
}

impl Args {
    pub fn positional(values: Vec<Value>) -> Args {
        Args {
            positional: values,
            keywords: Vec::new(),
        }
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub(crate) fn prepend(mut self, receiver: Value) -> Args {
        self.positional.insert(0, receiver);
        self
    }

    /// Removes and returns a keyword argument.
    pub(crate) fn keyword(&mut self, name: &str) -> Option<Value> {
        let pos = self.keywords.iter().position(|(k, _)| &**k == name)?;
        Some(self.keywords.remove(pos).1)
    }

    /// Fails on any keyword argument not consumed with [`Args::keyword`].
    pub(crate) fn finish(&self, function: &str) -> RtResult<()> {
        match self.keywords.first() {
            None => Ok(()),
            Some((name, _)) => raise(
                ExcKind::TypeError,
                format!("'{name}' is an invalid keyword argument for {function}()"),
            ),
        }
    }

    /// Checks the positional argument count.
    pub(crate) fn arity(&self, function: &str, min: usize, max: usize) -> RtResult<()> {
        let given = self.positional.len();
        if (min..=max).contains(&given) {
            return Ok(());
        }
        let expected = if min == max {
            format!("exactly {min} argument{}", plural(min))
        } else if given < min {
            format!("at least {min} argument{}", plural(min))
        } else {
            format!("at most {max} argument{}", plural(max))
        };
        raise(
            ExcKind::TypeError,
            format!("{function}() takes {expected} ({given} given)"),
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

impl Interpreter<'_> {
    pub(crate) fn call_value(&mut self, callee: &Value, args: Args) -> RtResult<Value> {
        match callee {
            Value::Function(func) => self.call_function(func, args),
            Value::Builtin(builtin) => self.call_builtin(*builtin, args),
            Value::BoundMethod(bound) => match &bound.method {
                Method::Function(func) => self.call_function(func, args.prepend(bound.receiver.clone())),
                Method::Native(name) => self.call_native(&bound.receiver, name, args),
            },
            Value::Class(class) => self.instantiate(class, args),
            Value::ExcClass(kind) => {
                args.finish(kind.name())?;
                Ok(Value::Exception(Rc::new(ExceptionObj::new(
                    *kind,
                    None,
                    args.positional,
                ))))
            }
            other => raise(
                ExcKind::TypeError,
                format!("'{}' object is not callable", other.type_name()),
            ),
        }
    }

    pub(crate) fn call_function(&mut self, func: &Rc<Function>, args: Args) -> RtResult<Value> {
        let locals = new_scope();
        bind_params(func, args, &locals)?;
        let info = self.scope_info(func);
        let frame = Frame {
            name: func.name.clone(),
            line: func.line(),
            kind: FrameKind::Function,
            locals,
            env: func.closure.borrow().clone(),
            info,
            comp_scopes: Vec::new(),
            function: Some(func.clone()),
        };
        self.push_frame(frame)?;
        let result = match &func.code {
            FunctionCode::Def(def) => self.exec_body(&def.body).map(|flow| match flow {
                super::Flow::Return(value) => value,
                _ => Value::None,
            }),
            FunctionCode::Lambda(lambda) => {
                self.fire_line(lambda.line);
                self.eval(&lambda.body).map_err(|exc| self.attach_traceback(exc))
            }
        };
        self.pop_frame();
        result
    }

    pub(crate) fn instantiate(&mut self, class: &Rc<Class>, args: Args) -> RtResult<Value> {
        let init = class.lookup("__init__");
        if let Some(kind) = class.exception_root() {
            let value = Value::Exception(Rc::new(ExceptionObj::new(
                kind,
                Some(class.clone()),
                args.positional.clone(),
            )));
            match init {
                Some(init) => {
                    self.call_value(&init, args.prepend(value.clone()))?;
                }
                None => args.finish(&class.name)?,
            }
            return Ok(value);
        }

        let instance = Value::Instance(Rc::new(Instance {
            class: class.clone(),
            attrs: RefCell::new(IndexMap::new()),
        }));
        match init {
            Some(init) => {
                let result = self.call_value(&init, args.prepend(instance.clone()))?;
                if !matches!(result, Value::None) {
                    return raise(
                        ExcKind::TypeError,
                        format!("__init__() should return None, not '{}'", result.type_name()),
                    );
                }
            }
            None if !args.is_empty() => {
                return raise(
                    ExcKind::TypeError,
                    format!("{}() takes no arguments", class.name),
                )
            }
            None => {}
        }
        Ok(instance)
    }

    /// Zero-argument `super()` inside a method, or `super(Class, obj)`.
    pub(crate) fn make_super(&mut self, args: Args) -> RtResult<Value> {
        if args.len() == 2 {
            return match (&args.positional[0], &args.positional[1]) {
                (Value::Class(class), receiver) => Ok(Value::Super(Rc::new(SuperObj {
                    class: class.clone(),
                    receiver: receiver.clone(),
                }))),
                _ => raise(ExcKind::TypeError, "super() argument 1 must be a type"),
            };
        }
        args.arity("super", 0, 0)?;
        let frame = self.frame();
        let Some(func) = frame.function.clone() else {
            return raise(ExcKind::RuntimeError, "super(): no arguments");
        };
        let Some(class) = func.owner.borrow().upgrade() else {
            return raise(ExcKind::RuntimeError, "super(): __class__ cell not found");
        };
        let receiver = func
            .params()
            .positional
            .first()
            .and_then(|param| frame.locals.borrow().get(param.name.as_str()).cloned());
        match receiver {
            Some(receiver) => Ok(Value::Super(Rc::new(SuperObj { class, receiver }))),
            None => raise(ExcKind::RuntimeError, "super(): no arguments"),
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    pub(crate) fn get_attr(&mut self, object: &Value, name: &str) -> RtResult<Value> {
        let found = match object {
            Value::Instance(instance) => {
                let own = instance.attrs.borrow().get(name).cloned();
                own.or_else(|| instance.class.lookup(name).map(|attr| bind(object, attr)))
                    .or_else(|| match name {
                        "__class__" => Some(Value::Class(instance.class.clone())),
                        _ => None,
                    })
            }
            Value::Exception(exc) => {
                let own = exc.attrs.borrow().get(name).cloned();
                own.or_else(|| {
                    exc.class
                        .as_ref()
                        .and_then(|class| class.lookup(name))
                        .map(|attr| bind(object, attr))
                })
                .or_else(|| match name {
                    "args" => Some(Value::tuple(exc.args.borrow().clone())),
                    _ => None,
                })
            }
            Value::Class(class) => class.lookup(name).or_else(|| match name {
                "__name__" => Some(Value::Str(class.name.clone())),
                _ => None,
            }),
            Value::Super(sup) => self.super_attr(sup, name),
            Value::Module(module) => module.attrs.get(name).cloned(),
            Value::Function(func) if name == "__name__" => Some(Value::Str(func.name.clone())),
            Value::Builtin(builtin) if name == "__name__" => Some(Value::str(builtin.name())),
            Value::ExcClass(kind) if name == "__name__" => Some(Value::str(kind.name())),
            _ => None,
        };
        if let Some(value) = found {
            return Ok(value);
        }
        if let Some(native) = methods::native_method(object, name) {
            return Ok(Value::BoundMethod(Rc::new(BoundMethod {
                receiver: object.clone(),
                method: Method::Native(native),
            })));
        }
        Err(no_attribute(object, name))
    }

    fn super_attr(&self, sup: &SuperObj, name: &str) -> Option<Value> {
        let mut base = sup.class.base.clone();
        while let Some(ClassBase::User(class)) = base {
            if let Some(attr) = class.attrs.borrow().get(name) {
                return Some(bind(&sup.receiver, attr.clone()));
            }
            base = class.base.clone();
        }
        // The chain ended at `object` or a built-in exception class.
        (name == "__init__").then(|| {
            Value::BoundMethod(Rc::new(BoundMethod {
                receiver: sup.receiver.clone(),
                method: Method::Native("__init__"),
            }))
        })
    }

    pub(crate) fn set_attr(&mut self, object: &Value, name: &str, value: Value) -> RtResult<()> {
        let attrs = match object {
            Value::Instance(instance) => &instance.attrs,
            Value::Exception(exc) if name == "args" => {
                *exc.args.borrow_mut() = self.iter_values(&value)?;
                return Ok(());
            }
            Value::Exception(exc) => &exc.attrs,
            Value::Class(class) => &class.attrs,
            other => {
                return raise(
                    ExcKind::AttributeError,
                    format!(
                        "'{}' object attribute '{name}' is read-only",
                        other.type_name()
                    ),
                )
            }
        };
        attrs.borrow_mut().insert(Rc::from(name), value);
        Ok(())
    }

    pub(crate) fn del_attr(&mut self, object: &Value, name: &str) -> RtResult<()> {
        let attrs = match object {
            Value::Instance(instance) => &instance.attrs,
            Value::Exception(exc) => &exc.attrs,
            Value::Class(class) => &class.attrs,
            other => return Err(no_attribute(other, name)),
        };
        let removed = attrs.borrow_mut().shift_remove(name);
        match removed {
            Some(_) => Ok(()),
            None => Err(no_attribute(object, name)),
        }
    }
}

/// Functions found on a class become methods bound to the receiver.
fn bind(receiver: &Value, attr: Value) -> Value {
    match attr {
        Value::Function(func) => Value::BoundMethod(Rc::new(BoundMethod {
            receiver: receiver.clone(),
            method: Method::Function(func),
        })),
        other => other,
    }
}

fn no_attribute(object: &Value, name: &str) -> Exception {
    let message = match object {
        Value::Class(class) => format!("type object '{}' has no attribute '{name}'", class.name),
        Value::Module(module) => format!("module '{}' has no attribute '{name}'", module.name),
        other => format!("'{}' object has no attribute '{name}'", other.type_name()),
    };
    Exception::new(ExcKind::AttributeError, message)
}

/// Binds call arguments to a function's parameters in a fresh scope.
fn bind_params(func: &Function, args: Args, locals: &Scope) -> RtResult<()> {
    let params = func.params();
    let name = &func.name;
    let count = params.positional.len();
    let Args {
        positional,
        keywords,
    } = args;

    let mut slots: Vec<Option<Value>> = vec![None; count];
    let mut extra = Vec::new();
    for (i, value) in positional.into_iter().enumerate() {
        match slots.get_mut(i) {
            Some(slot) => *slot = Some(value),
            None => extra.push(value),
        }
    }
    if !extra.is_empty() && params.vararg.is_none() {
        let given = count + extra.len();
        return raise(
            ExcKind::TypeError,
            format!(
                "{name}() takes {count} positional argument{} but {given} {} given",
                plural(count),
                if given == 1 { "was" } else { "were" }
            ),
        );
    }

    let kwargs = DictObj::new(DictKind::Dict);
    for (key, value) in keywords {
        match params.positional.iter().position(|p| *p.name == *key) {
            Some(i) if slots[i].is_some() => {
                return raise(
                    ExcKind::TypeError,
                    format!("{name}() got multiple values for argument '{key}'"),
                )
            }
            Some(i) => slots[i] = Some(value),
            None if params.kwarg.is_some() => kwargs.insert(Value::Str(key), value)?,
            None => {
                return raise(
                    ExcKind::TypeError,
                    format!("{name}() got an unexpected keyword argument '{key}'"),
                )
            }
        }
    }

    let first_default = count - func.defaults.len();
    let mut missing = Vec::new();
    let mut scope = locals.borrow_mut();
    for (i, (param, slot)) in params.positional.iter().zip(slots).enumerate() {
        let value = match slot {
            Some(value) => value,
            None if i >= first_default => func.defaults[i - first_default].clone(),
            None => {
                missing.push(format!("'{}'", param.name));
                continue;
            }
        };
        scope.insert(Rc::from(param.name.as_str()), value);
    }
    if !missing.is_empty() {
        let list = match missing.len() {
            1 => missing[0].clone(),
            2 => format!("{} and {}", missing[0], missing[1]),
            n => format!("{}, and {}", missing[..n - 1].join(", "), missing[n - 1]),
        };
        return raise(
            ExcKind::TypeError,
            format!(
                "{name}() missing {} required positional argument{}: {list}",
                missing.len(),
                plural(missing.len())
            ),
        );
    }
    if let Some(vararg) = &params.vararg {
        scope.insert(Rc::from(vararg.as_str()), Value::tuple(extra));
    }
    if let Some(kwarg) = &params.kwarg {
        scope.insert(Rc::from(kwarg.as_str()), Value::Dict(Rc::new(kwargs)));
    }
    Ok(())
}
