//! Runtime value representation.
//!
//! [`Value`] is cheap to clone: scalars are stored inline and everything
//! mutable or large lives behind an `Rc`. Mutable containers use `RefCell`
//! so that aliasing behaves the way the traced language expects (appending
//! through one name is visible through every other name, and a list may
//! contain itself).
//!
//! Nothing in this module calls back into the interpreter, so a `RefCell`
//! borrow taken here never overlaps with user code running.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use steptrace_syntax::ast::{FunctionDef, LambdaDef, Params};

use crate::builtins::Builtin;
use crate::error::{raise, ExcKind, Exception, RtResult};

pub type Name = Rc<str>;

/// Attribute or variable bindings in insertion order.
pub type Bindings = IndexMap<Name, Value>;

/// A shared, mutable set of bindings: a frame's locals, the module globals,
/// or a closure's captured scope.
pub type Scope = Rc<RefCell<Bindings>>;

pub(crate) fn new_scope() -> Scope {
    Rc::new(RefCell::new(IndexMap::new()))
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<ListObj>),
    Tuple(Rc<[Value]>),
    Dict(Rc<DictObj>),
    Set(Rc<SetObj>),
    Range(RangeObj),
    Function(Rc<Function>),
    Builtin(Builtin),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    ExcClass(ExcKind),
    Exception(Rc<ExceptionObj>),
    Super(Rc<SuperObj>),
    Module(Rc<Module>),
    Iterator(Rc<IterObj>),
}

impl Value {
    pub fn str(text: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(ListObj::new(items))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict(entries: Vec<(Value, Value)>) -> RtResult<Value> {
        let dict = DictObj::new(DictKind::Dict);
        for (k, v) in entries {
            dict.insert(k, v)?;
        }
        Ok(Value::Dict(Rc::new(dict)))
    }

    /// The name `type(value).__name__` reports.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(l) => match l.kind {
                SeqKind::List => "list",
                SeqKind::Deque => "deque",
            },
            Value::Tuple(_) => "tuple",
            Value::Dict(d) => match d.kind {
                DictKind::Dict => "dict",
                DictKind::DefaultDict(_) => "defaultdict",
                DictKind::Counter => "Counter",
            },
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(b) if b.is_type() => "type",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::BoundMethod(_) => "method",
            Value::Class(_) | Value::ExcClass(_) => "type",
            Value::Instance(i) => &i.class.name,
            Value::Exception(e) => e.type_name(),
            Value::Super(_) => "super",
            Value::Module(_) => "module",
            Value::Iterator(it) => it.name,
        }
    }

    /// Truthiness for everything that does not involve user code. Instances
    /// are always true here; the interpreter consults `__bool__`/`__len__`
    /// before falling back to this.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.items.borrow().is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Dict(d) => !d.entries.borrow().is_empty(),
            Value::Set(s) => !s.items.borrow().is_empty(),
            Value::Range(r) => r.len() > 0,
            _ => true,
        }
    }

    /// The `is` operator.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || (a.is_empty() && b.is_empty()),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::ExcClass(a), Value::ExcClass(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Super(a), Value::Super(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// An address-like identity for `id()` and identity hashing.
    pub fn identity(&self) -> Option<usize> {
        let ptr = match self {
            Value::List(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Tuple(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Dict(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Set(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Function(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::BoundMethod(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Class(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Instance(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Exception(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Super(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Module(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Iterator(rc) => Rc::as_ptr(rc) as *const () as usize,
            Value::Str(rc) => Rc::as_ptr(rc) as *const () as usize,
            _ => return None,
        };
        Some(ptr)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_exception_class(&self) -> bool {
        match self {
            Value::ExcClass(_) => true,
            Value::Class(c) => c.exception_root().is_some(),
            _ => false,
        }
    }
}

/// Shallow on purpose: values can be cyclic.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(l) => match l.items.try_borrow() {
                Ok(items) => write!(f, "{}(len={})", self.type_name(), items.len()),
                Err(_) => write!(f, "{}(<borrowed>)", self.type_name()),
            },
            Value::Tuple(t) => write!(f, "tuple(len={})", t.len()),
            Value::Dict(d) => match d.entries.try_borrow() {
                Ok(entries) => write!(f, "{}(len={})", self.type_name(), entries.len()),
                Err(_) => write!(f, "{}(<borrowed>)", self.type_name()),
            },
            Value::Set(s) => match s.items.try_borrow() {
                Ok(items) => write!(f, "set(len={})", items.len()),
                Err(_) => f.write_str("set(<borrowed>)"),
            },
            Value::Range(r) => write!(f, "range({}, {}, {})", r.start, r.stop, r.step),
            Value::Function(func) => write!(f, "function({})", func.name),
            Value::Builtin(b) => write!(f, "builtin({})", b.name()),
            Value::BoundMethod(m) => write!(f, "method({})", m.name()),
            Value::Class(c) => write!(f, "class({})", c.name),
            Value::Instance(i) => write!(f, "instance({})", i.class.name),
            Value::ExcClass(k) => write!(f, "class({})", k.name()),
            Value::Exception(e) => write!(f, "exception({})", e.type_name()),
            Value::Super(s) => write!(f, "super({})", s.class.name),
            Value::Module(m) => write!(f, "module({})", m.name),
            Value::Iterator(it) => write!(f, "iterator({})", it.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// The hashable projection of a value, used as the key of dicts and sets.
///
/// Numbers that compare equal hash equal: `True`, `1` and `1.0` are the same
/// key. Strings and tuples hash by content, objects by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Box<[HashKey]>),
    Range(i64, i64, i64),
    Builtin(Builtin),
    ExcClass(ExcKind),
    Identity(usize),
}

impl HashKey {
    pub fn of(value: &Value) -> RtResult<HashKey> {
        let key = match value {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(*b as i64),
            Value::Int(i) => HashKey::Int(*i),
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    HashKey::Int(*f as i64)
                } else if f.is_nan() {
                    HashKey::Float(f64::NAN.to_bits())
                } else {
                    HashKey::Float(f.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(HashKey::of)
                    .collect::<RtResult<Vec<_>>>()?
                    .into_boxed_slice(),
            ),
            Value::Range(r) => HashKey::Range(r.start, r.stop, r.step),
            Value::Builtin(b) => HashKey::Builtin(*b),
            Value::ExcClass(k) => HashKey::ExcClass(*k),
            Value::List(_) | Value::Dict(_) | Value::Set(_) => {
                return raise(
                    ExcKind::TypeError,
                    format!("unhashable type: '{}'", value.type_name()),
                )
            }
            other => match other.identity() {
                Some(id) => HashKey::Identity(id),
                None => {
                    return raise(
                        ExcKind::TypeError,
                        format!("unhashable type: '{}'", other.type_name()),
                    )
                }
            },
        };
        Ok(key)
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {
    List,
    Deque,
}

/// An end of a linear sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Front,
    Back,
}

/// A `list` or `collections.deque`.
///
/// Besides its items, the object remembers the end from which an element was
/// most recently removed. That is the usage signal the tracer's structure
/// detector uses to tell a stack from a queue.
pub struct ListObj {
    pub kind: SeqKind,
    pub items: RefCell<Vec<Value>>,
    last_removal: Cell<Option<End>>,
}

impl ListObj {
    pub fn new(items: Vec<Value>) -> Rc<ListObj> {
        Rc::new(ListObj {
            kind: SeqKind::List,
            items: RefCell::new(items),
            last_removal: Cell::new(None),
        })
    }

    pub fn deque(items: Vec<Value>) -> Rc<ListObj> {
        Rc::new(ListObj {
            kind: SeqKind::Deque,
            items: RefCell::new(items),
            last_removal: Cell::new(None),
        })
    }

    pub fn last_removal(&self) -> Option<End> {
        self.last_removal.get()
    }

    pub(crate) fn note_removal(&self, end: End) {
        self.last_removal.set(Some(end));
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

#[derive(Clone)]
pub enum DictKind {
    Dict,
    /// `collections.defaultdict` with its default factory.
    DefaultDict(Value),
    /// `collections.Counter`: missing keys read as `0`.
    Counter,
}

/// A `dict` (or one of its `collections` variants). Each entry keeps the
/// original key object next to the value.
pub struct DictObj {
    pub kind: DictKind,
    pub entries: RefCell<IndexMap<HashKey, (Value, Value)>>,
}

impl DictObj {
    pub fn new(kind: DictKind) -> DictObj {
        DictObj {
            kind,
            entries: RefCell::new(IndexMap::new()),
        }
    }

    pub fn get(&self, key: &Value) -> RtResult<Option<Value>> {
        let hk = HashKey::of(key)?;
        Ok(self.entries.borrow().get(&hk).map(|(_, v)| v.clone()))
    }

    /// Inserts or overwrites. An existing entry keeps its original key object
    /// and its position.
    pub fn insert(&self, key: Value, value: Value) -> RtResult<()> {
        let hk = HashKey::of(&key)?;
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(&hk) {
            Some(slot) => slot.1 = value,
            None => {
                entries.insert(hk, (key, value));
            }
        }
        Ok(())
    }

    pub fn remove(&self, key: &Value) -> RtResult<Option<Value>> {
        let hk = HashKey::of(key)?;
        Ok(self.entries.borrow_mut().shift_remove(&hk).map(|(_, v)| v))
    }

    pub fn contains(&self, key: &Value) -> RtResult<bool> {
        let hk = HashKey::of(key)?;
        Ok(self.entries.borrow().contains_key(&hk))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.borrow().values().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.borrow().values().map(|(_, v)| v.clone()).collect()
    }

    pub fn items(&self) -> Vec<(Value, Value)> {
        self.entries.borrow().values().cloned().collect()
    }
}

pub struct SetObj {
    pub items: RefCell<IndexMap<HashKey, Value>>,
}

impl SetObj {
    pub fn new() -> SetObj {
        SetObj {
            items: RefCell::new(IndexMap::new()),
        }
    }

    pub fn from_values(values: Vec<Value>) -> RtResult<SetObj> {
        let set = SetObj::new();
        for v in values {
            set.add(v)?;
        }
        Ok(set)
    }

    pub fn add(&self, value: Value) -> RtResult<()> {
        let hk = HashKey::of(&value)?;
        self.items.borrow_mut().entry(hk).or_insert(value);
        Ok(())
    }

    pub fn contains(&self, value: &Value) -> RtResult<bool> {
        let hk = HashKey::of(value)?;
        Ok(self.items.borrow().contains_key(&hk))
    }

    pub fn remove(&self, value: &Value) -> RtResult<bool> {
        let hk = HashKey::of(value)?;
        Ok(self.items.borrow_mut().shift_remove(&hk).is_some())
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<Value> {
        self.items.borrow().values().cloned().collect()
    }
}

impl Default for SetObj {
    fn default() -> Self {
        SetObj::new()
    }
}

/// `range(start, stop, step)`; `step` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeObj {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeObj {
    pub fn len(&self) -> usize {
        let (lo, hi, step) = if self.step > 0 {
            (self.start as i128, self.stop as i128, self.step as i128)
        } else {
            (self.stop as i128, self.start as i128, -(self.step as i128))
        };
        if lo >= hi {
            0
        } else {
            ((hi - lo - 1) / step + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        Some((self.start as i128 + index as i128 * self.step as i128) as i64)
    }

    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            value >= self.start && value < self.stop
        } else {
            value <= self.start && value > self.stop
        };
        in_bounds && (value as i128 - self.start as i128) % self.step as i128 == 0
    }
}

// ---------------------------------------------------------------------------
// Callables and objects
// ---------------------------------------------------------------------------

/// A lexical scope captured by a nested function.
pub struct Env {
    pub(crate) scope: Scope,
    pub(crate) parent: Option<Rc<Env>>,
}

impl Env {
    /// The innermost captured scope that binds `name`.
    pub(crate) fn find(self: &Rc<Env>, name: &str) -> Option<Scope> {
        let mut env = Some(self.clone());
        while let Some(current) = env {
            if current.scope.borrow().contains_key(name) {
                return Some(current.scope.clone());
            }
            env = current.parent.clone();
        }
        None
    }
}

pub enum FunctionCode {
    Def(Rc<FunctionDef>),
    Lambda(Rc<LambdaDef>),
}

/// A user-defined function or lambda.
pub struct Function {
    pub name: Name,
    pub code: FunctionCode,
    /// Evaluated defaults, aligned with the trailing positional parameters.
    pub defaults: Vec<Value>,
    pub(crate) closure: RefCell<Option<Rc<Env>>>,
    /// The class whose body defined this function; used by `super()`.
    pub(crate) owner: RefCell<Weak<Class>>,
}

impl Function {
    pub fn params(&self) -> &Params {
        match &self.code {
            FunctionCode::Def(def) => &def.params,
            FunctionCode::Lambda(lambda) => &lambda.params,
        }
    }

    pub fn line(&self) -> u32 {
        match &self.code {
            FunctionCode::Def(def) => def.line,
            FunctionCode::Lambda(lambda) => lambda.line,
        }
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.code, FunctionCode::Lambda(_))
    }
}

pub enum Method {
    Function(Rc<Function>),
    /// A method implemented by the runtime, dispatched by name on the
    /// receiver's type.
    Native(&'static str),
}

pub struct BoundMethod {
    pub receiver: Value,
    pub method: Method,
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        match &self.method {
            Method::Function(f) => &f.name,
            Method::Native(name) => name,
        }
    }
}

#[derive(Clone)]
pub enum ClassBase {
    User(Rc<Class>),
    Exception(ExcKind),
}

pub struct Class {
    pub name: Name,
    pub base: Option<ClassBase>,
    pub attrs: RefCell<Bindings>,
}

impl Class {
    /// Looks `name` up on the class and then along its base chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.attrs.borrow().get(name) {
            return Some(v.clone());
        }
        let mut base = self.base.clone();
        while let Some(ClassBase::User(class)) = base {
            if let Some(v) = class.attrs.borrow().get(name) {
                return Some(v.clone());
            }
            base = class.base.clone();
        }
        None
    }

    /// The built-in exception class this class ultimately derives from.
    pub fn exception_root(&self) -> Option<ExcKind> {
        let mut base = self.base.clone();
        loop {
            match base {
                Some(ClassBase::User(class)) => base = class.base.clone(),
                Some(ClassBase::Exception(kind)) => return Some(kind),
                None => return None,
            }
        }
    }

    pub fn is_subclass_of(self: &Rc<Class>, other: &Rc<Class>) -> bool {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if Rc::ptr_eq(&class, other) {
                return true;
            }
            current = match &class.base {
                Some(ClassBase::User(base)) => Some(base.clone()),
                _ => None,
            };
        }
        false
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub attrs: RefCell<Bindings>,
}

/// An exception object. User exception classes produce these too, with
/// `class` set and `kind` naming the built-in root.
pub struct ExceptionObj {
    pub kind: ExcKind,
    pub class: Option<Rc<Class>>,
    pub args: RefCell<Vec<Value>>,
    pub attrs: RefCell<Bindings>,
}

impl ExceptionObj {
    pub fn new(kind: ExcKind, class: Option<Rc<Class>>, args: Vec<Value>) -> ExceptionObj {
        ExceptionObj {
            kind,
            class,
            args: RefCell::new(args),
            attrs: RefCell::new(IndexMap::new()),
        }
    }

    pub fn type_name(&self) -> &str {
        match &self.class {
            Some(class) => &class.name,
            None => self.kind.name(),
        }
    }

    /// Whether this exception is an instance of `class` (a built-in
    /// exception class, a user class, or a tuple of those).
    pub fn matches(&self, class: &Value) -> bool {
        match class {
            Value::ExcClass(kind) => self.kind.is_subclass_of(*kind),
            Value::Class(target) => match &self.class {
                Some(own) => own.is_subclass_of(target),
                None => false,
            },
            Value::Tuple(options) => options.iter().any(|option| self.matches(option)),
            _ => false,
        }
    }
}

impl fmt::Debug for ExceptionObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExceptionObj({})", self.type_name())
    }
}

/// The object returned by zero-argument `super()`.
pub struct SuperObj {
    pub class: Rc<Class>,
    pub receiver: Value,
}

pub struct Module {
    pub name: Name,
    pub attrs: Bindings,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({})", self.name)
    }
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

/// Iteration state over a value. `for` loops drive one directly; `iter()`
/// wraps one in an [`IterObj`].
pub enum Cursor {
    Items { items: Rc<[Value]>, index: usize },
    List { list: Rc<ListObj>, index: usize },
    Chars { text: Rc<str>, pos: usize },
    Range { next: i64, remaining: usize, step: i64 },
    Dict { dict: Rc<DictObj>, index: usize, len: usize },
    Set { set: Rc<SetObj>, index: usize, len: usize },
    Iter(Rc<IterObj>),
}

impl Cursor {
    pub fn over(value: &Value) -> RtResult<Cursor> {
        let cursor = match value {
            Value::List(list) => Cursor::List {
                list: list.clone(),
                index: 0,
            },
            Value::Tuple(items) => Cursor::Items {
                items: items.clone(),
                index: 0,
            },
            Value::Str(text) => Cursor::Chars {
                text: text.clone(),
                pos: 0,
            },
            Value::Range(r) => Cursor::Range {
                next: r.start,
                remaining: r.len(),
                step: r.step,
            },
            Value::Dict(dict) => Cursor::Dict {
                dict: dict.clone(),
                index: 0,
                len: dict.len(),
            },
            Value::Set(set) => Cursor::Set {
                set: set.clone(),
                index: 0,
                len: set.len(),
            },
            Value::Iterator(it) => Cursor::Iter(it.clone()),
            other => {
                return raise(
                    ExcKind::TypeError,
                    format!("'{}' object is not iterable", other.type_name()),
                )
            }
        };
        Ok(cursor)
    }

    pub fn next(&mut self) -> RtResult<Option<Value>> {
        let item = match self {
            Cursor::Items { items, index } => {
                let item = items.get(*index).cloned();
                *index += 1;
                item
            }
            Cursor::List { list, index } => {
                let item = list.items.borrow().get(*index).cloned();
                *index += 1;
                item
            }
            Cursor::Chars { text, pos } => {
                let ch = text[*pos..].chars().next();
                ch.map(|c| {
                    *pos += c.len_utf8();
                    Value::str(c.encode_utf8(&mut [0; 4]))
                })
            }
            Cursor::Range {
                next,
                remaining,
                step,
            } => {
                if *remaining == 0 {
                    None
                } else {
                    let value = *next;
                    *remaining -= 1;
                    *next = next.wrapping_add(*step);
                    Some(Value::Int(value))
                }
            }
            Cursor::Dict { dict, index, len } => {
                let entries = dict.entries.borrow();
                if entries.len() != *len {
                    return raise(ExcKind::RuntimeError, "dictionary changed size during iteration");
                }
                let key = entries.get_index(*index).map(|(_, (k, _))| k.clone());
                *index += 1;
                key
            }
            Cursor::Set { set, index, len } => {
                let items = set.items.borrow();
                if items.len() != *len {
                    return raise(ExcKind::RuntimeError, "Set changed size during iteration");
                }
                let item = items.get_index(*index).map(|(_, v)| v.clone());
                *index += 1;
                item
            }
            Cursor::Iter(it) => return it.next(),
        };
        Ok(item)
    }
}

/// An iterator object (`iter(x)`, `enumerate(...)`, `zip(...)`, ...).
pub struct IterObj {
    pub name: &'static str,
    pub(crate) cursor: RefCell<Cursor>,
}

impl IterObj {
    pub fn new(name: &'static str, cursor: Cursor) -> Rc<IterObj> {
        Rc::new(IterObj {
            name,
            cursor: RefCell::new(cursor),
        })
    }

    /// An iterator over already computed items.
    pub fn from_items(name: &'static str, items: Vec<Value>) -> Rc<IterObj> {
        IterObj::new(
            name,
            Cursor::Items {
                items: Rc::from(items),
                index: 0,
            },
        )
    }

    pub fn next(&self) -> RtResult<Option<Value>> {
        match self.cursor.try_borrow_mut() {
            Ok(mut cursor) => cursor.next(),
            Err(_) => raise(ExcKind::RuntimeError, "iterator already executing"),
        }
    }
}

/// Collects every remaining item of an iterable.
pub fn collect(value: &Value) -> RtResult<Vec<Value>> {
    match value {
        Value::List(list) => Ok(list.snapshot()),
        Value::Tuple(items) => Ok(items.to_vec()),
        Value::Dict(dict) => Ok(dict.keys()),
        Value::Set(set) => Ok(set.values()),
        other => {
            let mut cursor = Cursor::over(other)?;
            let mut out = Vec::new();
            while let Some(item) = cursor.next()? {
                out.push(item);
            }
            Ok(out)
        }
    }
}

impl From<Exception> for Value {
    fn from(exc: Exception) -> Value {
        Value::Exception(exc.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_unify() {
        assert_eq!(HashKey::of(&Value::Bool(true)).unwrap(), HashKey::Int(1));
        assert_eq!(HashKey::of(&Value::Float(1.0)).unwrap(), HashKey::Int(1));
        assert_ne!(HashKey::of(&Value::Float(1.5)).unwrap(), HashKey::Int(1));
    }

    #[test]
    fn mutable_containers_are_unhashable() {
        let err = HashKey::of(&Value::list(vec![])).unwrap_err();
        assert_eq!(err.kind(), ExcKind::TypeError);
        assert_eq!(err.message(), "unhashable type: 'list'");
    }

    #[test]
    fn dict_keeps_first_key_and_position() {
        let dict = DictObj::new(DictKind::Dict);
        dict.insert(Value::Int(1), Value::str("a")).unwrap();
        dict.insert(Value::str("b"), Value::Int(2)).unwrap();
        dict.insert(Value::Float(1.0), Value::str("c")).unwrap();
        let items = dict.items();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0].0, Value::Int(1)));
        assert!(matches!(&items[0].1, Value::Str(s) if &**s == "c"));
    }

    #[test]
    fn range_len_and_membership() {
        let r = RangeObj {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert_eq!(r.len(), 4);
        assert_eq!(r.get(3), Some(9));
        assert!(r.contains(6));
        assert!(!r.contains(7));

        let down = RangeObj {
            start: 5,
            stop: 0,
            step: -2,
        };
        assert_eq!(down.len(), 3);
        assert!(down.contains(1));
        assert!(RangeObj { start: 3, stop: 3, step: 1 }.is_empty());
    }

    #[test]
    fn list_cursor_sees_appends() {
        let list = ListObj::new(vec![Value::Int(1)]);
        let mut cursor = Cursor::over(&Value::List(list.clone())).unwrap();
        assert!(cursor.next().unwrap().is_some());
        list.items.borrow_mut().push(Value::Int(2));
        assert!(matches!(cursor.next().unwrap(), Some(Value::Int(2))));
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn dict_cursor_detects_resize() {
        let dict = Rc::new(DictObj::new(DictKind::Dict));
        dict.insert(Value::Int(1), Value::None).unwrap();
        let mut cursor = Cursor::over(&Value::Dict(dict.clone())).unwrap();
        dict.insert(Value::Int(2), Value::None).unwrap();
        let err = cursor.next().unwrap_err();
        assert_eq!(err.kind(), ExcKind::RuntimeError);
    }

    #[test]
    fn class_lookup_walks_bases() {
        let base = Rc::new(Class {
            name: "Base".into(),
            base: Some(ClassBase::Exception(ExcKind::ValueError)),
            attrs: RefCell::new(IndexMap::new()),
        });
        base.attrs.borrow_mut().insert("greeting".into(), Value::str("hi"));
        let child = Rc::new(Class {
            name: "Child".into(),
            base: Some(ClassBase::User(base.clone())),
            attrs: RefCell::new(IndexMap::new()),
        });
        assert!(matches!(child.lookup("greeting"), Some(Value::Str(_))));
        assert_eq!(child.exception_root(), Some(ExcKind::ValueError));
        assert!(child.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&child));
    }
}
