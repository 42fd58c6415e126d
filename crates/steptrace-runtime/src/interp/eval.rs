//! Expression evaluation, assignment targets and comprehensions.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use steptrace_syntax::ast::{
    Arg, BoolOp, CompFor, CompKind, Constant, Expr, FStringPart, LambdaDef, Params,
};

use super::subscript::Index;
use super::{Args, Interpreter};
use crate::error::{raise, ExcKind, RtResult};
use crate::format;
use crate::value::{new_scope, DictKind, DictObj, Function, FunctionCode, IterObj, SetObj, Value};

/// What a comprehension produces per iteration.
#[derive(Clone, Copy)]
enum CompElt<'e> {
    Single(&'e Expr),
    Pair(&'e Expr, &'e Expr),
}

impl Interpreter<'_> {
    pub(crate) fn eval(&mut self, expr: &Expr) -> RtResult<Value> {
        match expr {
            Expr::Name(name) => self.load_name(name),
            Expr::Constant(constant) => Ok(match constant {
                Constant::None => Value::None,
                Constant::Bool(b) => Value::Bool(*b),
                Constant::Int(i) => Value::Int(*i),
                Constant::Float(f) => Value::Float(*f),
                Constant::Str(s) => Value::Str(s.clone()),
            }),
            Expr::FString(parts) => self.eval_fstring(parts),
            Expr::List(items) => Ok(Value::list(self.eval_items(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_items(items)?)),
            Expr::Set(items) => {
                let items = self.eval_items(items)?;
                Ok(Value::Set(Rc::new(SetObj::from_values(items)?)))
            }
            Expr::Dict(pairs) => {
                let dict = DictObj::new(DictKind::Dict);
                for (key, value) in pairs {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    dict.insert(key, value)?;
                }
                Ok(Value::Dict(Rc::new(dict)))
            }
            Expr::Starred(_) => raise(
                ExcKind::TypeError,
                "can't use starred expression here",
            ),
            Expr::BinOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary_op(*op, &left, &right)
            }
            Expr::UnaryOp { op, operand } => {
                let operand = self.eval(operand)?;
                self.unary_op(*op, &operand)
            }
            Expr::BoolOp { op, values } => {
                let mut result = Value::None;
                for value in values {
                    result = self.eval(value)?;
                    let truthy = self.truthy(&result)?;
                    match op {
                        BoolOp::And if !truthy => break,
                        BoolOp::Or if truthy => break,
                        _ => {}
                    }
                }
                Ok(result)
            }
            Expr::Compare { left, ops } => {
                let mut left = self.eval(left)?;
                for (op, right) in ops {
                    let right = self.eval(right)?;
                    if !self.compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp { test, body, orelse } => {
                let test = self.eval(test)?;
                if self.truthy(&test)? {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Lambda(lambda) => self.make_lambda(lambda),
            Expr::Call { func, args } => {
                let callee = self.eval(func)?;
                let args = self.eval_args(args)?;
                self.call_value(&callee, args)
            }
            Expr::Attribute { value, attr } => {
                let value = self.eval(value)?;
                self.get_attr(&value, attr)
            }
            Expr::Subscript { value, index } => {
                let value = self.eval(value)?;
                let index = self.eval_index(index)?;
                self.get_item(&value, &index)
            }
            Expr::Slice { .. } => raise(ExcKind::TypeError, "slice is only valid as an index"),
            Expr::Comprehension {
                kind,
                elt,
                generators,
            } => {
                let items = self.run_comprehension(generators, CompElt::Single(elt))?;
                Ok(match kind {
                    CompKind::List => Value::list(items),
                    CompKind::Set => Value::Set(Rc::new(SetObj::from_values(items)?)),
                    CompKind::Generator => Value::Iterator(IterObj::from_items("generator", items)),
                })
            }
            Expr::DictComp {
                key,
                value,
                generators,
            } => {
                let items = self.run_comprehension(generators, CompElt::Pair(key, value))?;
                let dict = DictObj::new(DictKind::Dict);
                let mut items = items.into_iter();
                while let (Some(key), Some(value)) = (items.next(), items.next()) {
                    dict.insert(key, value)?;
                }
                Ok(Value::Dict(Rc::new(dict)))
            }
        }
    }

    /// Display items, expanding `*iterable`.
    fn eval_items(&mut self, items: &[Expr]) -> RtResult<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expr::Starred(inner) => {
                    let value = self.eval(inner)?;
                    out.extend(self.iter_values(&value)?);
                }
                other => out.push(self.eval(other)?),
            }
        }
        Ok(out)
    }

    fn eval_args(&mut self, args: &[Arg]) -> RtResult<Args> {
        let mut out = Args::default();
        for arg in args {
            match arg {
                Arg::Positional(expr) => out.positional.push(self.eval(expr)?),
                Arg::Star(expr) => {
                    let value = self.eval(expr)?;
                    out.positional.extend(self.iter_values(&value)?);
                }
                Arg::Keyword(name, expr) => {
                    let value = self.eval(expr)?;
                    out.keywords.push((Rc::from(name.as_str()), value));
                }
                Arg::DoubleStar(expr) => match self.eval(expr)? {
                    Value::Dict(dict) => {
                        for (key, value) in dict.items() {
                            match key {
                                Value::Str(name) => out.keywords.push((name, value)),
                                _ => return raise(ExcKind::TypeError, "keywords must be strings"),
                            }
                        }
                    }
                    other => {
                        return raise(
                            ExcKind::TypeError,
                            format!(
                                "argument after ** must be a mapping, not {}",
                                other.type_name()
                            ),
                        )
                    }
                },
            }
        }
        Ok(out)
    }

    fn eval_fstring(&mut self, parts: &[FStringPart]) -> RtResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Field {
                    expr,
                    conversion,
                    spec,
                } => {
                    let value = self.eval(expr)?;
                    let value = match conversion {
                        Some('r') | Some('a') => Value::str(format::repr(&value, self)?),
                        Some(_) => Value::str(format::to_str(&value, self)?),
                        None => value,
                    };
                    let text = match spec.as_deref() {
                        Some(spec) if !spec.is_empty() => format::format_value(&value, spec, self)?,
                        _ => format::to_str(&value, self)?,
                    };
                    out.push_str(&text);
                }
            }
        }
        Ok(Value::str(out))
    }

    pub(crate) fn eval_defaults(&mut self, params: &Params) -> RtResult<Vec<Value>> {
        params
            .positional
            .iter()
            .filter_map(|param| param.default.as_ref())
            .map(|default| self.eval(default))
            .collect()
    }

    fn make_lambda(&mut self, lambda: &Rc<LambdaDef>) -> RtResult<Value> {
        let defaults = self.eval_defaults(&lambda.params)?;
        Ok(Value::Function(Rc::new(Function {
            name: Rc::from("<lambda>"),
            code: FunctionCode::Lambda(lambda.clone()),
            defaults,
            closure: RefCell::new(self.closure_env()),
            owner: RefCell::new(Weak::new()),
        })))
    }

    pub(crate) fn eval_index(&mut self, index: &Expr) -> RtResult<Index> {
        match index {
            Expr::Slice { lower, upper, step } => {
                let mut bound = |expr: &Option<Box<Expr>>| -> RtResult<Option<i64>> {
                    match expr {
                        None => Ok(None),
                        Some(expr) => match self.eval(expr)? {
                            Value::None => Ok(None),
                            value => match value.as_int() {
                                Some(i) => Ok(Some(i)),
                                None => raise(
                                    ExcKind::TypeError,
                                    "slice indices must be integers or None or have an __index__ method",
                                ),
                            },
                        },
                    }
                };
                let lower = bound(lower)?;
                let upper = bound(upper)?;
                let step = bound(step)?;
                Ok(Index::Slice { lower, upper, step })
            }
            other => Ok(Index::Item(self.eval(other)?)),
        }
    }

    // -----------------------------------------------------------------------
    // Targets
    // -----------------------------------------------------------------------

    pub(crate) fn assign(&mut self, target: &Expr, value: Value) -> RtResult<()> {
        match target {
            Expr::Name(name) => self.store_name(name, value),
            Expr::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                self.set_attr(&object, attr, value)
            }
            Expr::Subscript {
                value: object,
                index,
            } => {
                let object = self.eval(object)?;
                let index = self.eval_index(index)?;
                self.set_item(&object, &index, value)
            }
            Expr::Tuple(targets) | Expr::List(targets) => self.unpack(targets, value),
            Expr::Starred(_) => raise(
                ExcKind::TypeError,
                "starred assignment target must be in a list or tuple",
            ),
            _ => raise(ExcKind::TypeError, "cannot assign to expression"),
        }
    }

    fn unpack(&mut self, targets: &[Expr], value: Value) -> RtResult<()> {
        let mut items = self.iter_values(&value)?;
        let star = targets.iter().position(|t| matches!(t, Expr::Starred(_)));
        let Some(star) = star else {
            if items.len() > targets.len() {
                return raise(
                    ExcKind::ValueError,
                    format!("too many values to unpack (expected {})", targets.len()),
                );
            }
            if items.len() < targets.len() {
                return raise(
                    ExcKind::ValueError,
                    format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    ),
                );
            }
            for (target, item) in targets.iter().zip(items) {
                self.assign(target, item)?;
            }
            return Ok(());
        };

        let fixed = targets.len() - 1;
        if items.len() < fixed {
            return raise(
                ExcKind::ValueError,
                format!(
                    "not enough values to unpack (expected at least {fixed}, got {})",
                    items.len()
                ),
            );
        }
        let after = targets.len() - star - 1;
        let tail = items.split_off(items.len() - after);
        let middle = items.split_off(star);
        for (target, item) in targets[..star].iter().zip(items) {
            self.assign(target, item)?;
        }
        if let Expr::Starred(inner) = &targets[star] {
            self.assign(inner, Value::list(middle))?;
        }
        for (target, item) in targets[star + 1..].iter().zip(tail) {
            self.assign(target, item)?;
        }
        Ok(())
    }

    pub(crate) fn delete_target(&mut self, target: &Expr) -> RtResult<()> {
        match target {
            Expr::Name(name) => self.delete_name(name),
            Expr::Attribute { value, attr } => {
                let value = self.eval(value)?;
                self.del_attr(&value, attr)
            }
            Expr::Subscript { value, index } => {
                let value = self.eval(value)?;
                let index = self.eval_index(index)?;
                self.del_item(&value, &index)
            }
            Expr::Tuple(items) | Expr::List(items) => {
                items.iter().try_for_each(|item| self.delete_target(item))
            }
            _ => raise(ExcKind::TypeError, "cannot delete expression"),
        }
    }

    // -----------------------------------------------------------------------
    // Comprehensions
    // -----------------------------------------------------------------------

    fn run_comprehension(&mut self, generators: &[CompFor], elt: CompElt<'_>) -> RtResult<Vec<Value>> {
        self.frame_mut().comp_scopes.push(new_scope());
        let mut out = Vec::new();
        let result = self.comp_loop(generators, elt, &mut out);
        self.frame_mut().comp_scopes.pop();
        result.map(|()| out)
    }

    fn comp_loop(
        &mut self,
        generators: &[CompFor],
        elt: CompElt<'_>,
        out: &mut Vec<Value>,
    ) -> RtResult<()> {
        let Some((clause, rest)) = generators.split_first() else {
            match elt {
                CompElt::Single(expr) => out.push(self.eval(expr)?),
                CompElt::Pair(key, value) => {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    out.push(key);
                    out.push(value);
                }
            }
            return Ok(());
        };
        let iterable = self.eval(&clause.iter)?;
        let mut cursor = self.cursor(&iterable)?;
        'items: while let Some(item) = cursor.next()? {
            self.assign(&clause.target, item)?;
            for cond in &clause.ifs {
                let cond = self.eval(cond)?;
                if !self.truthy(&cond)? {
                    continue 'items;
                }
            }
            self.comp_loop(rest, elt, out)?;
        }
        Ok(())
    }
}
