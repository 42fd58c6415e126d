//! Expression lowering.

use std::rc::Rc;

use tree_sitter::Node;

use super::{has_comma, line, named, LResult, Lowerer};
use crate::ast::*;

impl<'s> Lowerer<'s> {
    pub(crate) fn expr(&mut self, node: Node<'_>) -> LResult<Expr> {
        self.nested(node, |this| this.expr_kind(node))
    }

    pub(crate) fn exprs(&mut self, nodes: &[Node<'_>]) -> LResult<Vec<Expr>> {
        nodes.iter().map(|node| self.expr(*node)).collect()
    }

    /// An assignment, `for` or comprehension target.
    pub(crate) fn target(&mut self, node: Node<'_>) -> LResult<Expr> {
        let target = self.expr(node)?;
        if !target.is_assignable() {
            return Err(self.error(node, "cannot assign to expression"));
        }
        Ok(target)
    }

    fn expr_kind(&mut self, node: Node<'_>) -> LResult<Expr> {
        match node.kind() {
            "identifier" | "keyword_identifier" => Ok(Expr::Name(self.text(node).to_string())),
            "integer" => Ok(Expr::int(self.integer(node)?)),
            "float" => Ok(Expr::Constant(Constant::Float(self.float(node)?))),
            "true" => Ok(Expr::Constant(Constant::Bool(true))),
            "false" => Ok(Expr::Constant(Constant::Bool(false))),
            "none" => Ok(Expr::Constant(Constant::None)),
            "string" | "concatenated_string" => self.strings(node),

            "parenthesized_expression" => self.bracketed(node, |this| this.parenthesized(node)),
            "tuple" | "tuple_pattern" => {
                self.bracketed(node, |this| Ok(Expr::Tuple(this.exprs(&named(node))?)))
            }
            "expression_list" | "pattern_list" => Ok(Expr::Tuple(self.exprs(&named(node))?)),
            "list" | "list_pattern" => {
                self.bracketed(node, |this| Ok(Expr::List(this.exprs(&named(node))?)))
            }
            "set" => self.bracketed(node, |this| Ok(Expr::Set(this.exprs(&named(node))?))),
            "dictionary" => self.bracketed(node, |this| this.dictionary(node)),
            "list_comprehension" => self.bracketed(node, |this| this.comprehension(node, CompKind::List)),
            "set_comprehension" => self.bracketed(node, |this| this.comprehension(node, CompKind::Set)),
            "generator_expression" => {
                self.bracketed(node, |this| this.comprehension(node, CompKind::Generator))
            }
            "dictionary_comprehension" => self.bracketed(node, |this| this.dict_comprehension(node)),
            "list_splat" | "list_splat_pattern" => Ok(Expr::Starred(Box::new(self.only_child(node)?))),

            "binary_operator" => self.binary(node),
            "unary_operator" => self.unary(node),
            "not_operator" => Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(self.expr(self.field(node, "argument")?)?),
            }),
            "boolean_operator" => self.boolean(node),
            "comparison_operator" => self.comparison(node),
            "conditional_expression" => match named(node).as_slice() {
                [body, test, orelse] => Ok(Expr::IfExp {
                    body: Box::new(self.expr(*body)?),
                    test: Box::new(self.expr(*test)?),
                    orelse: Box::new(self.expr(*orelse)?),
                }),
                _ => Err(self.error(node, "invalid syntax")),
            },
            "lambda" => self.lambda(node),
            "call" => self.call(node),
            "attribute" => Ok(Expr::Attribute {
                value: Box::new(self.expr(self.field(node, "object")?)?),
                attr: self.identifier(self.field(node, "attribute")?)?,
            }),
            "subscript" => self.bracketed(node, |this| this.subscript(node)),

            "named_expression" => Err(self.error(node, "assignment expressions are not supported")),
            "await" => Err(self.error(node, "async code is not supported")),
            "yield" => Err(self.error(node, "generators are not supported")),
            "ellipsis" => Err(self.error(node, "'...' is not supported")),
            _ => Err(self.error(node, "invalid syntax")),
        }
    }

    fn only_child(&mut self, node: Node<'_>) -> LResult<Expr> {
        match named(node).first() {
            Some(inner) => self.expr(*inner),
            None => Err(self.error(node, "invalid syntax")),
        }
    }

    fn parenthesized(&mut self, node: Node<'_>) -> LResult<Expr> {
        let inner = named(node);
        match inner.as_slice() {
            [single] if single.kind() == "list_splat" => {
                Err(self.error(*single, "cannot use starred expression here"))
            }
            [single] => self.expr(*single),
            _ => Err(self.error(node, "invalid syntax")),
        }
    }

    fn dictionary(&mut self, node: Node<'_>) -> LResult<Expr> {
        let mut pairs = Vec::new();
        for item in named(node) {
            match item.kind() {
                "pair" => {}
                "dictionary_splat" => {
                    return Err(self.error(item, "dict unpacking in displays is not supported"))
                }
                _ => return Err(self.error(item, "invalid syntax")),
            }
            let key = self.expr(self.field(item, "key")?)?;
            let value = self.expr(self.field(item, "value")?)?;
            pairs.push((key, value));
        }
        Ok(Expr::Dict(pairs))
    }

    fn comprehension(&mut self, node: Node<'_>, kind: CompKind) -> LResult<Expr> {
        let elt = self.expr(self.field(node, "body")?)?;
        Ok(Expr::Comprehension {
            kind,
            elt: Box::new(elt),
            generators: self.generators(node)?,
        })
    }

    fn dict_comprehension(&mut self, node: Node<'_>) -> LResult<Expr> {
        let pair = self.field(node, "body")?;
        Ok(Expr::DictComp {
            key: Box::new(self.expr(self.field(pair, "key")?)?),
            value: Box::new(self.expr(self.field(pair, "value")?)?),
            generators: self.generators(node)?,
        })
    }

    /// The `for` and `if` clauses after a comprehension's body. Each `if`
    /// belongs to the `for` before it.
    fn generators(&mut self, node: Node<'_>) -> LResult<Vec<CompFor>> {
        let mut generators: Vec<CompFor> = Vec::new();
        for clause in named(node) {
            match clause.kind() {
                "for_in_clause" => {
                    self.reject_async_clause(clause)?;
                    let mut cursor = clause.walk();
                    let iters: Vec<Node<'_>> =
                        clause.children_by_field_name("right", &mut cursor).collect();
                    let [iter] = iters.as_slice() else {
                        return Err(self.error(clause, "invalid syntax"));
                    };
                    generators.push(CompFor {
                        target: self.target(self.field(clause, "left")?)?,
                        iter: self.expr(*iter)?,
                        ifs: Vec::new(),
                    });
                }
                "if_clause" => {
                    let test = self.only_child(clause)?;
                    match generators.last_mut() {
                        Some(last) => last.ifs.push(test),
                        None => return Err(self.error(clause, "invalid syntax")),
                    }
                }
                _ => {}
            }
        }
        if generators.is_empty() {
            return Err(self.error(node, "invalid syntax"));
        }
        Ok(generators)
    }

    fn reject_async_clause(&self, clause: Node<'_>) -> LResult<()> {
        match clause.child(0) {
            Some(first) if first.kind() == "async" => {
                Err(self.error(clause, "async code is not supported"))
            }
            _ => Ok(()),
        }
    }

    fn binary(&mut self, node: Node<'_>) -> LResult<Expr> {
        let operator = self.field(node, "operator")?;
        let op = match operator.kind() {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "&" => BinOp::BitAnd,
            "|" => BinOp::BitOr,
            "^" => BinOp::BitXor,
            "<<" => BinOp::Shl,
            ">>" => BinOp::Shr,
            "@" => return Err(self.error(operator, "matrix multiplication is not supported")),
            _ => return Err(self.error(operator, "invalid syntax")),
        };
        Ok(Expr::BinOp {
            left: Box::new(self.expr(self.field(node, "left")?)?),
            op,
            right: Box::new(self.expr(self.field(node, "right")?)?),
        })
    }

    fn unary(&mut self, node: Node<'_>) -> LResult<Expr> {
        let operator = self.field(node, "operator")?;
        let op = match operator.kind() {
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Pos,
            "~" => UnaryOp::Invert,
            _ => return Err(self.error(operator, "invalid syntax")),
        };
        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(self.expr(self.field(node, "argument")?)?),
        })
    }

    /// `a or b or c` nests to the left; the operands of a run of the same
    /// operator become one [`Expr::BoolOp`].
    fn boolean(&mut self, node: Node<'_>) -> LResult<Expr> {
        let op = self.bool_op(node)?;
        let mut rights = Vec::new();
        let mut left = node;
        while left.kind() == "boolean_operator" && self.bool_op(left)? == op {
            rights.push(self.field(left, "right")?);
            left = self.field(left, "left")?;
        }
        let mut values = Vec::with_capacity(rights.len() + 1);
        values.push(self.expr(left)?);
        for right in rights.into_iter().rev() {
            values.push(self.expr(right)?);
        }
        Ok(Expr::BoolOp { op, values })
    }

    fn bool_op(&self, node: Node<'_>) -> LResult<BoolOp> {
        let operator = self.field(node, "operator")?;
        match operator.kind() {
            "and" => Ok(BoolOp::And),
            "or" => Ok(BoolOp::Or),
            _ => Err(self.error(operator, "invalid syntax")),
        }
    }

    fn comparison(&mut self, node: Node<'_>) -> LResult<Expr> {
        let operands = named(node);
        let mut cursor = node.walk();
        let operators: Vec<Node<'_>> = node.children_by_field_name("operators", &mut cursor).collect();
        let Some((first, rest)) = operands.split_first() else {
            return Err(self.error(node, "invalid syntax"));
        };
        if rest.len() != operators.len() {
            return Err(self.error(node, "invalid syntax"));
        }
        let left = self.expr(*first)?;
        let mut ops = Vec::with_capacity(rest.len());
        for (operator, operand) in operators.into_iter().zip(rest) {
            ops.push((self.cmp_op(operator)?, self.expr(*operand)?));
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
        })
    }

    fn cmp_op(&self, operator: Node<'_>) -> LResult<CmpOp> {
        // `not in` and `is not` are two tokens; spacing between them varies.
        let words = self.text(operator).split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(match words.as_str() {
            "==" => CmpOp::Eq,
            "!=" => CmpOp::NotEq,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::Le,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::Ge,
            "in" => CmpOp::In,
            "not in" => CmpOp::NotIn,
            "is" => CmpOp::Is,
            "is not" => CmpOp::IsNot,
            _ => return Err(self.error(operator, "invalid syntax")),
        })
    }

    fn lambda(&mut self, node: Node<'_>) -> LResult<Expr> {
        let params = match node.child_by_field_name("parameters") {
            Some(params) => self.params(params)?,
            None => Params::default(),
        };
        let body = self.expr(self.field(node, "body")?)?;
        Ok(Expr::Lambda(Rc::new(LambdaDef {
            line: line(node),
            params,
            body,
        })))
    }

    fn call(&mut self, node: Node<'_>) -> LResult<Expr> {
        let func = self.expr(self.field(node, "function")?)?;
        let arguments = self.field(node, "arguments")?;
        let args = if arguments.kind() == "generator_expression" {
            vec![Arg::Positional(self.expr(arguments)?)]
        } else {
            self.bracketed(arguments, |this| this.arguments(arguments))?
        };
        Ok(Expr::Call {
            func: Box::new(func),
            args,
        })
    }

    fn arguments(&mut self, node: Node<'_>) -> LResult<Vec<Arg>> {
        let mut args = Vec::new();
        let mut seen_keyword = false;
        let mut seen_double_star = false;
        for item in named(node) {
            let arg = match item.kind() {
                "dictionary_splat" => {
                    seen_double_star = true;
                    Arg::DoubleStar(self.only_child(item)?)
                }
                "list_splat" => {
                    if seen_double_star {
                        return Err(self.error(
                            item,
                            "iterable argument unpacking follows keyword argument unpacking",
                        ));
                    }
                    Arg::Star(self.only_child(item)?)
                }
                "keyword_argument" => {
                    seen_keyword = true;
                    Arg::Keyword(
                        self.identifier(self.field(item, "name")?)?,
                        self.expr(self.field(item, "value")?)?,
                    )
                }
                _ => {
                    if seen_keyword || seen_double_star {
                        return Err(self.error(item, "positional argument follows keyword argument"));
                    }
                    Arg::Positional(self.expr(item)?)
                }
            };
            args.push(arg);
        }
        Ok(args)
    }

    fn subscript(&mut self, node: Node<'_>) -> LResult<Expr> {
        let value = self.expr(self.field(node, "value")?)?;
        let mut cursor = node.walk();
        let parts: Vec<Node<'_>> = node.children_by_field_name("subscript", &mut cursor).collect();
        let mut items = parts
            .iter()
            .map(|part| match part.kind() {
                "slice" => self.slice(*part),
                _ => self.expr(*part),
            })
            .collect::<LResult<Vec<_>>>()?;
        let index = if items.len() == 1 && !has_comma(node) {
            items.remove(0)
        } else {
            Expr::Tuple(items)
        };
        Ok(Expr::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        })
    }

    /// `lower:upper:step`, each part optional. Which part an expression
    /// fills is given by the colons before it.
    fn slice(&mut self, node: Node<'_>) -> LResult<Expr> {
        let mut bounds: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut colons = 0;
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            if child.kind() == ":" {
                colons += 1;
            } else if child.is_named() && !child.is_extra() && colons < 3 {
                bounds[colons] = Some(Box::new(self.expr(child)?));
            }
        }
        let [lower, upper, step] = bounds;
        Ok(Expr::Slice { lower, upper, step })
    }

    /// Parameters of a `def` or a `lambda`.
    pub(crate) fn params(&mut self, node: Node<'_>) -> LResult<Params> {
        let mut params = Params::default();
        let mut seen_default = false;
        let mut names: Vec<String> = Vec::new();

        for item in named(node) {
            if params.kwarg.is_some() {
                return Err(self.error(item, "arguments cannot follow var-keyword argument"));
            }
            // A type annotation wraps the parameter it annotates.
            let param = match item.kind() {
                "typed_parameter" => named(item).first().copied().unwrap_or(item),
                _ => item,
            };
            let name = match param.kind() {
                "identifier" => {
                    if params.vararg.is_some() {
                        return Err(self.error(param, "keyword-only parameters are not supported"));
                    }
                    if seen_default {
                        return Err(self.error(param, "non-default argument follows default argument"));
                    }
                    let name = self.identifier(param)?;
                    params.positional.push(Param {
                        name: name.clone(),
                        default: None,
                    });
                    name
                }
                "default_parameter" | "typed_default_parameter" => {
                    if params.vararg.is_some() {
                        return Err(self.error(param, "keyword-only parameters are not supported"));
                    }
                    seen_default = true;
                    let name = self.identifier(self.field(param, "name")?)?;
                    let default = self.expr(self.field(param, "value")?)?;
                    params.positional.push(Param {
                        name: name.clone(),
                        default: Some(default),
                    });
                    name
                }
                "list_splat_pattern" => {
                    if params.vararg.is_some() {
                        return Err(self.error(param, "keyword-only parameters are not supported"));
                    }
                    let name = self.splat_name(param)?;
                    params.vararg = Some(name.clone());
                    name
                }
                "dictionary_splat_pattern" => {
                    let name = self.splat_name(param)?;
                    params.kwarg = Some(name.clone());
                    name
                }
                "keyword_separator" => {
                    return Err(self.error(param, "keyword-only parameters are not supported"))
                }
                "positional_separator" => {
                    return Err(self.error(param, "positional-only parameters are not supported"))
                }
                _ => return Err(self.error(param, "invalid syntax")),
            };
            if names.contains(&name) {
                return Err(self.error(
                    item,
                    format!("duplicate argument '{name}' in function definition"),
                ));
            }
            names.push(name);
        }
        Ok(params)
    }

    fn splat_name(&self, node: Node<'_>) -> LResult<String> {
        match named(node).first() {
            Some(inner) => self.identifier(*inner),
            None => Err(self.error(node, "invalid syntax")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parse;

    fn expr(source: &str) -> Expr {
        let module = parse(source).unwrap();
        match module.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(e)) => e,
            Some(StmtKind::Assign { value, .. }) => value,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Deeply nested sources recurse past the default test thread stack.
    fn parse_on_large_stack(source: String) -> Result<Module, crate::CompileError> {
        // The AST uses `Rc`, so it is not `Send`. The worker thread has exited by the
        // time the result is unwrapped and the parser keeps no thread-local state, so
        // every `Rc` in the result is uniquely owned by it and moving it is sound.
        struct SendBox(Result<Module, crate::CompileError>);
        unsafe impl Send for SendBox {}
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(move || SendBox(parse(&source)))
            .unwrap()
            .join()
            .unwrap()
            .0
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            bin(Expr::int(1), BinOp::Add, bin(Expr::int(2), BinOp::Mul, Expr::int(3)))
        );
        assert_eq!(
            expr("10 - 4 - 3"),
            bin(bin(Expr::int(10), BinOp::Sub, Expr::int(4)), BinOp::Sub, Expr::int(3))
        );
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_minus() {
        let e = expr("-2 ** 3 ** 2");
        let Expr::UnaryOp { op: UnaryOp::Neg, operand } = e else {
            panic!("expected negation");
        };
        assert_eq!(
            *operand,
            bin(Expr::int(2), BinOp::Pow, bin(Expr::int(3), BinOp::Pow, Expr::int(2)))
        );
    }

    #[test]
    fn chained_comparison_and_negated_membership() {
        let Expr::Compare { ops, .. } = expr("a < b <= c") else {
            panic!("expected comparison");
        };
        assert_eq!(ops.iter().map(|(op, _)| *op).collect::<Vec<_>>(), vec![CmpOp::Lt, CmpOp::Le]);

        let Expr::Compare { ops, .. } = expr("x not in ys") else {
            panic!("expected comparison");
        };
        assert_eq!(ops[0].0, CmpOp::NotIn);

        let Expr::Compare { ops, .. } = expr("x is not None") else {
            panic!("expected comparison");
        };
        assert_eq!(ops[0].0, CmpOp::IsNot);
    }

    #[test]
    fn boolean_operators_flatten() {
        let Expr::BoolOp { op, values } = expr("a or b or not c") else {
            panic!("expected boolean op");
        };
        assert_eq!(op, BoolOp::Or);
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], Expr::name("a"));

        let Expr::BoolOp { op, values } = expr("a and b or c") else {
            panic!("expected boolean op");
        };
        assert_eq!(op, BoolOp::Or);
        assert!(matches!(&values[0], Expr::BoolOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn conditional_expression() {
        let Expr::IfExp { test, body, .. } = expr("a if c else b") else {
            panic!("expected conditional");
        };
        assert_eq!(*test, Expr::name("c"));
        assert_eq!(*body, Expr::name("a"));
    }

    #[test]
    fn displays() {
        assert_eq!(expr("()"), Expr::Tuple(vec![]));
        assert_eq!(expr("(1,)"), Expr::Tuple(vec![Expr::int(1)]));
        assert_eq!(expr("(1)"), Expr::int(1));
        assert_eq!(expr("[1, 2,]"), Expr::List(vec![Expr::int(1), Expr::int(2)]));
        assert_eq!(expr("{}"), Expr::Dict(vec![]));
        assert_eq!(expr("{1}"), Expr::Set(vec![Expr::int(1)]));
        assert!(matches!(expr("{'a': 1, 'b': 2}"), Expr::Dict(pairs) if pairs.len() == 2));
        assert!(matches!(expr("[*xs, 1]"), Expr::List(items) if matches!(items[0], Expr::Starred(_))));
        assert!(parse("{**d}\n").is_err());
        assert!(parse("(*xs)\n").is_err());
    }

    #[test]
    fn comprehensions() {
        let Expr::Comprehension { kind, generators, .. } = expr("[x * y for x in xs if x for y in ys]")
        else {
            panic!("expected comprehension");
        };
        assert_eq!(kind, CompKind::List);
        assert_eq!(generators.len(), 2);
        assert_eq!(generators[0].ifs.len(), 1);
        assert!(generators[1].ifs.is_empty());

        assert!(matches!(expr("{k: v for k, v in items}"), Expr::DictComp { .. }));
        assert!(matches!(
            expr("{x for x in xs}"),
            Expr::Comprehension { kind: CompKind::Set, .. }
        ));
        assert!(matches!(
            expr("(x for x in xs)"),
            Expr::Comprehension { kind: CompKind::Generator, .. }
        ));
    }

    #[test]
    fn generator_argument_without_parentheses() {
        let Expr::Call { args, .. } = expr("sum(x for x in xs)") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(
            &args[0],
            Arg::Positional(Expr::Comprehension { kind: CompKind::Generator, .. })
        ));
    }

    #[test]
    fn call_arguments() {
        let Expr::Call { args, .. } = expr("f(a, *rest, key=1, **opts)") else {
            panic!("expected call");
        };
        assert!(matches!(args[0], Arg::Positional(_)));
        assert!(matches!(args[1], Arg::Star(_)));
        assert!(matches!(&args[2], Arg::Keyword(name, _) if name == "key"));
        assert!(matches!(args[3], Arg::DoubleStar(_)));

        let err = parse("f(key=1, 2)\n").unwrap_err();
        assert!(err.message.contains("positional argument follows keyword argument"));
    }

    #[test]
    fn slices() {
        let Expr::Subscript { index, .. } = expr("xs[1:]") else {
            panic!("expected subscript");
        };
        assert!(matches!(*index, Expr::Slice { lower: Some(_), upper: None, step: None }));

        let Expr::Subscript { index, .. } = expr("xs[::-1]") else {
            panic!("expected subscript");
        };
        assert!(matches!(*index, Expr::Slice { lower: None, upper: None, step: Some(_) }));

        let Expr::Subscript { index, .. } = expr("xs[:n]") else {
            panic!("expected subscript");
        };
        assert!(matches!(*index, Expr::Slice { lower: None, upper: Some(_), step: None }));

        let Expr::Subscript { index, .. } = expr("grid[i, j]") else {
            panic!("expected subscript");
        };
        assert!(matches!(*index, Expr::Tuple(ref items) if items.len() == 2));
    }

    #[test]
    fn lambda_with_default() {
        let Expr::Lambda(def) = expr("lambda a, b=1: a + b") else {
            panic!("expected lambda");
        };
        assert_eq!(def.params.positional.len(), 2);
        assert_eq!(def.line, 1);

        let Expr::Lambda(def) = expr("lambda: 0") else {
            panic!("expected lambda");
        };
        assert!(def.params.positional.is_empty());
    }

    #[test]
    fn adjacent_strings_concatenate() {
        assert_eq!(expr("'ab' 'cd'"), Expr::Constant(Constant::Str("abcd".into())));
        let Expr::FString(parts) = expr("'n=' f'{n}'") else {
            panic!("expected f-string");
        };
        assert_eq!(parts[0], FStringPart::Literal("n=".into()));
        assert!(matches!(parts[1], FStringPart::Field { .. }));
    }

    #[test]
    fn attribute_chains() {
        let e = expr("a.b.c()");
        let Expr::Call { func, .. } = e else {
            panic!("expected call");
        };
        assert!(matches!(*func, Expr::Attribute { ref attr, .. } if attr == "c"));
    }

    #[test]
    fn starred_assignment_target() {
        let module = parse("first, *rest = xs\n").unwrap();
        let StmtKind::Assign { targets, .. } = &module.body[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Tuple(items) = &targets[0] else {
            panic!("expected tuple target");
        };
        assert!(matches!(items[1], Expr::Starred(_)));
    }

    #[test]
    fn unsupported_expressions_are_rejected() {
        assert!(parse("(y := 1)\n").is_err());
        assert!(parse("x = a @ b\n").is_err());
        assert!(parse("x = ...\n").is_err());
        assert!(parse("def f(a, *, b):\n    pass\n").is_err());
        assert!(parse("def f(a, /):\n    pass\n").is_err());
    }

    #[test]
    fn moderate_nesting_is_accepted() {
        let source = format!("x = {}1{}\n", "(".repeat(150), ")".repeat(150));
        let module = parse_on_large_stack(source).unwrap();
        assert!(matches!(&module.body[0].kind, StmtKind::Assign { value, .. } if *value == Expr::int(1)));
    }

    #[test]
    fn too_many_parentheses_is_a_syntax_error() {
        let source = format!("x = {}1{}\n", "(".repeat(1000), ")".repeat(1000));
        let err = parse_on_large_stack(source).unwrap_err();
        assert_eq!(err.kind, crate::CompileErrorKind::Syntax);
        assert_eq!(err.message, "too many nested parentheses");

        let source = format!("x = {}1{}\n", "[".repeat(300), "]".repeat(300));
        let err = parse_on_large_stack(source).unwrap_err();
        assert_eq!(err.message, "too many nested parentheses");
    }

    #[test]
    fn long_unary_chains_are_cut_off() {
        let source = format!("x = {}1\n", "-".repeat(5000));
        let err = parse_on_large_stack(source).unwrap_err();
        assert!(err.message.contains("too deeply nested"), "{err}");
    }
}
