//! Lowering of the tree-sitter concrete syntax tree into [`crate::ast`].
//!
//! The grammar accepts more than the traced language supports (decorators,
//! `with`, `match`, Python 2 statements). Those constructs are rejected here
//! with a [`CompileError`] at the node that introduced them, as are jumps
//! outside their enclosing loop or function.
//!
//! Expressions are lowered in [`expr`], literals and f-strings in
//! [`literal`]. [`diagnose`] turns parse failures and layout mistakes into
//! the error the program is rejected with.

mod diagnose;
mod expr;
mod literal;

use std::rc::Rc;

use tree_sitter::{Node, Tree};

use crate::ast::*;
use crate::error::CompileError;

pub(crate) type LResult<T> = Result<T, CompileError>;

/// Open brackets allowed around an expression.
const MAX_NESTING: usize = 200;
/// Nested expressions and blocks allowed in total.
const MAX_DEPTH: usize = 1000;

/// Lowers a parsed program, or reports the first syntax error in it.
pub(crate) fn module(tree: &Tree, source: &str) -> LResult<Module> {
    let root = tree.root_node();
    diagnose::check(root, source)?;
    let body = Lowerer::new(source).statements(root)?;
    Ok(Module { body })
}

/// 1-based line of a node's first byte.
pub(crate) fn line(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based line and column of a node's first byte.
pub(crate) fn position(node: Node<'_>) -> (u32, u32) {
    let point = node.start_position();
    (point.row as u32 + 1, point.column as u32 + 1)
}

/// Named children, without comments and line continuations.
pub(crate) fn named<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect();
    children
}

/// Whether a display or subscript has a top-level comma.
pub(crate) fn has_comma(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == ",");
    found
}

pub(crate) struct Lowerer<'s> {
    source: &'s str,
    /// Expressions and blocks currently being lowered.
    depth: usize,
    /// Brackets currently open.
    nesting: usize,
    /// Nesting of `def` bodies around the current statement.
    function_depth: usize,
    /// Loops around the current statement within the innermost body.
    loop_depth: usize,
}

impl<'s> Lowerer<'s> {
    fn new(source: &'s str) -> Self {
        Lowerer {
            source,
            depth: 0,
            nesting: 0,
            function_depth: 0,
            loop_depth: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Node helpers
    // -----------------------------------------------------------------------

    pub(crate) fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    pub(crate) fn error(&self, node: Node<'_>, message: impl Into<String>) -> CompileError {
        let (line, column) = position(node);
        CompileError::syntax(message, line, column)
    }

    pub(crate) fn field<'t>(&self, node: Node<'t>, name: &str) -> LResult<Node<'t>> {
        node.child_by_field_name(name)
            .ok_or_else(|| self.error(node, "invalid syntax"))
    }

    pub(crate) fn identifier(&self, node: Node<'_>) -> LResult<String> {
        match node.kind() {
            "identifier" | "keyword_identifier" => Ok(self.text(node).to_string()),
            _ => Err(self.error(node, "invalid syntax: expected a name")),
        }
    }

    /// Runs `lower` one level deeper, failing past [`MAX_DEPTH`].
    pub(crate) fn nested<T>(
        &mut self,
        node: Node<'_>,
        lower: impl FnOnce(&mut Self) -> LResult<T>,
    ) -> LResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(node, "expression is too deeply nested"));
        }
        self.depth += 1;
        let result = lower(self);
        self.depth -= 1;
        result
    }

    /// Runs `lower` inside one more bracket, failing past [`MAX_NESTING`].
    pub(crate) fn bracketed<T>(
        &mut self,
        node: Node<'_>,
        lower: impl FnOnce(&mut Self) -> LResult<T>,
    ) -> LResult<T> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error(node, "too many nested parentheses"));
        }
        self.nesting += 1;
        let result = lower(self);
        self.nesting -= 1;
        result
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    fn statements(&mut self, parent: Node<'_>) -> LResult<Vec<Stmt>> {
        named(parent)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    /// The suite of a compound statement. The grammar accepts a header with
    /// no indented lines after it as an empty block.
    fn block(&mut self, node: Node<'_>) -> LResult<Vec<Stmt>> {
        let body = self.nested(node, |this| this.statements(node))?;
        if body.is_empty() {
            let line = node.prev_sibling().map(line).unwrap_or_else(|| line(node)) + 1;
            return Err(CompileError::indentation("expected an indented block", line, 1));
        }
        Ok(body)
    }

    fn loop_body(&mut self, node: Node<'_>) -> LResult<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.block(node);
        self.loop_depth -= 1;
        body
    }

    /// A `def` or `class` body. Loops outside it do not extend into it;
    /// `return` is allowed only in a `def` body.
    fn scope_body(&mut self, node: Node<'_>, is_function: bool) -> LResult<Vec<Stmt>> {
        let saved = (self.function_depth, self.loop_depth);
        self.function_depth = if is_function { self.function_depth + 1 } else { 0 };
        self.loop_depth = 0;
        let body = self.block(node);
        (self.function_depth, self.loop_depth) = saved;
        body
    }

    /// The `else:` suite among a statement's children, if any.
    fn else_clause(&mut self, node: Node<'_>) -> LResult<Option<Vec<Stmt>>> {
        match named(node).into_iter().find(|c| c.kind() == "else_clause") {
            Some(clause) => Ok(Some(self.block(self.field(clause, "body")?)?)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn statement(&mut self, node: Node<'_>) -> LResult<Stmt> {
        let line = line(node);
        let kind = match node.kind() {
            "expression_statement" => self.expression_statement(node)?,
            "pass_statement" => StmtKind::Pass,
            "break_statement" => {
                if self.loop_depth == 0 {
                    return Err(self.error(node, "'break' outside loop"));
                }
                StmtKind::Break
            }
            "continue_statement" => {
                if self.loop_depth == 0 {
                    return Err(self.error(node, "'continue' not properly in loop"));
                }
                StmtKind::Continue
            }
            "return_statement" => {
                if self.function_depth == 0 {
                    return Err(self.error(node, "'return' outside function"));
                }
                match named(node).first() {
                    Some(value) => StmtKind::Return(Some(self.expr(*value)?)),
                    None => StmtKind::Return(None),
                }
            }
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                if let Some(cause) = cause {
                    self.expr(cause)?;
                }
                match named(node).into_iter().find(|c| Some(*c) != cause) {
                    Some(exc) => StmtKind::Raise(Some(self.expr(exc)?)),
                    None => StmtKind::Raise(None),
                }
            }
            "assert_statement" => {
                let parts = named(node);
                let Some((test, rest)) = parts.split_first() else {
                    return Err(self.error(node, "invalid syntax"));
                };
                let msg = match rest {
                    [] => None,
                    [msg] => Some(self.expr(*msg)?),
                    _ => return Err(self.error(node, "invalid syntax")),
                };
                StmtKind::Assert {
                    test: self.expr(*test)?,
                    msg,
                }
            }
            "global_statement" => StmtKind::Global(self.names(node)?),
            "nonlocal_statement" => StmtKind::Nonlocal(self.names(node)?),
            "delete_statement" => StmtKind::Delete(self.delete_targets(node)?),
            "import_statement" => StmtKind::Import(self.import_names(node, true)?),
            "import_from_statement" => self.import_from(node)?,
            "if_statement" => self.if_statement(node)?,
            "while_statement" => StmtKind::While {
                test: self.expr(self.field(node, "condition")?)?,
                body: self.loop_body(self.field(node, "body")?)?,
                orelse: self.else_clause(node)?,
            },
            "for_statement" => {
                self.reject_async(node)?;
                StmtKind::For {
                    target: self.target(self.field(node, "left")?)?,
                    iter: self.expr(self.field(node, "right")?)?,
                    body: self.loop_body(self.field(node, "body")?)?,
                    orelse: self.else_clause(node)?,
                }
            }
            "function_definition" => StmtKind::FunctionDef(Rc::new(self.function(node)?)),
            "class_definition" => StmtKind::ClassDef(Rc::new(self.class(node)?)),
            "try_statement" => self.try_statement(node)?,
            "print_statement" => self.print_statement(node)?,
            "decorated_definition" => return Err(self.error(node, "decorators are not supported")),
            "with_statement" => return Err(self.error(node, "'with' statements are not supported")),
            "match_statement" => return Err(self.error(node, "'match' statements are not supported")),
            "type_alias_statement" => return Err(self.error(node, "type aliases are not supported")),
            "future_import_statement" => {
                return Err(self.error(node, "__future__ imports are not supported"))
            }
            "exec_statement" => {
                return Err(self.error(node, "Missing parentheses in call to 'exec'"))
            }
            _ => return Err(self.error(node, "invalid syntax")),
        };
        Ok(Stmt { line, kind })
    }

    fn reject_async(&self, node: Node<'_>) -> LResult<()> {
        match node.child(0) {
            Some(first) if first.kind() == "async" => {
                Err(self.error(node, "async code is not supported"))
            }
            _ => Ok(()),
        }
    }

    fn names(&self, node: Node<'_>) -> LResult<Vec<String>> {
        named(node)
            .into_iter()
            .map(|name| self.identifier(name))
            .collect()
    }

    fn expression_statement(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let parts = named(node);
        match parts.as_slice() {
            [single] if single.kind() == "assignment" => self.assignment(*single),
            [single] if single.kind() == "augmented_assignment" => self.augmented_assignment(*single),
            [single] if !has_comma(node) => Ok(StmtKind::Expr(self.expr(*single)?)),
            _ => Ok(StmtKind::Expr(Expr::Tuple(self.exprs(&parts)?))),
        }
    }

    fn assignment(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let target = self.target(self.field(node, "left")?)?;
        if node.child_by_field_name("type").is_some() {
            if !matches!(target, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
                return Err(self.error(node, "only single target can be annotated"));
            }
            let value = match node.child_by_field_name("right") {
                Some(right) => Some(self.value(right)?),
                None => None,
            };
            return Ok(StmtKind::AnnAssign { target, value });
        }

        // `a = b = c` nests to the right; unroll it into one statement.
        let mut targets = vec![target];
        let mut right = self.field(node, "right")?;
        while right.kind() == "assignment" {
            if right.child_by_field_name("type").is_some() {
                return Err(self.error(right, "invalid syntax"));
            }
            targets.push(self.target(self.field(right, "left")?)?);
            right = self.field(right, "right")?;
        }
        let value = self.value(right)?;
        Ok(StmtKind::Assign { targets, value })
    }

    /// The right-hand side of an assignment.
    fn value(&mut self, node: Node<'_>) -> LResult<Expr> {
        match node.kind() {
            "assignment" | "augmented_assignment" => Err(self.error(node, "invalid syntax")),
            _ => self.expr(node),
        }
    }

    fn augmented_assignment(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let left = self.field(node, "left")?;
        let target = self.expr(left)?;
        if !matches!(target, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
            return Err(self.error(left, "illegal expression for augmented assignment"));
        }
        let operator = self.field(node, "operator")?;
        let op = match operator.kind() {
            "+=" => BinOp::Add,
            "-=" => BinOp::Sub,
            "*=" => BinOp::Mul,
            "/=" => BinOp::Div,
            "//=" => BinOp::FloorDiv,
            "%=" => BinOp::Mod,
            "**=" => BinOp::Pow,
            "&=" => BinOp::BitAnd,
            "|=" => BinOp::BitOr,
            "^=" => BinOp::BitXor,
            "<<=" => BinOp::Shl,
            ">>=" => BinOp::Shr,
            _ => return Err(self.error(operator, "unsupported augmented assignment operator")),
        };
        let value = self.value(self.field(node, "right")?)?;
        Ok(StmtKind::AugAssign { target, op, value })
    }

    fn delete_targets(&mut self, node: Node<'_>) -> LResult<Vec<Expr>> {
        let Some(operand) = named(node).into_iter().next() else {
            return Err(self.error(node, "invalid syntax"));
        };
        let targets = match self.expr(operand)? {
            Expr::Tuple(items) if operand.kind() == "expression_list" => items,
            single => vec![single],
        };
        if targets.iter().any(|target| !target.is_assignable()) {
            return Err(self.error(operand, "cannot delete expression"));
        }
        Ok(targets)
    }

    /// Names of an `import` (`dotted` allowed) or `from ... import` list.
    fn import_names(&self, node: Node<'_>, dotted: bool) -> LResult<Vec<Alias>> {
        let mut cursor = node.walk();
        let nodes: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
        let mut aliases = Vec::with_capacity(nodes.len());
        for item in nodes {
            let (name_node, asname) = match item.kind() {
                "aliased_import" => (
                    self.field(item, "name")?,
                    Some(self.identifier(self.field(item, "alias")?)?),
                ),
                _ => (item, None),
            };
            let name = self.dotted_name(name_node)?;
            if !dotted && name.contains('.') {
                return Err(self.error(name_node, "invalid syntax"));
            }
            aliases.push(Alias { name, asname });
        }
        Ok(aliases)
    }

    fn dotted_name(&self, node: Node<'_>) -> LResult<String> {
        if node.kind() != "dotted_name" {
            return Err(self.error(node, "invalid syntax: expected a module name"));
        }
        let parts = named(node)
            .into_iter()
            .map(|part| self.identifier(part))
            .collect::<LResult<Vec<_>>>()?;
        Ok(parts.join("."))
    }

    fn import_from(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let module_node = self.field(node, "module_name")?;
        if module_node.kind() == "relative_import" {
            return Err(self.error(module_node, "relative imports are not supported"));
        }
        if let Some(star) = named(node).into_iter().find(|c| c.kind() == "wildcard_import") {
            return Err(self.error(star, "wildcard imports are not supported"));
        }
        Ok(StmtKind::ImportFrom {
            module: self.dotted_name(module_node)?,
            names: self.import_names(node, false)?,
        })
    }

    fn if_statement(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let mut branches = vec![CondBranch {
            line: line(node),
            test: self.expr(self.field(node, "condition")?)?,
            body: self.block(self.field(node, "consequence")?)?,
        }];
        let mut orelse = None;
        for clause in named(node) {
            match clause.kind() {
                "elif_clause" => branches.push(CondBranch {
                    line: line(clause),
                    test: self.expr(self.field(clause, "condition")?)?,
                    body: self.block(self.field(clause, "consequence")?)?,
                }),
                "else_clause" => orelse = Some(self.block(self.field(clause, "body")?)?),
                _ => {}
            }
        }
        Ok(StmtKind::If { branches, orelse })
    }

    fn function(&mut self, node: Node<'_>) -> LResult<FunctionDef> {
        self.reject_async(node)?;
        if let Some(params) = node.child_by_field_name("type_parameters") {
            return Err(self.error(params, "type parameters are not supported"));
        }
        let name = self.identifier(self.field(node, "name")?)?;
        let params = self.params(self.field(node, "parameters")?)?;
        let body = self.scope_body(self.field(node, "body")?, true)?;
        Ok(FunctionDef {
            name,
            line: line(node),
            params,
            body,
        })
    }

    fn class(&mut self, node: Node<'_>) -> LResult<ClassDef> {
        let name = self.identifier(self.field(node, "name")?)?;
        let base = match node.child_by_field_name("superclasses") {
            Some(list) => match named(list).as_slice() {
                [] => None,
                [base] if base.kind() == "keyword_argument" => {
                    return Err(self.error(*base, "class keyword arguments are not supported"))
                }
                [base] => Some(self.expr(*base)?),
                [_, second, ..] => {
                    return Err(self.error(*second, "multiple inheritance is not supported"))
                }
            },
            None => None,
        };
        let body = self.scope_body(self.field(node, "body")?, false)?;
        Ok(ClassDef {
            name,
            line: line(node),
            base,
            body,
        })
    }

    fn try_statement(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let body = self.block(self.field(node, "body")?)?;
        let mut handlers = Vec::new();
        let mut orelse = None;
        let mut finalbody = None;
        for clause in named(node) {
            match clause.kind() {
                "except_clause" => handlers.push(self.except_clause(clause)?),
                "except_group_clause" => {
                    return Err(self.error(clause, "'except*' is not supported"))
                }
                "else_clause" => orelse = Some(self.block(self.field(clause, "body")?)?),
                "finally_clause" => {
                    let Some(suite) = named(clause).into_iter().find(|c| c.kind() == "block") else {
                        return Err(self.error(clause, "invalid syntax"));
                    };
                    finalbody = Some(self.block(suite)?);
                }
                _ => {}
            }
        }
        Ok(StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn except_clause(&mut self, node: Node<'_>) -> LResult<ExceptHandler> {
        let parts = named(node);
        let Some((suite, head)) = parts.split_last() else {
            return Err(self.error(node, "invalid syntax"));
        };
        let (kind, name) = match head {
            [] => (None, None),
            // Newer grammars wrap `E as name` in an as_pattern.
            [pattern] if pattern.kind() == "as_pattern" => {
                let inner = named(*pattern);
                let Some(value) = inner.first() else {
                    return Err(self.error(*pattern, "invalid syntax"));
                };
                let alias = pattern
                    .child_by_field_name("alias")
                    .or_else(|| inner.get(1).copied());
                let name = match alias {
                    Some(alias) => Some(self.bound_name(alias)?),
                    None => None,
                };
                (Some(self.expr(*value)?), name)
            }
            [value] => (Some(self.expr(*value)?), None),
            [value, alias] => (Some(self.expr(*value)?), Some(self.bound_name(*alias)?)),
            _ => return Err(self.error(node, "invalid syntax")),
        };
        Ok(ExceptHandler {
            line: line(node),
            kind,
            name,
            body: self.block(*suite)?,
        })
    }

    /// The name after `as`, possibly wrapped in an `as_pattern_target`.
    fn bound_name(&self, node: Node<'_>) -> LResult<String> {
        if node.kind() == "as_pattern_target" {
            if let Some(inner) = named(node).first() {
                return self.identifier(*inner);
            }
        }
        self.identifier(node)
    }

    /// The grammar keeps a Python 2 `print` statement. A parenthesized
    /// operand is still an ordinary call.
    fn print_statement(&mut self, node: Node<'_>) -> LResult<StmtKind> {
        let operands = named(node);
        let args = match operands.as_slice() {
            [group] if group.kind() == "parenthesized_expression" => named(*group),
            [group] if group.kind() == "tuple" => named(*group),
            _ => return Err(self.error(node, "Missing parentheses in call to 'print'")),
        };
        let args = self
            .exprs(&args)?
            .into_iter()
            .map(Arg::Positional)
            .collect();
        Ok(StmtKind::Expr(Expr::Call {
            func: Box::new(Expr::name("print")),
            args,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::error::CompileErrorKind;
    use crate::parse;

    fn body(source: &str) -> Vec<Stmt> {
        parse(source).unwrap().body
    }

    #[test]
    fn statements_carry_their_start_line() {
        let stmts = body("x = 1\n\ny = 2\n# note\nz = x + y\n");
        let lines: Vec<u32> = stmts.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 3, 5]);
    }

    #[test]
    fn semicolons_share_a_line() {
        let stmts = body("a = 1; b = 2\n");
        assert_eq!(stmts.len(), 2);
        assert!(stmts.iter().all(|s| s.line == 1));
    }

    #[test]
    fn chained_assignment() {
        let stmts = body("a = b = 3\n");
        match &stmts[0].kind {
            StmtKind::Assign { targets, value } => {
                assert_eq!(targets, &vec![Expr::name("a"), Expr::name("b")]);
                assert_eq!(*value, Expr::int(3));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn tuple_unpacking_target() {
        let stmts = body("a, b = b, a\n");
        match &stmts[0].kind {
            StmtKind::Assign { targets, value } => {
                assert!(matches!(&targets[0], Expr::Tuple(items) if items.len() == 2));
                assert!(matches!(value, Expr::Tuple(items) if items.len() == 2));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn annotated_and_augmented_assignment() {
        let stmts = body("x: int = 1\ny: str\nx += 2\n");
        assert!(matches!(&stmts[0].kind, StmtKind::AnnAssign { value: Some(_), .. }));
        assert!(matches!(&stmts[1].kind, StmtKind::AnnAssign { value: None, .. }));
        assert!(matches!(&stmts[2].kind, StmtKind::AugAssign { op: BinOp::Add, .. }));
    }

    #[test]
    fn if_elif_else_lines() {
        let src = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        let stmts = body(src);
        match &stmts[0].kind {
            StmtKind::If { branches, orelse } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].line, 3);
                assert_eq!(orelse.as_ref().unwrap()[0].line, 6);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn function_with_defaults_and_varargs() {
        let stmts = body("def f(a, b: int = 2, *rest, **opts) -> int:\n    return a\n");
        let StmtKind::FunctionDef(def) = &stmts[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.name, "f");
        assert_eq!(def.params.positional.len(), 2);
        assert!(def.params.positional[1].default.is_some());
        assert_eq!(def.params.vararg.as_deref(), Some("rest"));
        assert_eq!(def.params.kwarg.as_deref(), Some("opts"));
        assert_eq!(def.body[0].line, 2);
    }

    #[test]
    fn one_line_suites() {
        let stmts = body("while x: x -= 1\nfor i in xs: pass\n");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0].kind, StmtKind::While { body, .. } if body.len() == 1));
    }

    #[test]
    fn loop_else_clauses() {
        let stmts = body("for i in xs:\n    pass\nelse:\n    done = 1\nwhile c:\n    break\nelse:\n    pass\n");
        assert!(matches!(&stmts[0].kind, StmtKind::For { orelse: Some(_), .. }));
        assert!(matches!(&stmts[1].kind, StmtKind::While { orelse: Some(_), .. }));
    }

    #[test]
    fn class_with_base_and_methods() {
        let src = "class Node(object):\n    def __init__(self, v):\n        self.v = v\n";
        let stmts = body(src);
        let StmtKind::ClassDef(class) = &stmts[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.name, "Node");
        assert_eq!(class.base, Some(Expr::name("object")));
        assert_eq!(class.body.len(), 1);
    }

    #[test]
    fn try_except_finally() {
        let src = "try:\n    x = 1 / 0\nexcept ZeroDivisionError as e:\n    x = 0\nexcept (KeyError, IndexError):\n    x = 1\nexcept:\n    x = 2\nfinally:\n    y = 1\n";
        let stmts = body(src);
        let StmtKind::Try {
            handlers,
            finalbody,
            ..
        } = &stmts[0].kind
        else {
            panic!("expected try");
        };
        assert_eq!(handlers.len(), 3);
        assert_eq!(handlers[0].name.as_deref(), Some("e"));
        assert_eq!(handlers[0].kind, Some(Expr::name("ZeroDivisionError")));
        assert_eq!(handlers[0].line, 3);
        assert!(matches!(handlers[1].kind, Some(Expr::Tuple(_))));
        assert_eq!(handlers[2].kind, None);
        assert!(finalbody.is_some());
    }

    #[test]
    fn imports() {
        let stmts = body("import math\nimport os.path as p\nfrom collections import deque as dq, Counter\n");
        assert!(matches!(&stmts[0].kind, StmtKind::Import(a) if a[0].name == "math"));
        assert!(matches!(
            &stmts[1].kind,
            StmtKind::Import(a) if a[0].name == "os.path" && a[0].asname.as_deref() == Some("p")
        ));
        match &stmts[2].kind {
            StmtKind::ImportFrom { module, names } => {
                assert_eq!(module, "collections");
                assert_eq!(names[0].asname.as_deref(), Some("dq"));
                assert_eq!(names.len(), 2);
            }
            other => panic!("expected from-import, got {other:?}"),
        }
        assert!(parse("from m import *\n").is_err());
    }

    #[test]
    fn docstring_is_expression_statement() {
        let stmts = body("def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n");
        let StmtKind::FunctionDef(def) = &stmts[0].kind else {
            panic!("expected def");
        };
        assert!(matches!(def.body[0].kind, StmtKind::Expr(Expr::Constant(Constant::Str(_)))));
    }

    #[test]
    fn raise_and_assert() {
        let stmts = body("def f():\n    raise ValueError('x') from None\n    raise\nassert x, 'msg'\n");
        let StmtKind::FunctionDef(def) = &stmts[0].kind else {
            panic!("expected def");
        };
        assert!(matches!(&def.body[0].kind, StmtKind::Raise(Some(Expr::Call { .. }))));
        assert!(matches!(&def.body[1].kind, StmtKind::Raise(None)));
        assert!(matches!(&stmts[1].kind, StmtKind::Assert { msg: Some(_), .. }));
    }

    #[test]
    fn delete_and_scope_declarations() {
        let stmts = body("del a, b[0]\nglobal g, h\n");
        assert!(matches!(&stmts[0].kind, StmtKind::Delete(targets) if targets.len() == 2));
        assert!(matches!(&stmts[1].kind, StmtKind::Global(names) if names == &vec!["g".to_string(), "h".to_string()]));
        let err = parse("del f()\n").unwrap_err();
        assert!(err.message.contains("cannot delete"));
    }

    #[test]
    fn syntax_errors_report_position() {
        let err = parse("x = (1 +)\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert_eq!(err.line, 1);

        let err = parse("a = 1\ndef f(:\n    pass\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn missing_block_is_indentation_error() {
        let err = parse("if x:\ny = 1\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Indentation);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn unexpected_indent() {
        let err = parse("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Indentation);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn unsupported_constructs_are_rejected() {
        let err = parse("@dec\ndef f():\n    pass\n").unwrap_err();
        assert_eq!(err.message, "decorators are not supported");
        assert!(parse("with open(p) as f:\n    pass\n").is_err());
        assert!(parse("def g():\n    yield 1\n").is_err());
        assert!(parse("async def g():\n    pass\n").is_err());
        assert!(parse("class C(A, B):\n    pass\n").is_err());
    }

    #[test]
    fn misplaced_jumps_are_rejected() {
        assert!(parse("return 1\n").is_err());
        assert!(parse("break\n").is_err());
        assert!(parse("for x in xs:\n    def f():\n        continue\n").is_err());
        assert!(parse("while True:\n    break\nelse:\n    pass\n").is_ok());
        assert!(parse("def f():\n    for x in xs:\n        return x\n").is_ok());
        assert!(parse("def f():\n    class C:\n        return 1\n").is_err());
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let err = parse("def f(a, a):\n    pass\n").unwrap_err();
        assert!(err.message.contains("duplicate argument"));
        let err = parse("def f(a=1, b):\n    pass\n").unwrap_err();
        assert!(err.message.contains("non-default argument"));
    }
}
