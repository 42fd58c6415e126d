//! Static scope analysis of function and class bodies.
//!
//! A name assigned anywhere in a function body is local to the whole body
//! unless declared `global` or `nonlocal`; reading it before assignment is an
//! `UnboundLocalError`, not a fall-through to globals.

use std::collections::HashSet;

use steptrace_syntax::ast::{Expr, Params, Stmt, StmtKind};

#[derive(Debug, Default)]
pub(crate) struct ScopeInfo {
    pub locals: HashSet<String>,
    pub globals: HashSet<String>,
    pub nonlocals: HashSet<String>,
}

impl ScopeInfo {
    pub fn for_function(params: &Params, body: &[Stmt]) -> ScopeInfo {
        let mut info = ScopeInfo::for_block(body);
        info.locals.extend(params.names().map(str::to_string));
        info
    }

    pub fn for_lambda(params: &Params) -> ScopeInfo {
        ScopeInfo {
            locals: params.names().map(str::to_string).collect(),
            ..ScopeInfo::default()
        }
    }

    pub fn for_block(body: &[Stmt]) -> ScopeInfo {
        let mut bound = HashSet::new();
        let mut info = ScopeInfo::default();
        collect(body, &mut bound, &mut info);
        info.locals = bound
            .into_iter()
            .filter(|name| !info.globals.contains(name) && !info.nonlocals.contains(name))
            .collect();
        info
    }
}

fn collect(stmts: &[Stmt], bound: &mut HashSet<String>, info: &mut ScopeInfo) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    target_names(target, bound);
                }
            }
            StmtKind::AugAssign { target, .. } | StmtKind::AnnAssign { target, .. } => {
                target_names(target, bound)
            }
            StmtKind::If { branches, orelse } => {
                for branch in branches {
                    collect(&branch.body, bound, info);
                }
                if let Some(orelse) = orelse {
                    collect(orelse, bound, info);
                }
            }
            StmtKind::While { body, orelse, .. } => {
                collect(body, bound, info);
                if let Some(orelse) = orelse {
                    collect(orelse, bound, info);
                }
            }
            StmtKind::For {
                target,
                body,
                orelse,
                ..
            } => {
                target_names(target, bound);
                collect(body, bound, info);
                if let Some(orelse) = orelse {
                    collect(orelse, bound, info);
                }
            }
            StmtKind::FunctionDef(def) => {
                bound.insert(def.name.clone());
            }
            StmtKind::ClassDef(class) => {
                bound.insert(class.name.clone());
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                collect(body, bound, info);
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        bound.insert(name.clone());
                    }
                    collect(&handler.body, bound, info);
                }
                for block in [orelse, finalbody].into_iter().flatten() {
                    collect(block, bound, info);
                }
            }
            StmtKind::Global(names) => info.globals.extend(names.iter().cloned()),
            StmtKind::Nonlocal(names) => info.nonlocals.extend(names.iter().cloned()),
            StmtKind::Delete(targets) => {
                for target in targets {
                    target_names(target, bound);
                }
            }
            StmtKind::Import(aliases) => {
                for alias in aliases {
                    let name = match &alias.asname {
                        Some(asname) => asname.clone(),
                        None => alias.name.split('.').next().unwrap_or_default().to_string(),
                    };
                    bound.insert(name);
                }
            }
            StmtKind::ImportFrom { names, .. } => {
                for alias in names {
                    bound.insert(alias.asname.clone().unwrap_or_else(|| alias.name.clone()));
                }
            }
            StmtKind::Expr(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::Return(_)
            | StmtKind::Raise(_)
            | StmtKind::Assert { .. } => {}
        }
    }
}

fn target_names(target: &Expr, bound: &mut HashSet<String>) {
    match target {
        Expr::Name(name) => {
            bound.insert(name.clone());
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                target_names(item, bound);
            }
        }
        Expr::Starred(inner) => target_names(inner, bound),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steptrace_syntax::parse;

    fn info_for(source: &str) -> ScopeInfo {
        let module = parse(source).unwrap();
        match &module.body[0].kind {
            StmtKind::FunctionDef(def) => ScopeInfo::for_function(&def.params, &def.body),
            other => panic!("expected def, got {other:?}"),
        }
    }

    #[test]
    fn assigned_names_and_params_are_local() {
        let info = info_for(
            "def f(a, *rest):\n    b = 1\n    for i, (j, k) in xs:\n        pass\n    import math\n",
        );
        for name in ["a", "rest", "b", "i", "j", "k", "math"] {
            assert!(info.locals.contains(name), "{name} should be local");
        }
        assert!(!info.locals.contains("xs"));
    }

    #[test]
    fn declarations_remove_locals() {
        let info = info_for("def f():\n    global count\n    count += 1\n    nonlocal total\n    total = 0\n");
        assert!(!info.locals.contains("count"));
        assert!(!info.locals.contains("total"));
        assert!(info.globals.contains("count"));
        assert!(info.nonlocals.contains("total"));
    }

    #[test]
    fn nested_definitions_bind_only_their_name() {
        let info = info_for("def f():\n    def g():\n        inner = 1\n    class C:\n        attr = 2\n");
        assert!(info.locals.contains("g"));
        assert!(info.locals.contains("C"));
        assert!(!info.locals.contains("inner"));
        assert!(!info.locals.contains("attr"));
    }
}
