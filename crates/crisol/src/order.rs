//! Statement ordering: permute top-level statements so every definition
//! precedes its first use.
//!
//! The orderer is a collaborator with a contract: given a document it
//! returns a permutation of the top-level statements in which, for every
//! statement S referencing a top-level symbol defined by statement D, D
//! comes before S. When no such permutation exists the orderer fails.
//!
//! The default implementation distinguishes two reference tiers. Hard
//! references are evaluated when the statement executes at module level:
//! simple statement expressions, decorators, parameter defaults,
//! annotations, base classes, and class-body code. Soft references occur
//! inside function bodies, whose execution is deferred; they are honored
//! when possible and relaxed when they form cycles, so mutually recursive
//! functions order cleanly.

use log::debug;
use ruff_python_ast::visitor::source_order::{self, SourceOrderVisitor};
use ruff_python_ast::{self as ast, Expr, Stmt};
use thiserror::Error;

use crate::document::{Document, DocumentStatement};
use crate::types::{FxIndexMap, FxIndexSet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Statements whose execution-time dependencies form a cycle, such as
    /// two classes inheriting from each other.
    #[error("circular definition dependency among: {}", statements.join(", "))]
    CircularDefinitions { statements: Vec<String> },
}

/// Contract for the statement ordering collaborator.
pub trait StatementOrderer {
    fn order(&self, document: Document) -> Result<Document, OrderError>;
}

/// Default orderer implementation.
#[derive(Debug, Default)]
pub struct DefinitionOrderer;

impl StatementOrderer for DefinitionOrderer {
    fn order(&self, document: Document) -> Result<Document, OrderError> {
        let n = document.len();
        if n <= 1 {
            return Ok(document);
        }

        let defines: Vec<FxIndexSet<String>> = document
            .stmts()
            .map(|stmt| {
                let mut out = FxIndexSet::default();
                stmt_defines(stmt, &mut out);
                out
            })
            .collect();
        let refs: Vec<StatementRefs> = document.stmts().map(StatementRefs::of).collect();

        // Definition sites per symbol, in document order.
        let mut defs_of: FxIndexMap<&str, Vec<usize>> = FxIndexMap::default();
        for (index, names) in defines.iter().enumerate() {
            for name in names {
                defs_of.entry(name.as_str()).or_default().push(index);
            }
        }

        let mut deps_hard: Vec<FxIndexSet<usize>> = vec![FxIndexSet::default(); n];
        let mut deps_soft: Vec<FxIndexSet<usize>> = vec![FxIndexSet::default(); n];
        for (index, stmt_refs) in refs.iter().enumerate() {
            for name in &stmt_refs.hard {
                if let Some(def) = governing_definition(&defs_of, name, index) {
                    if def != index {
                        deps_hard[index].insert(def);
                    }
                }
            }
            for name in &stmt_refs.soft {
                if let Some(def) = governing_definition(&defs_of, name, index) {
                    if def != index {
                        deps_soft[index].insert(def);
                    }
                }
            }
        }
        // Redefinitions of a symbol keep their original relative order.
        for sites in defs_of.values() {
            for pair in sites.windows(2) {
                deps_hard[pair[1]].insert(pair[0]);
            }
        }

        let order = stable_topological_order(&deps_hard, &deps_soft).map_err(|remaining| {
            let statements = remaining
                .into_iter()
                .map(|index| describe_statement(&document.entries()[index], &defines[index]))
                .collect();
            OrderError::CircularDefinitions { statements }
        })?;

        Ok(document.map_statements(|statements| {
            let mut slots: Vec<Option<DocumentStatement>> =
                statements.into_iter().map(Some).collect();
            order
                .into_iter()
                .filter_map(|index| slots[index].take())
                .collect()
        }))
    }
}

/// The statement a reference at `index` resolves to: the closest earlier
/// definition, or the first definition overall for forward references.
fn governing_definition(
    defs_of: &FxIndexMap<&str, Vec<usize>>,
    name: &str,
    index: usize,
) -> Option<usize> {
    let sites = defs_of.get(name)?;
    sites
        .iter()
        .take_while(|&&site| site < index)
        .last()
        .or_else(|| sites.first())
        .copied()
}

/// Stable Kahn ordering over hard and soft dependencies. Soft edges are
/// dropped where they keep the remainder blocked; hard cycles surface the
/// remaining statement indices as the error.
fn stable_topological_order(
    deps_hard: &[FxIndexSet<usize>],
    deps_soft: &[FxIndexSet<usize>],
) -> Result<Vec<usize>, Vec<usize>> {
    let n = deps_hard.len();
    let mut released = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let satisfied =
        |deps: &FxIndexSet<usize>, released: &[bool]| deps.iter().all(|&dep| released[dep]);
    while order.len() < n {
        let next = (0..n).find(|&i| {
            !released[i]
                && satisfied(&deps_hard[i], &released)
                && satisfied(&deps_soft[i], &released)
        });
        let next = match next {
            Some(index) => index,
            None => {
                let fallback =
                    (0..n).find(|&i| !released[i] && satisfied(&deps_hard[i], &released));
                match fallback {
                    Some(index) => {
                        debug!(
                            "relaxing deferred reference cycle at statement {}",
                            index + 1
                        );
                        index
                    }
                    None => {
                        return Err((0..n).filter(|&i| !released[i]).collect());
                    }
                }
            }
        };
        released[next] = true;
        order.push(next);
    }
    Ok(order)
}

fn describe_statement(entry: &DocumentStatement, defines: &FxIndexSet<String>) -> String {
    match defines.first() {
        Some(name) => format!("'{name}'"),
        None if entry.line > 0 => format!("statement at line {}", entry.line),
        None => "synthesized statement".to_owned(),
    }
}

/// Names a statement binds at the scope it appears in. Recurses into
/// compound statement bodies, whose bindings land in the same scope, but
/// not into function or class bodies.
pub(crate) fn stmt_defines(stmt: &Stmt, out: &mut FxIndexSet<String>) {
    match stmt {
        Stmt::FunctionDef(func) => {
            out.insert(func.name.to_string());
        }
        Stmt::ClassDef(class) => {
            out.insert(class.name.to_string());
        }
        Stmt::Assign(assign) => {
            for target in &assign.targets {
                target_names(target, out);
            }
        }
        Stmt::AnnAssign(ann) if ann.value.is_some() => {
            target_names(&ann.target, out);
        }
        Stmt::AugAssign(aug) => {
            target_names(&aug.target, out);
        }
        Stmt::TypeAlias(alias) => {
            target_names(&alias.name, out);
        }
        Stmt::Import(import) => {
            for alias in &import.names {
                match &alias.asname {
                    Some(asname) => {
                        out.insert(asname.to_string());
                    }
                    None => {
                        let top = alias.name.split('.').next().unwrap_or_default();
                        out.insert(top.to_owned());
                    }
                }
            }
        }
        Stmt::ImportFrom(import_from) => {
            for alias in &import_from.names {
                if alias.name.as_str() == "*" {
                    continue;
                }
                let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                out.insert(bound.to_string());
            }
        }
        Stmt::For(for_stmt) => {
            target_names(&for_stmt.target, out);
            for nested in for_stmt.body.iter().chain(&for_stmt.orelse) {
                stmt_defines(nested, out);
            }
        }
        Stmt::While(while_stmt) => {
            for nested in while_stmt.body.iter().chain(&while_stmt.orelse) {
                stmt_defines(nested, out);
            }
        }
        Stmt::If(if_stmt) => {
            for nested in &if_stmt.body {
                stmt_defines(nested, out);
            }
            for clause in &if_stmt.elif_else_clauses {
                for nested in &clause.body {
                    stmt_defines(nested, out);
                }
            }
        }
        Stmt::With(with_stmt) => {
            for item in &with_stmt.items {
                if let Some(vars) = &item.optional_vars {
                    target_names(vars, out);
                }
            }
            for nested in &with_stmt.body {
                stmt_defines(nested, out);
            }
        }
        Stmt::Try(try_stmt) => {
            for nested in try_stmt
                .body
                .iter()
                .chain(&try_stmt.orelse)
                .chain(&try_stmt.finalbody)
            {
                stmt_defines(nested, out);
            }
            for handler in &try_stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                if let Some(name) = &handler.name {
                    out.insert(name.to_string());
                }
                for nested in &handler.body {
                    stmt_defines(nested, out);
                }
            }
        }
        Stmt::Match(match_stmt) => {
            for case in &match_stmt.cases {
                for nested in &case.body {
                    stmt_defines(nested, out);
                }
            }
        }
        _ => {}
    }
}

fn target_names(expr: &Expr, out: &mut FxIndexSet<String>) {
    match expr {
        Expr::Name(name) => {
            out.insert(name.id.to_string());
        }
        Expr::Tuple(tuple) => {
            for element in &tuple.elts {
                target_names(element, out);
            }
        }
        Expr::List(list) => {
            for element in &list.elts {
                target_names(element, out);
            }
        }
        Expr::Starred(starred) => target_names(&starred.value, out),
        // Attribute and subscript targets mutate existing objects rather
        // than binding scope names.
        _ => {}
    }
}

/// Hard and soft references of one top-level statement.
#[derive(Debug, Default)]
struct StatementRefs {
    hard: FxIndexSet<String>,
    soft: FxIndexSet<String>,
}

impl StatementRefs {
    fn of(stmt: &Stmt) -> Self {
        let mut collector = RefCollector::default();
        collector.visit_stmt(stmt);
        Self {
            hard: collector.hard,
            soft: collector.soft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Function,
    Class,
    Comprehension,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bound: FxIndexSet<String>,
}

/// Collects name references, splitting them into execution-time (hard)
/// and deferred (soft) tiers while tracking local bindings per scope.
#[derive(Debug, Default)]
struct RefCollector {
    hard: FxIndexSet<String>,
    soft: FxIndexSet<String>,
    scopes: Vec<Scope>,
    deferred: usize,
}

impl RefCollector {
    fn record(&mut self, name: &str) {
        if self.is_bound(name) {
            return;
        }
        if self.deferred > 0 {
            self.soft.insert(name.to_owned());
        } else {
            self.hard.insert(name.to_owned());
        }
    }

    /// Name lookup per Python scoping: class scopes are invisible to the
    /// functions nested inside them.
    fn is_bound(&self, name: &str) -> bool {
        let mut crossed_function = false;
        for scope in self.scopes.iter().rev() {
            let skip = scope.kind == ScopeKind::Class && crossed_function;
            if !skip && scope.bound.contains(name) {
                return true;
            }
            if scope.kind == ScopeKind::Function {
                crossed_function = true;
            }
        }
        false
    }

    fn visit_parameter_list(&mut self, parameters: &ast::Parameters) {
        for param in parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
        {
            if let Some(annotation) = &param.parameter.annotation {
                self.visit_expr(annotation);
            }
            if let Some(default) = &param.default {
                self.visit_expr(default);
            }
        }
        for param in [&parameters.vararg, &parameters.kwarg].into_iter().flatten() {
            if let Some(annotation) = &param.annotation {
                self.visit_expr(annotation);
            }
        }
    }

    fn parameter_names(parameters: &ast::Parameters) -> FxIndexSet<String> {
        let mut names = FxIndexSet::default();
        for param in parameters
            .posonlyargs
            .iter()
            .chain(&parameters.args)
            .chain(&parameters.kwonlyargs)
        {
            names.insert(param.parameter.name.to_string());
        }
        for param in [&parameters.vararg, &parameters.kwarg].into_iter().flatten() {
            names.insert(param.name.to_string());
        }
        names
    }

    fn function_locals(func: &ast::StmtFunctionDef) -> FxIndexSet<String> {
        let mut locals = Self::parameter_names(&func.parameters);
        for stmt in &func.body {
            stmt_defines(stmt, &mut locals);
        }
        let mut globals = FxIndexSet::default();
        collect_global_declarations(&func.body, &mut globals);
        locals.retain(|name| !globals.contains(name));
        locals
    }

    fn comprehension_refs(&mut self, generators: &[ast::Comprehension], element: impl FnOnce(&mut Self)) {
        let mut first = true;
        let mut bound = FxIndexSet::default();
        for generator in generators {
            if first {
                // The first iterable is evaluated in the enclosing scope.
                self.visit_expr(&generator.iter);
            }
            target_names(&generator.target, &mut bound);
            if !first {
                self.scopes.push(Scope {
                    kind: ScopeKind::Comprehension,
                    bound: bound.clone(),
                });
                self.visit_expr(&generator.iter);
                self.scopes.pop();
            }
            self.scopes.push(Scope {
                kind: ScopeKind::Comprehension,
                bound: bound.clone(),
            });
            for condition in &generator.ifs {
                self.visit_expr(condition);
            }
            self.scopes.pop();
            first = false;
        }
        self.scopes.push(Scope {
            kind: ScopeKind::Comprehension,
            bound,
        });
        element(self);
        self.scopes.pop();
    }
}

impl<'a> SourceOrderVisitor<'a> for RefCollector {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::FunctionDef(func) => {
                for decorator in &func.decorator_list {
                    self.visit_expr(&decorator.expression);
                }
                self.visit_parameter_list(&func.parameters);
                if let Some(returns) = &func.returns {
                    self.visit_expr(returns);
                }
                self.scopes.push(Scope {
                    kind: ScopeKind::Function,
                    bound: Self::function_locals(func),
                });
                self.deferred += 1;
                self.visit_body(&func.body);
                self.deferred -= 1;
                self.scopes.pop();
            }
            Stmt::ClassDef(class) => {
                for decorator in &class.decorator_list {
                    self.visit_expr(&decorator.expression);
                }
                for base in class.bases() {
                    self.visit_expr(base);
                }
                for keyword in class.keywords() {
                    self.visit_expr(&keyword.value);
                }
                let mut class_locals = FxIndexSet::default();
                for nested in &class.body {
                    stmt_defines(nested, &mut class_locals);
                }
                self.scopes.push(Scope {
                    kind: ScopeKind::Class,
                    bound: class_locals,
                });
                self.visit_body(&class.body);
                self.scopes.pop();
            }
            Stmt::AugAssign(aug) => {
                if let Expr::Name(name) = aug.target.as_ref() {
                    self.record(&name.id);
                }
                source_order::walk_stmt(self, stmt);
            }
            _ => source_order::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Name(name) => {
                if name.ctx.is_load() {
                    self.record(&name.id);
                }
            }
            Expr::Lambda(lambda) => {
                let mut bound = FxIndexSet::default();
                if let Some(parameters) = &lambda.parameters {
                    self.visit_parameter_list(parameters);
                    bound = Self::parameter_names(parameters);
                }
                self.scopes.push(Scope {
                    kind: ScopeKind::Function,
                    bound,
                });
                self.deferred += 1;
                self.visit_expr(&lambda.body);
                self.deferred -= 1;
                self.scopes.pop();
            }
            Expr::ListComp(comp) => {
                self.comprehension_refs(&comp.generators, |collector| {
                    collector.visit_expr(&comp.elt);
                });
            }
            Expr::SetComp(comp) => {
                self.comprehension_refs(&comp.generators, |collector| {
                    collector.visit_expr(&comp.elt);
                });
            }
            Expr::Generator(comp) => {
                self.comprehension_refs(&comp.generators, |collector| {
                    collector.visit_expr(&comp.elt);
                });
            }
            Expr::DictComp(comp) => {
                self.comprehension_refs(&comp.generators, |collector| {
                    if let Some(key) = &comp.key {
                        collector.visit_expr(key);
                    }
                    collector.visit_expr(&comp.value);
                });
            }
            _ => source_order::walk_expr(self, expr),
        }
    }
}

/// Names declared `global` anywhere in a function body, excluding nested
/// function and class scopes.
fn collect_global_declarations(body: &[Stmt], out: &mut FxIndexSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Global(global) => {
                for name in &global.names {
                    out.insert(name.to_string());
                }
            }
            Stmt::If(if_stmt) => {
                collect_global_declarations(&if_stmt.body, out);
                for clause in &if_stmt.elif_else_clauses {
                    collect_global_declarations(&clause.body, out);
                }
            }
            Stmt::While(while_stmt) => {
                collect_global_declarations(&while_stmt.body, out);
                collect_global_declarations(&while_stmt.orelse, out);
            }
            Stmt::For(for_stmt) => {
                collect_global_declarations(&for_stmt.body, out);
                collect_global_declarations(&for_stmt.orelse, out);
            }
            Stmt::With(with_stmt) => {
                collect_global_declarations(&with_stmt.body, out);
            }
            Stmt::Try(try_stmt) => {
                collect_global_declarations(&try_stmt.body, out);
                for handler in &try_stmt.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    collect_global_declarations(&handler.body, out);
                }
                collect_global_declarations(&try_stmt.orelse, out);
                collect_global_declarations(&try_stmt.finalbody, out);
            }
            Stmt::Match(match_stmt) => {
                for case in &match_stmt.cases {
                    collect_global_declarations(&case.body, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn order(code: &str) -> Result<String, OrderError> {
        let document = Document::parse(code, Path::new("test.py")).expect("test code parses");
        DefinitionOrderer.order(document).map(|doc| doc.render())
    }

    #[test]
    fn forward_calls_pull_definitions_ahead() {
        let output = order("run()\ndef run():\n    pass\n").expect("orderable");
        assert_eq!(output, "def run():\n    pass\nrun()\n");
    }

    #[test]
    fn already_ordered_input_is_untouched() {
        let code = "def a():\n    pass\ndef b():\n    return a()\nb()\n";
        assert_eq!(order(code).expect("orderable"), code);
    }

    #[test]
    fn constant_chains_resolve() {
        let output = order("X = Y + 1\nY = 2\n").expect("orderable");
        assert_eq!(output, "Y = 2\nX = Y + 1\n");
    }

    #[test]
    fn decorators_are_execution_time_references() {
        let code = "@register\ndef task():\n    pass\ndef register(f):\n    return f\n";
        let output = order(code).expect("orderable");
        assert!(
            output.find("def register").expect("register present")
                < output.find("@register").expect("decorator present"),
            "decorator definitions must precede their use:\n{output}"
        );
    }

    #[test]
    fn parameter_defaults_are_execution_time_references() {
        let output = order("def f(size=LIMIT):\n    return size\nLIMIT = 10\n").expect("orderable");
        assert_eq!(output, "LIMIT = 10\ndef f(size=LIMIT):\n    return size\n");
    }

    #[test]
    fn function_body_references_are_honored_when_acyclic() {
        let code = "def use():\n    return helper()\ndef helper():\n    return 1\n";
        let output = order(code).expect("orderable");
        assert!(
            output.find("def helper").expect("helper present")
                < output.find("def use").expect("use present"),
            "deferred references still order when no cycle exists:\n{output}"
        );
    }

    #[test]
    fn mutually_recursive_functions_are_not_an_error() {
        let code = "def ping():\n    return pong()\ndef pong():\n    return ping()\n";
        assert_eq!(order(code).expect("soft cycles relax"), code);
    }

    #[test]
    fn circular_class_bases_are_an_error() {
        let err = order("class A(B):\n    pass\nclass B(A):\n    pass\n")
            .expect_err("hard cycle must fail");
        let OrderError::CircularDefinitions { statements } = err;
        assert_eq!(statements, vec!["'A'", "'B'"]);
    }

    #[test]
    fn class_body_references_are_execution_time() {
        let output = order("class C:\n    size = LIMIT\nLIMIT = 5\n").expect("orderable");
        assert_eq!(output, "LIMIT = 5\nclass C:\n    size = LIMIT\n");
    }

    #[test]
    fn method_bodies_see_module_scope_not_class_scope() {
        let code = concat!(
            "class C:\n",
            "    helper = staticmethod(len)\n",
            "    def m(self):\n",
            "        return helper()\n",
            "def helper():\n",
            "    return 1\n",
        );
        let output = order(code).expect("orderable");
        assert!(
            output.find("def helper").expect("module helper present")
                < output.find("class C").expect("class present"),
            "a method's bare reference resolves to module scope:\n{output}"
        );
    }

    #[test]
    fn redefinitions_keep_their_relative_order() {
        let code = "x = 1\nuse_it(x)\nx = 2\n";
        assert_eq!(order(code).expect("orderable"), code);
    }

    #[test]
    fn self_recursion_is_not_a_cycle() {
        let code = "def loop(n):\n    return loop(n - 1) if n else 0\n";
        assert_eq!(order(code).expect("orderable"), code);
    }

    #[test]
    fn imports_act_as_definitions() {
        let output = order("value = config.DEBUG\nimport config\n").expect("orderable");
        assert_eq!(output, "import config\nvalue = config.DEBUG\n");
    }

    #[test]
    fn comprehension_targets_do_not_leak_references() {
        let output =
            order("squares = [n * n for n in range(LIMIT)]\nLIMIT = 4\n").expect("orderable");
        assert_eq!(output, "LIMIT = 4\nsquares = [n * n for n in range(LIMIT)]\n");
    }

    #[test]
    fn function_locals_do_not_create_dependencies() {
        let code = "def work():\n    total = seed()\n    return total\ntotal = 99\n";
        assert_eq!(
            order(code).expect("orderable"),
            code,
            "a local rebinding must not reference the module-level name"
        );
    }

    #[test]
    fn global_declarations_inside_match_arms_are_seen() {
        let code = concat!(
            "def bump(kind):\n",
            "    match kind:\n",
            "        case 'up':\n",
            "            global counter\n",
            "            counter = counter + 1\n",
            "counter = 0\n",
        );
        let output = order(code).expect("orderable");
        assert!(
            output.find("counter = 0").expect("assignment present")
                < output.find("def bump").expect("function present"),
            "a global declared in a match arm references module scope:\n{output}"
        );
    }

    #[test]
    fn lambda_bodies_are_deferred() {
        let code = "make = lambda: factory()\ndef factory():\n    return 1\n";
        let output = order(code).expect("orderable");
        assert!(
            output.find("def factory").expect("factory present")
                < output.find("make =").expect("lambda present"),
            "acyclic lambda references still order:\n{output}"
        );
    }
}
