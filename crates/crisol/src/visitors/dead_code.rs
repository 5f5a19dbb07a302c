//! Removal of statements with no observable effect.
//!
//! Two syntactic shapes are eliminated, at top level and inside nested
//! bodies: standalone literal constants (docstrings included) and
//! standalone calls to the configured no-op function. Parameter and return
//! type annotations are stripped as well; they are metadata with no
//! runtime behavior. No general liveness analysis happens here.

use std::cell::Cell;

use log::debug;
use ruff_python_ast::visitor::transformer::{Transformer, walk_stmt};
use ruff_python_ast::{self as ast, Expr, Stmt, StmtExpr, StmtFunctionDef};

use crate::ast_builder;
use crate::document::Document;

/// Totals reported by one elimination run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadCodeStats {
    pub removed_statements: usize,
    pub stripped_annotations: usize,
}

/// Removes no-op statements and annotations from a document.
pub struct DeadCodeTransformer {
    noop_function: String,
    removed: Cell<usize>,
    stripped: Cell<usize>,
}

impl DeadCodeTransformer {
    pub fn new(noop_function: impl Into<String>) -> Self {
        Self {
            noop_function: noop_function.into(),
            removed: Cell::new(0),
            stripped: Cell::new(0),
        }
    }

    /// Run the elimination over every statement of the document.
    pub fn transform_document(&self, document: &mut Document) -> DeadCodeStats {
        for entry in document.entries_mut() {
            self.visit_stmt(&mut entry.stmt);
        }
        let before = document.len();
        document.retain_statements(|stmt| !self.is_removable_statement(stmt));
        self.removed.set(self.removed.get() + before - document.len());
        DeadCodeStats {
            removed_statements: self.removed.get(),
            stripped_annotations: self.stripped.get(),
        }
    }

    fn is_removable_statement(&self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Expr(expr_stmt) => self.is_removable_expr_stmt(expr_stmt),
            _ => false,
        }
    }

    fn is_removable_expr_stmt(&self, expr_stmt: &StmtExpr) -> bool {
        match expr_stmt.value.as_ref() {
            // Standalone constants, docstrings included. F-strings and
            // container displays may evaluate arbitrary code, so they stay.
            Expr::StringLiteral(_)
            | Expr::BytesLiteral(_)
            | Expr::NumberLiteral(_)
            | Expr::BooleanLiteral(_)
            | Expr::NoneLiteral(_)
            | Expr::EllipsisLiteral(_) => true,

            Expr::Call(call) => match call.func.as_ref() {
                Expr::Name(name) if name.id == self.noop_function.as_str() => {
                    debug!("removing no-op call to '{}'", name.id);
                    true
                }
                _ => false,
            },

            _ => false,
        }
    }

    fn strip_annotations(&self, func: &mut StmtFunctionDef) {
        let mut stripped = self.stripped.get();
        if func.returns.take().is_some() {
            stripped += 1;
        }
        let parameters = &mut func.parameters;
        for param in parameters
            .posonlyargs
            .iter_mut()
            .chain(parameters.args.iter_mut())
            .chain(parameters.kwonlyargs.iter_mut())
        {
            if param.parameter.annotation.take().is_some() {
                stripped += 1;
            }
        }
        if let Some(vararg) = &mut parameters.vararg {
            if vararg.annotation.take().is_some() {
                stripped += 1;
            }
        }
        if let Some(kwarg) = &mut parameters.kwarg {
            if kwarg.annotation.take().is_some() {
                stripped += 1;
            }
        }
        self.stripped.set(stripped);
    }

    /// Transform nested statements first, then drop the no-ops. A body
    /// emptied by removal gets a `pass` to stay syntactically valid.
    fn process_body(&self, body: &mut thin_vec::ThinVec<Stmt>) {
        for stmt in body.iter_mut() {
            self.visit_stmt(stmt);
        }
        let original_len = body.len();
        body.retain(|stmt| !self.is_removable_statement(stmt));
        self.removed
            .set(self.removed.get() + original_len - body.len());
        if body.is_empty() && original_len > 0 {
            body.push(ast_builder::pass());
        }
    }
}

impl Transformer for DeadCodeTransformer {
    fn visit_stmt(&self, stmt: &mut Stmt) {
        match stmt {
            Stmt::FunctionDef(func_def) => {
                self.strip_annotations(func_def);
                self.process_body(&mut func_def.body);
            }
            Stmt::ClassDef(class_def) => {
                self.process_body(&mut class_def.body);
            }
            Stmt::If(if_stmt) => {
                self.process_body(&mut if_stmt.body);
                for elif_else in &mut if_stmt.elif_else_clauses {
                    self.process_body(&mut elif_else.body);
                }
            }
            Stmt::While(while_stmt) => {
                self.process_body(&mut while_stmt.body);
                self.process_body(&mut while_stmt.orelse);
            }
            Stmt::For(for_stmt) => {
                self.process_body(&mut for_stmt.body);
                self.process_body(&mut for_stmt.orelse);
            }
            Stmt::With(with_stmt) => {
                self.process_body(&mut with_stmt.body);
            }
            Stmt::Try(try_stmt) => {
                self.process_body(&mut try_stmt.body);
                for handler in &mut try_stmt.handlers {
                    match handler {
                        ast::ExceptHandler::ExceptHandler(handler) => {
                            self.process_body(&mut handler.body);
                        }
                    }
                }
                self.process_body(&mut try_stmt.orelse);
                self.process_body(&mut try_stmt.finalbody);
            }
            Stmt::Match(match_stmt) => {
                for case in &mut match_stmt.cases {
                    self.process_body(&mut case.body);
                }
            }
            _ => {
                walk_stmt(self, stmt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn eliminate(code: &str) -> (String, DeadCodeStats) {
        eliminate_with("print", code)
    }

    fn eliminate_with(noop: &str, code: &str) -> (String, DeadCodeStats) {
        let mut document =
            Document::parse(code, Path::new("test.py")).expect("test code should parse");
        let transformer = DeadCodeTransformer::new(noop);
        let stats = transformer.transform_document(&mut document);
        (document.render(), stats)
    }

    #[test]
    fn docstrings_and_debug_prints_disappear() {
        let code = "\"module docstring\"\nprint('debug')\nx = 1\n";
        let (output, stats) = eliminate(code);
        assert_eq!(output, "x = 1\n");
        assert_eq!(stats.removed_statements, 2);
    }

    #[test]
    fn all_constant_shapes_are_removed() {
        let code = "42\nTrue\nNone\n...\nb'raw'\nx = 1\n";
        let (output, _) = eliminate(code);
        assert_eq!(output, "x = 1\n");
    }

    #[test]
    fn fstrings_and_container_displays_survive() {
        let code = "f'{setup()}'\n[record(), record()]\nname\n";
        let (output, stats) = eliminate(code);
        assert_eq!(output, code);
        assert_eq!(stats.removed_statements, 0);
    }

    #[test]
    fn only_bare_name_calls_match_the_noop() {
        let code = "logger.print('kept')\nprint('dropped')\n";
        let (output, _) = eliminate(code);
        assert_eq!(output, "logger.print('kept')\n");
    }

    #[test]
    fn the_noop_name_is_configurable() {
        let code = "log('gone')\nprint('kept')\n";
        let (output, _) = eliminate_with("log", code);
        assert_eq!(output, "print('kept')\n");
    }

    #[test]
    fn function_docstrings_are_removed_from_the_body() {
        let code = "def helper():\n    \"docs\"\n    return 1\n";
        let (output, _) = eliminate(code);
        assert!(!output.contains("docs"));
        assert!(output.contains("return 1"));
    }

    #[test]
    fn emptied_bodies_receive_a_pass() {
        let code = "def noisy():\n    print('a')\n    print('b')\n";
        let (output, stats) = eliminate(code);
        assert_eq!(output, "def noisy():\n    pass\n");
        assert_eq!(stats.removed_statements, 2);
    }

    #[test]
    fn annotations_are_stripped_from_every_parameter_kind() {
        let code = "def f(a: int, /, b: str, *args: int, c: bool = True, **kw: str) -> None:\n    return b\n";
        let (output, stats) = eliminate(code);
        assert_eq!(output, "def f(a, /, b, *args, c=True, **kw):\n    return b\n");
        assert_eq!(stats.stripped_annotations, 6);
    }

    #[test]
    fn async_functions_are_stripped_too() {
        let code = "async def fetch(url: str) -> bytes:\n    return await get(url)\n";
        let (output, _) = eliminate(code);
        assert_eq!(output, "async def fetch(url):\n    return await get(url)\n");
    }

    #[test]
    fn nested_bodies_are_processed() {
        let code = concat!(
            "if flag:\n",
            "    print('then')\n",
            "else:\n",
            "    'comment string'\n",
            "    work()\n",
            "try:\n",
            "    print('try')\n",
            "except ValueError:\n",
            "    print('handler')\n",
            "finally:\n",
            "    cleanup()\n",
        );
        let (output, _) = eliminate(code);
        assert!(!output.contains("print"));
        assert!(!output.contains("comment string"));
        assert!(output.contains("work()"));
        assert!(output.contains("cleanup()"));
        assert!(
            output.contains("pass"),
            "emptied branches must stay syntactically valid:\n{output}"
        );
    }

    #[test]
    fn match_case_bodies_are_processed() {
        let code = concat!(
            "match value:\n",
            "    case 0:\n",
            "        print('zero')\n",
            "    case _:\n",
            "        'case note'\n",
            "        handle(value)\n",
        );
        let (output, stats) = eliminate(code);
        assert!(!output.contains("print"), "got:\n{output}");
        assert!(!output.contains("case note"));
        assert!(output.contains("handle(value)"));
        assert!(
            output.contains("pass"),
            "an emptied case body must stay syntactically valid:\n{output}"
        );
        assert_eq!(stats.removed_statements, 2);
    }

    #[test]
    fn annotated_assignments_keep_their_values() {
        let code = "x: int = 5\ny = x\n";
        let (output, _) = eliminate(code);
        assert_eq!(output, code, "annotated assignments are not expression statements");
    }
}
