//! Factory functions for synthesized AST nodes.
//!
//! All nodes are created with `TextRange::default()` and
//! `AtomicNodeIndex::NONE` to mark their synthetic nature; the code
//! generator never reads positions, so dummy ranges are safe.

use ruff_python_ast::name::Name;
use ruff_python_ast::{
    Alias, AtomicNodeIndex, Expr, ExprContext, ExprName, Identifier, Stmt, StmtImport,
    StmtImportFrom, StmtPass,
};
use ruff_text_size::TextRange;

/// Creates an import alias, optionally renamed.
///
/// # Example
/// ```rust
/// // `os as operating_system`
/// let node = crisol::ast_builder::alias("os", Some("operating_system"));
/// ```
pub fn alias(name: &str, asname: Option<&str>) -> Alias {
    Alias {
        name: Identifier::new(name, TextRange::default()),
        asname: asname.map(|s| Identifier::new(s, TextRange::default())),
        range: TextRange::default(),
        node_index: AtomicNodeIndex::NONE,
    }
}

/// Creates an aggregate import statement: `import a, b as c`.
pub fn import(names: Vec<Alias>) -> Stmt {
    Stmt::Import(StmtImport {
        names,
        is_lazy: false,
        range: TextRange::default(),
        node_index: AtomicNodeIndex::NONE,
    })
}

/// Creates a from-import statement: `from module import a, b`.
pub fn import_from(module: &str, names: Vec<Alias>) -> Stmt {
    Stmt::ImportFrom(StmtImportFrom {
        module: Some(Identifier::new(module, TextRange::default())),
        names,
        level: 0,
        is_lazy: false,
        range: TextRange::default(),
        node_index: AtomicNodeIndex::NONE,
    })
}

/// Creates a name expression in the given context.
pub fn name(name: &str, ctx: ExprContext) -> Expr {
    Expr::Name(ExprName {
        id: Name::new(name),
        ctx,
        range: TextRange::default(),
        node_index: AtomicNodeIndex::NONE,
    })
}

/// Creates a `pass` statement, used to keep emptied bodies valid.
pub fn pass() -> Stmt {
    Stmt::Pass(StmtPass {
        range: TextRange::default(),
        node_index: AtomicNodeIndex::NONE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_from_builds_the_expected_node() {
        let stmt = import_from("collections", vec![alias("OrderedDict", None)]);
        let Stmt::ImportFrom(node) = &stmt else {
            panic!("expected an ImportFrom statement");
        };
        assert_eq!(node.module.as_ref().map(|m| m.as_str()), Some("collections"));
        assert_eq!(node.level, 0);
        assert_eq!(node.names.len(), 1);
        assert_eq!(node.names[0].name.as_str(), "OrderedDict");
        assert!(node.names[0].asname.is_none());
    }

    #[test]
    fn aliased_import_keeps_the_rename() {
        let stmt = import(vec![alias("numpy", Some("np"))]);
        let Stmt::Import(node) = &stmt else {
            panic!("expected an Import statement");
        };
        assert_eq!(node.names[0].name.as_str(), "numpy");
        assert_eq!(node.names[0].asname.as_ref().map(|a| a.as_str()), Some("np"));
    }

    #[test]
    fn name_carries_its_context() {
        let Expr::Name(node) = name("helper", ExprContext::Load) else {
            panic!("expected a Name expression");
        };
        assert_eq!(node.id.as_str(), "helper");
        assert!(node.ctx.is_load());
    }
}
