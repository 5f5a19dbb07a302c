//! Import individualization: rewriting aggregate imports into direct-name
//! imports.
//!
//! `import m` followed by `m.helper()` becomes `from m import helper`
//! followed by `helper()`. An alias survives as part of a residual
//! aggregate import when the bare name is still needed, that is when it is
//! used outside attribute position or has no attribute accesses at all.

use log::debug;
use ruff_python_ast::visitor::transformer::{self, Transformer};
use ruff_python_ast::{Alias, Expr, Stmt};

use crate::ast_builder;
use crate::document::{Document, StatementId};
use crate::types::FxIndexSet;
use crate::visitors::attribute_usage::UsageMap;

/// One local name bound by an aggregate import. Recomputed every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local_name: String,
    pub source_module: String,
}

/// Bindings introduced by top-level aggregate imports.
///
/// A dotted `import a.b` binds only the package name `a`, which cannot be
/// individualized against `a.b`, so such aliases yield no binding unless
/// renamed with `as`.
pub fn collect_bindings(document: &Document) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    for stmt in document.stmts() {
        let Stmt::Import(import) = stmt else { continue };
        for alias in &import.names {
            if let Some(binding) = binding_for_alias(alias) {
                bindings.push(binding);
            }
        }
    }
    bindings
}

fn binding_for_alias(alias: &Alias) -> Option<ImportBinding> {
    let module = alias.name.as_str();
    match &alias.asname {
        Some(asname) => Some(ImportBinding {
            local_name: asname.as_str().to_owned(),
            source_module: module.to_owned(),
        }),
        None if !module.contains('.') => Some(ImportBinding {
            local_name: module.to_owned(),
            source_module: module.to_owned(),
        }),
        None => None,
    }
}

/// Split aggregate imports according to observed usage and rewrite the
/// affected attribute accesses to bare names. Returns the number of import
/// statements that were rewritten.
pub fn individualize(document: &mut Document, usage: &UsageMap) -> usize {
    let mut plans: Vec<(StatementId, Vec<Stmt>)> = Vec::new();
    let mut renamed: FxIndexSet<String> = FxIndexSet::default();

    for entry in document.entries() {
        let Stmt::Import(import) = &entry.stmt else {
            continue;
        };
        let mut residual: Vec<Alias> = Vec::new();
        let mut emitted: Vec<Stmt> = Vec::new();
        for alias in &import.names {
            let attrs = binding_for_alias(alias)
                .and_then(|binding| {
                    usage
                        .attributes_of(&binding.local_name)
                        .map(|attrs| (binding, attrs))
                });
            let Some((binding, attrs)) = attrs else {
                residual.push(alias.clone());
                continue;
            };
            debug!(
                "individualizing '{}' from module '{}' ({} names)",
                binding.local_name,
                binding.source_module,
                attrs.len()
            );
            emitted.push(ast_builder::import_from(
                &binding.source_module,
                attrs
                    .iter()
                    .map(|attr| ast_builder::alias(attr, None))
                    .collect(),
            ));
            if usage.is_used_bare(&binding.local_name) {
                // The module object itself is still referenced, so the
                // aggregate import must survive alongside the direct one.
                residual.push(alias.clone());
            }
            renamed.insert(binding.local_name);
        }
        if emitted.is_empty() {
            continue;
        }
        let mut replacement = Vec::with_capacity(emitted.len() + 1);
        if !residual.is_empty() {
            replacement.push(ast_builder::import(residual));
        }
        replacement.extend(emitted);
        plans.push((entry.id, replacement));
    }

    let rewritten = plans.len();
    for (id, replacement) in plans {
        document.replace_with(id, replacement);
    }
    if !renamed.is_empty() {
        let rewriter = AttributeRewriter { renamed: &renamed };
        for entry in document.entries_mut() {
            rewriter.visit_stmt(&mut entry.stmt);
        }
    }
    rewritten
}

/// Rewrites `m.attr` to `attr` for every individualized local name, in all
/// scopes and expression contexts.
struct AttributeRewriter<'a> {
    renamed: &'a FxIndexSet<String>,
}

impl Transformer for AttributeRewriter<'_> {
    fn visit_expr(&self, expr: &mut Expr) {
        if let Expr::Attribute(attribute) = expr {
            if let Expr::Name(base) = attribute.value.as_ref() {
                if self.renamed.contains(base.id.as_str()) {
                    *expr = ast_builder::name(attribute.attr.as_str(), attribute.ctx);
                    return;
                }
            }
        }
        transformer::walk_expr(self, expr);
    }
}
