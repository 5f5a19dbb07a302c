//! Attribute usage analysis for imported module aliases.
//!
//! For every tracked name this visitor records which attributes are
//! accessed on it (`m.attr` anywhere in the tree) and whether the name is
//! ever used bare, outside the value slot of an attribute access. The
//! individualizer uses the former to emit direct imports and the latter to
//! decide whether the aggregate import must survive.

use ruff_python_ast::visitor::source_order::{self, SourceOrderVisitor};
use ruff_python_ast::{Expr, Stmt};

use crate::types::{FxIndexMap, FxIndexSet};

/// Attribute and bare-name usage observed for tracked names.
///
/// Both layers preserve first-encounter order so downstream rewrites are
/// reproducible.
#[derive(Debug, Default)]
pub struct UsageMap {
    attributes: FxIndexMap<String, FxIndexSet<String>>,
    bare_uses: FxIndexSet<String>,
}

impl UsageMap {
    /// Collect usage for `tracked` names across all statements, including
    /// nested scopes.
    pub fn collect<'a>(
        stmts: impl Iterator<Item = &'a Stmt>,
        tracked: &FxIndexSet<String>,
    ) -> Self {
        let mut visitor = AttributeUsageVisitor {
            tracked,
            map: Self::default(),
        };
        for stmt in stmts {
            visitor.visit_stmt(stmt);
        }
        visitor.map
    }

    /// Attributes accessed on `name`, in first-encounter order.
    pub fn attributes_of(&self, name: &str) -> Option<&FxIndexSet<String>> {
        self.attributes.get(name).filter(|attrs| !attrs.is_empty())
    }

    /// Whether `name` appears outside attribute-access position anywhere.
    pub fn is_used_bare(&self, name: &str) -> bool {
        self.bare_uses.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.bare_uses.is_empty()
    }
}

struct AttributeUsageVisitor<'t> {
    tracked: &'t FxIndexSet<String>,
    map: UsageMap,
}

impl<'a> SourceOrderVisitor<'a> for AttributeUsageVisitor<'_> {
    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Attribute(attribute) => {
                if let Expr::Name(base) = attribute.value.as_ref() {
                    // The carrier of `m.attr` is not a bare use, so the
                    // base name is deliberately not walked.
                    if self.tracked.contains(base.id.as_str()) {
                        self.map
                            .attributes
                            .entry(base.id.to_string())
                            .or_default()
                            .insert(attribute.attr.to_string());
                    }
                } else {
                    source_order::walk_expr(self, expr);
                }
            }
            Expr::Name(name) => {
                if self.tracked.contains(name.id.as_str()) {
                    self.map.bare_uses.insert(name.id.to_string());
                }
            }
            _ => source_order::walk_expr(self, expr),
        }
    }
}
