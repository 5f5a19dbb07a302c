//! Module inlining: replace one import of a locally authored module with
//! that module's full source, prepended to the document.
//!
//! Only `from module import names` statements are inlined. Aggregate
//! imports (`import module`) bind the module object itself and survive
//! untouched, since flattening cannot preserve a first-class module
//! value. One import is resolved per invocation; the driver re-runs the
//! pipeline until an invocation changes nothing.

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};
use ruff_python_ast::{self as ast, Stmt};

use crate::ast_builder;
use crate::document::{Document, StatementId};
use crate::error::MergeError;
use crate::resolver::ModuleResolver;
use crate::types::FxIndexSet;

/// What one inliner invocation did to the document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InlineOutcome {
    /// Module whose source was prepended, when one was.
    pub inlined: Option<String>,
    /// Whether the document was mutated at all. Dropping a repeated
    /// import counts: the document shrank even though nothing was
    /// prepended, and further imports may remain.
    pub changed: bool,
}

/// Find the first import of a locally authored module, remove it, and
/// prepend the module's source unless it was already inlined in this
/// conversion. Repeated imports are recorded in `repeats` so the driver
/// can verify the flattened output is still complete.
pub fn inline_next_module(
    document: &mut Document,
    resolver: &mut ModuleResolver,
    processed: &mut FxIndexSet<String>,
    repeats: &mut Vec<String>,
) -> Result<InlineOutcome, MergeError> {
    let Some(found) = find_local_import(document, resolver)? else {
        return Ok(InlineOutcome::default());
    };

    match found.site {
        ImportSite::TopLevel(id) => {
            document.remove(id);
        }
        ImportSite::Nested(id) => {
            let entry = document
                .entries_mut()
                .iter_mut()
                .find(|entry| entry.id == id);
            if let Some(entry) = entry {
                remove_nested_import(&mut entry.stmt, resolver, &found.module)?;
            }
        }
    }

    if processed.contains(&found.module) {
        debug!(
            "module '{}' was already inlined, dropping repeated import",
            found.module
        );
        repeats.push(found.module);
        return Ok(InlineOutcome {
            inlined: None,
            changed: true,
        });
    }

    let source = fs::read_to_string(&found.path)?;
    let count = document.prepend_parsed(&source, &found.path)?;
    info!(
        "inlined module '{}' ({count} top-level statements)",
        found.module
    );
    processed.insert(found.module.clone());
    Ok(InlineOutcome {
        inlined: Some(found.module),
        changed: true,
    })
}

#[derive(Debug)]
enum ImportSite {
    /// The import is itself a top-level statement.
    TopLevel(StatementId),
    /// The import sits somewhere inside this top-level statement's body.
    Nested(StatementId),
}

#[derive(Debug)]
struct FoundImport {
    module: String,
    path: PathBuf,
    site: ImportSite,
}

fn find_local_import(
    document: &Document,
    resolver: &mut ModuleResolver,
) -> Result<Option<FoundImport>, MergeError> {
    for entry in document.entries() {
        if let Some((module, path)) = local_from_import(&entry.stmt, resolver)? {
            return Ok(Some(FoundImport {
                module,
                path,
                site: ImportSite::TopLevel(entry.id),
            }));
        }
        if let Some((module, path)) = nested_local_import(&entry.stmt, resolver)? {
            return Ok(Some(FoundImport {
                module,
                path,
                site: ImportSite::Nested(entry.id),
            }));
        }
    }
    Ok(None)
}

/// Check whether `stmt` is a from-import of a locally authored module.
///
/// Relative imports declare locality by their leading dots, so failing to
/// resolve one is an error rather than a silent skip. `from . import x`
/// has no module path to resolve and is left in place with a warning.
fn local_from_import(
    stmt: &Stmt,
    resolver: &mut ModuleResolver,
) -> Result<Option<(String, PathBuf)>, MergeError> {
    let Stmt::ImportFrom(import_from) = stmt else {
        return Ok(None);
    };
    let Some(module) = &import_from.module else {
        if import_from.level > 0 {
            let names: Vec<&str> = import_from
                .names
                .iter()
                .map(|alias| alias.name.as_str())
                .collect();
            warn!(
                "leaving package-relative import 'from . import {}' in place",
                names.join(", ")
            );
        }
        return Ok(None);
    };
    match resolver.resolve_module_path(module.as_str()) {
        Some(path) => Ok(Some((module.to_string(), path))),
        None if import_from.level > 0 => {
            let relative: PathBuf = module.as_str().split('.').collect();
            Err(MergeError::MissingModule {
                module: module.to_string(),
                path: resolver.project_root().join(relative.with_extension("py")),
            })
        }
        None => Ok(None),
    }
}

fn nested_local_import(
    stmt: &Stmt,
    resolver: &mut ModuleResolver,
) -> Result<Option<(String, PathBuf)>, MergeError> {
    for body in nested_bodies(stmt) {
        for nested in body {
            if let Some(found) = local_from_import(nested, resolver)? {
                return Ok(Some(found));
            }
            if let Some(found) = nested_local_import(nested, resolver)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

/// The statement bodies nested directly inside `stmt`, in execution
/// order.
fn nested_bodies(stmt: &Stmt) -> Vec<&[Stmt]> {
    match stmt {
        Stmt::FunctionDef(func) => vec![&func.body],
        Stmt::ClassDef(class) => vec![&class.body],
        Stmt::If(if_stmt) => {
            let mut bodies: Vec<&[Stmt]> = vec![&if_stmt.body];
            bodies.extend(if_stmt.elif_else_clauses.iter().map(|c| c.body.as_slice()));
            bodies
        }
        Stmt::While(while_stmt) => vec![&while_stmt.body, &while_stmt.orelse],
        Stmt::For(for_stmt) => vec![&for_stmt.body, &for_stmt.orelse],
        Stmt::With(with_stmt) => vec![&with_stmt.body],
        Stmt::Try(try_stmt) => {
            let mut bodies: Vec<&[Stmt]> = vec![&try_stmt.body];
            for handler in &try_stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                bodies.push(&handler.body);
            }
            bodies.push(&try_stmt.orelse);
            bodies.push(&try_stmt.finalbody);
            bodies
        }
        Stmt::Match(match_stmt) => match_stmt
            .cases
            .iter()
            .map(|case| case.body.as_slice())
            .collect(),
        _ => Vec::new(),
    }
}

/// Remove the first local from-import of `module` found beneath `stmt`.
/// A body emptied by the removal is backfilled with `pass`.
fn remove_nested_import(
    stmt: &mut Stmt,
    resolver: &mut ModuleResolver,
    module: &str,
) -> Result<bool, MergeError> {
    for body in nested_bodies_mut(stmt) {
        let mut index = 0;
        while index < body.len() {
            let matches = match local_from_import(&body[index], resolver)? {
                Some((found, _)) => found == module,
                None => false,
            };
            if matches {
                body.remove(index);
                if body.is_empty() {
                    body.push(ast_builder::pass());
                }
                return Ok(true);
            }
            if remove_nested_import(&mut body[index], resolver, module)? {
                return Ok(true);
            }
            index += 1;
        }
    }
    Ok(false)
}

fn nested_bodies_mut(stmt: &mut Stmt) -> Vec<&mut thin_vec::ThinVec<Stmt>> {
    match stmt {
        Stmt::FunctionDef(func) => vec![&mut func.body],
        Stmt::ClassDef(class) => vec![&mut class.body],
        Stmt::If(if_stmt) => {
            let mut bodies = vec![&mut if_stmt.body];
            bodies.extend(if_stmt.elif_else_clauses.iter_mut().map(|c| &mut c.body));
            bodies
        }
        Stmt::While(while_stmt) => vec![&mut while_stmt.body, &mut while_stmt.orelse],
        Stmt::For(for_stmt) => vec![&mut for_stmt.body, &mut for_stmt.orelse],
        Stmt::With(with_stmt) => vec![&mut with_stmt.body],
        Stmt::Try(try_stmt) => {
            let mut bodies = vec![&mut try_stmt.body];
            for handler in &mut try_stmt.handlers {
                let ast::ExceptHandler::ExceptHandler(handler) = handler;
                bodies.push(&mut handler.body);
            }
            bodies.push(&mut try_stmt.orelse);
            bodies.push(&mut try_stmt.finalbody);
            bodies
        }
        Stmt::Match(match_stmt) => match_stmt
            .cases
            .iter_mut()
            .map(|case| &mut case.body)
            .collect(),
        _ => Vec::new(),
    }
}
