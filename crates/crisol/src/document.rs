//! In-memory representation of the program being merged.
//!
//! A [`Document`] is the ordered sequence of top-level statements the merge
//! passes read and rewrite. Each statement carries a [`StatementId`] that
//! stays stable for the lifetime of the document, so passes remove and
//! permute statements by id rather than by source position.

use std::path::Path;

use ruff_python_ast::Stmt;
use ruff_python_codegen::{Generator, Stylist};
use ruff_python_parser::parse_module;
use ruff_text_size::Ranged;

use crate::error::MergeError;

/// Stable identifier of one top-level statement within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(u32);

/// One top-level statement plus its bookkeeping.
#[derive(Debug, Clone)]
pub struct DocumentStatement {
    pub id: StatementId,
    pub stmt: Stmt,
    /// 1-based line of the statement's start in the file it was parsed
    /// from; 0 for synthesized statements.
    pub line: u32,
}

/// Ordered top-level statements of the program being merged.
#[derive(Debug, Clone)]
pub struct Document {
    statements: Vec<DocumentStatement>,
    /// Text of the entry file, kept to derive the output code style.
    style_source: String,
    next_id: u32,
}

impl Document {
    /// Parse `source` into a document. `path` is used for error reporting
    /// only.
    pub fn parse(source: &str, path: &Path) -> Result<Self, MergeError> {
        let module = parse_module(source)
            .map_err(|err| MergeError::parse(path, err))?
            .into_syntax();
        let mut document = Self {
            statements: Vec::with_capacity(module.body.len()),
            style_source: source.to_owned(),
            next_id: 0,
        };
        for stmt in module.body {
            let line = line_of(source, stmt.range().start().to_usize());
            let id = document.alloc_id();
            document.statements.push(DocumentStatement { id, stmt, line });
        }
        Ok(document)
    }

    fn alloc_id(&mut self) -> StatementId {
        let id = StatementId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn entries(&self) -> &[DocumentStatement] {
        &self.statements
    }

    /// Mutable access to the statements themselves. The slice form keeps
    /// insertion and removal id-managed by this type.
    pub fn entries_mut(&mut self) -> &mut [DocumentStatement] {
        &mut self.statements
    }

    pub fn stmts(&self) -> impl Iterator<Item = &Stmt> {
        self.statements.iter().map(|entry| &entry.stmt)
    }

    /// Remove the statement with the given id, returning it.
    pub fn remove(&mut self, id: StatementId) -> Option<Stmt> {
        let index = self.statements.iter().position(|entry| entry.id == id)?;
        Some(self.statements.remove(index).stmt)
    }

    /// Keep only the statements satisfying `keep`, preserving order.
    pub fn retain_statements(&mut self, mut keep: impl FnMut(&Stmt) -> bool) {
        self.statements.retain(|entry| keep(&entry.stmt));
    }

    /// Replace the statement with the given id by zero or more synthesized
    /// statements, keeping its position. No-op if the id is gone.
    pub fn replace_with(&mut self, id: StatementId, replacements: Vec<Stmt>) {
        let Some(index) = self.statements.iter().position(|entry| entry.id == id) else {
            return;
        };
        self.statements.remove(index);
        let mut insert_at = index;
        for stmt in replacements {
            let id = self.alloc_id();
            self.statements
                .insert(insert_at, DocumentStatement { id, stmt, line: 0 });
            insert_at += 1;
        }
    }

    /// Parse a module file's source and prepend its statements to this
    /// document, so the inlined module's definitions precede everything
    /// that may use them. Returns the number of statements added.
    pub fn prepend_parsed(&mut self, source: &str, path: &Path) -> Result<usize, MergeError> {
        let module = parse_module(source)
            .map_err(|err| MergeError::parse(path, err))?
            .into_syntax();
        let mut incoming = Vec::with_capacity(module.body.len());
        for stmt in module.body {
            let line = line_of(source, stmt.range().start().to_usize());
            let id = self.alloc_id();
            incoming.push(DocumentStatement { id, stmt, line });
        }
        let added = incoming.len();
        incoming.append(&mut self.statements);
        self.statements = incoming;
        Ok(added)
    }

    /// Rebuild the statement sequence through `f`. The closure may drop
    /// and permute entries but must not invent new ones; used by the
    /// formatter and orderer collaborators.
    pub fn map_statements<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Vec<DocumentStatement>) -> Vec<DocumentStatement>,
    {
        self.statements = f(std::mem::take(&mut self.statements));
        self
    }

    /// Render a single statement in this document's code style.
    pub fn render_statement(&self, stmt: &Stmt) -> String {
        let (source, parsed) = self.style_tokens();
        let stylist = Stylist::from_tokens(parsed.tokens(), source);
        Generator::from(&stylist).stmt(stmt)
    }

    /// Render the whole document as source text.
    pub fn render(&self) -> String {
        let (source, parsed) = self.style_tokens();
        let stylist = Stylist::from_tokens(parsed.tokens(), source);
        let mut out = String::new();
        for entry in &self.statements {
            out.push_str(&Generator::from(&stylist).stmt(&entry.stmt));
            out.push('\n');
        }
        out
    }

    fn style_tokens(&self) -> (&str, ruff_python_parser::Parsed<ruff_python_ast::ModModule>) {
        match parse_module(&self.style_source) {
            Ok(parsed) => (self.style_source.as_str(), parsed),
            // The style source parsed when the document was created, so
            // this arm is unreachable in practice.
            Err(_) => (
                "",
                parse_module("").expect("empty module always parses"),
            ),
        }
    }
}

fn line_of(source: &str, offset: usize) -> u32 {
    let clamped = offset.min(source.len());
    (source[..clamped].bytes().filter(|b| *b == b'\n').count() + 1) as u32
}
