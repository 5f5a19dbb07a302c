//! Import formatting: grouping, de-duplication and floating to the top.
//!
//! The formatter is a collaborator with a narrow contract: given a
//! document it returns an equivalent document whose top-level import
//! statements are de-duplicated by exact text, grouped by origin, sorted
//! within each group, and moved ahead of everything else. Non-import
//! statements keep their relative order. Nested imports are not touched.

use log::debug;
use ruff_python_ast::Stmt;

use crate::document::{Document, DocumentStatement, StatementId};
use crate::resolver::ModuleResolver;
use crate::types::{FxIndexMap, FxIndexSet, ImportGroup};

/// Contract for the import formatting collaborator.
pub trait ImportFormatter {
    /// Rearrange imports. `groups` maps module names appearing in import
    /// statements to their classified origin.
    fn format(&self, document: Document, groups: &FxIndexMap<String, ImportGroup>) -> Document;
}

/// Classify every module named by a top-level import, for the formatter.
pub fn collect_import_groups(
    document: &Document,
    resolver: &mut ModuleResolver,
) -> FxIndexMap<String, ImportGroup> {
    let mut groups: FxIndexMap<String, ImportGroup> = FxIndexMap::default();
    for stmt in document.stmts() {
        match stmt {
            Stmt::Import(import) => {
                for alias in &import.names {
                    let module = alias.name.as_str();
                    if !groups.contains_key(module) {
                        groups.insert(module.to_owned(), resolver.classify_import(module));
                    }
                }
            }
            Stmt::ImportFrom(import_from) if import_from.level == 0 => {
                if let Some(module) = &import_from.module {
                    if !groups.contains_key(module.as_str()) {
                        groups.insert(
                            module.as_str().to_owned(),
                            resolver.classify_import(module.as_str()),
                        );
                    }
                }
            }
            _ => {}
        }
    }
    groups
}

/// Default formatter implementation.
#[derive(Debug, Default)]
pub struct GroupingFormatter;

impl ImportFormatter for GroupingFormatter {
    fn format(&self, document: Document, groups: &FxIndexMap<String, ImportGroup>) -> Document {
        let mut import_info: FxIndexMap<StatementId, (ImportGroup, String)> =
            FxIndexMap::default();
        for entry in document.entries() {
            let group = match &entry.stmt {
                Stmt::Import(import) => {
                    let module = import
                        .names
                        .first()
                        .map_or("", |alias| alias.name.as_str());
                    groups
                        .get(module)
                        .copied()
                        .unwrap_or(ImportGroup::ThirdParty)
                }
                Stmt::ImportFrom(import_from) => {
                    if import_from.level > 0 {
                        // Relative imports are by definition first-party.
                        ImportGroup::FirstParty
                    } else {
                        import_from
                            .module
                            .as_ref()
                            .and_then(|module| groups.get(module.as_str()).copied())
                            .unwrap_or(ImportGroup::ThirdParty)
                    }
                }
                _ => continue,
            };
            let rendered = document.render_statement(&entry.stmt);
            import_info.insert(entry.id, (group, rendered));
        }

        document.map_statements(move |statements| {
            let mut imports: Vec<(ImportGroup, String, DocumentStatement)> = Vec::new();
            let mut seen: FxIndexSet<String> = FxIndexSet::default();
            let mut rest: Vec<DocumentStatement> = Vec::new();
            for entry in statements {
                match import_info.shift_remove(&entry.id) {
                    Some((group, rendered)) => {
                        if seen.contains(&rendered) {
                            debug!("dropping duplicate import: {rendered}");
                            continue;
                        }
                        seen.insert(rendered.clone());
                        imports.push((group, rendered, entry));
                    }
                    None => rest.push(entry),
                }
            }
            imports.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
            let mut result: Vec<DocumentStatement> =
                imports.into_iter().map(|(_, _, entry)| entry).collect();
            result.extend(rest);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn groups_fixture() -> FxIndexMap<String, ImportGroup> {
        let mut groups = FxIndexMap::default();
        for (module, group) in [
            ("__future__", ImportGroup::Future),
            ("os", ImportGroup::StandardLibrary),
            ("sys", ImportGroup::StandardLibrary),
            ("zlib", ImportGroup::StandardLibrary),
            ("requests", ImportGroup::ThirdParty),
            ("lib", ImportGroup::FirstParty),
            ("util.text", ImportGroup::FirstParty),
        ] {
            groups.insert(module.to_owned(), group);
        }
        groups
    }

    fn format(code: &str) -> String {
        let document = Document::parse(code, Path::new("test.py")).expect("test code parses");
        GroupingFormatter
            .format(document, &groups_fixture())
            .render()
    }

    #[test]
    fn imports_float_above_other_statements() {
        let output = format("x = 1\nimport zlib\ny = 2\n");
        assert_eq!(output, "import zlib\nx = 1\ny = 2\n");
    }

    #[test]
    fn duplicate_imports_collapse_to_one() {
        let output = format("import os\nx = 1\nimport os\n");
        assert_eq!(output, "import os\nx = 1\n");
    }

    #[test]
    fn textually_different_imports_are_both_kept() {
        let output = format("from os import path\nimport os\n");
        assert_eq!(output, "from os import path\nimport os\n");
    }

    #[test]
    fn groups_emit_in_canonical_order() {
        let code = concat!(
            "import lib\n",
            "import requests\n",
            "import os\n",
            "from __future__ import annotations\n",
        );
        let output = format(code);
        assert_eq!(
            output,
            concat!(
                "from __future__ import annotations\n",
                "import os\n",
                "import requests\n",
                "import lib\n",
            )
        );
    }

    #[test]
    fn imports_sort_by_text_within_a_group() {
        let output = format("import sys\nimport os\n");
        assert_eq!(output, "import os\nimport sys\n");
    }

    #[test]
    fn relative_imports_group_as_first_party() {
        let output = format("from .sibling import thing\nimport os\n");
        assert_eq!(output, "import os\nfrom .sibling import thing\n");
    }

    #[test]
    fn non_import_statements_keep_their_relative_order() {
        let code = "b = 2\nimport os\na = 1\nc = b + a\n";
        let output = format(code);
        assert_eq!(output, "import os\nb = 2\na = 1\nc = b + a\n");
    }

    #[test]
    fn nested_imports_are_left_where_they_are() {
        let code = "def lazy():\n    import os\n    return os\n";
        assert_eq!(format(code), code);
    }

    #[test]
    fn formatting_is_idempotent() {
        let code = "x = 1\nimport sys\nimport os\nimport lib\nfrom lib import a\n";
        let document = Document::parse(code, Path::new("test.py")).expect("test code parses");
        let groups = groups_fixture();
        let once = GroupingFormatter.format(document, &groups);
        let first = once.render();
        let twice = GroupingFormatter.format(once, &groups);
        assert_eq!(first, twice.render(), "a second run must change nothing");
    }
}
