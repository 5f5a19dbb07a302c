//! Entry point discovery: a diagnostic scan over a project directory.
//!
//! Finds the files carrying a runnable entry marker (a top-level
//! `if __name__ == "__main__":` check) and builds an import graph over
//! the locally authored modules. A cyclic graph is reported as a fatal
//! finding. On an acyclic graph the scan also suggests the "most
//! central leaf": the module with minimum out-degree among modules
//! imported by exactly one other, ties broken by module name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use ruff_python_ast::{CmpOp, Expr, Stmt};
use ruff_python_parser::parse_module;
use walkdir::{DirEntry, WalkDir};

use crate::error::MergeError;
use crate::types::{FxIndexMap, FxIndexSet};

/// What a directory scan found.
#[derive(Debug)]
pub struct DiscoveryReport {
    /// Files containing a runnable entry marker, in scan order.
    pub entry_files: Vec<PathBuf>,
    /// Heuristic suggestion for the module to start reading from.
    pub central_leaf: Option<PathBuf>,
    /// All modules that participated in the scan.
    pub modules: Vec<String>,
}

/// Scan `dir` for entry points and import structure.
///
/// Unreadable or unparseable files are skipped with a warning; the scan
/// is a diagnostic, not a build step. A cyclic import graph is the one
/// fatal finding.
pub fn discover_entry_points(dir: &Path) -> Result<DiscoveryReport, MergeError> {
    if !dir.is_dir() {
        return Err(MergeError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )));
    }

    let mut entry_files = Vec::new();
    let mut modules: FxIndexMap<String, ModuleScan> = FxIndexMap::default();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable directory entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("py") {
            continue;
        }
        let Some(name) = module_name(dir, path) else {
            debug!("cannot derive a module name for {}", path.display());
            continue;
        };
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!("skipping unreadable file {}: {err}", path.display());
                continue;
            }
        };
        let parsed = match parse_module(&source) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("skipping unparseable file {}: {err}", path.display());
                continue;
            }
        };
        let body = &parsed.syntax().body;
        if has_entry_marker(body) {
            entry_files.push(path.to_path_buf());
        }
        modules.insert(
            name,
            ModuleScan {
                path: path.to_path_buf(),
                imports: imported_names(body),
            },
        );
    }

    let known: FxIndexSet<String> = modules.keys().cloned().collect();
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: FxIndexMap<&str, NodeIndex> = FxIndexMap::default();
    for name in modules.keys() {
        nodes.insert(name.as_str(), graph.add_node(name.clone()));
    }
    for (name, scan) in &modules {
        let importer = nodes[name.as_str()];
        for target in resolve_imports(&scan.imports, &known) {
            graph.add_edge(importer, nodes[target.as_str()], ());
        }
    }

    let cyclic: Vec<String> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .flatten()
        .map(|node| graph[node].clone())
        .collect();
    if !cyclic.is_empty() {
        return Err(MergeError::UnresolvedCycle { modules: cyclic });
    }

    let central_leaf = graph
        .node_indices()
        .filter(|&node| graph.neighbors_directed(node, Direction::Incoming).count() == 1)
        .min_by_key(|&node| {
            (
                graph.neighbors_directed(node, Direction::Outgoing).count(),
                graph[node].clone(),
            )
        })
        .and_then(|node| modules.get(&graph[node]).map(|scan| scan.path.clone()));

    Ok(DiscoveryReport {
        entry_files,
        central_leaf,
        modules: modules.into_keys().collect(),
    })
}

#[derive(Debug)]
struct ModuleScan {
    path: PathBuf,
    imports: Vec<ImportedName>,
}

/// One top-level import, reduced to the parts needed for edge building.
#[derive(Debug)]
enum ImportedName {
    /// `import a.b` or `import a.b as c`.
    Module(String),
    /// `from a.b import c` (`module`, `name`); `from . import c` has an
    /// empty module.
    FromModule(String, String),
}

fn imported_names(stmts: &[Stmt]) -> Vec<ImportedName> {
    let mut imports = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::Import(import) => {
                for alias in &import.names {
                    imports.push(ImportedName::Module(alias.name.to_string()));
                }
            }
            Stmt::ImportFrom(import_from) => {
                let module = import_from
                    .module
                    .as_ref()
                    .map_or_else(String::new, ToString::to_string);
                for alias in &import_from.names {
                    imports.push(ImportedName::FromModule(
                        module.clone(),
                        alias.name.to_string(),
                    ));
                }
            }
            _ => {}
        }
    }
    imports
}

/// Match each import against the scanned module set, deduplicated.
fn resolve_imports(imports: &[ImportedName], known: &FxIndexSet<String>) -> FxIndexSet<String> {
    let mut resolved = FxIndexSet::default();
    for import in imports {
        match import {
            ImportedName::Module(module) => {
                if known.contains(module) {
                    resolved.insert(module.clone());
                } else {
                    let top = module.split('.').next().unwrap_or_default();
                    if known.contains(top) {
                        resolved.insert(top.to_owned());
                    }
                }
            }
            ImportedName::FromModule(module, name) => {
                if !module.is_empty() && known.contains(module) {
                    resolved.insert(module.clone());
                }
                let qualified = if module.is_empty() {
                    name.clone()
                } else {
                    format!("{module}.{name}")
                };
                if known.contains(&qualified) {
                    resolved.insert(qualified);
                }
            }
        }
    }
    resolved
}

/// Detect a top-level `if __name__ == "__main__":` in either operand
/// order.
fn has_entry_marker(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| {
        let Stmt::If(if_stmt) = stmt else {
            return false;
        };
        is_main_check(&if_stmt.test)
    })
}

fn is_main_check(test: &Expr) -> bool {
    let Expr::Compare(compare) = test else {
        return false;
    };
    if !matches!(compare.ops.as_ref(), [CmpOp::Eq]) {
        return false;
    }
    let [comparator] = compare.comparators.as_ref() else {
        return false;
    };
    is_name_main_pair(&compare.left, comparator) || is_name_main_pair(comparator, &compare.left)
}

fn is_name_main_pair(name_side: &Expr, literal_side: &Expr) -> bool {
    matches!(name_side, Expr::Name(name) if name.id.as_str() == "__name__")
        && matches!(literal_side, Expr::StringLiteral(lit) if lit.value.to_str() == "__main__")
}

fn module_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    let file = parts.pop()?;
    let stem = file.strip_suffix(".py")?;
    if stem != "__init__" {
        parts.push(stem.to_owned());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "__pycache__"
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().expect("temp dir");
        for (name, code) in files {
            let path = temp.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create dirs");
            }
            fs::write(&path, code).expect("write file");
        }
        temp
    }

    #[test]
    fn entry_markers_are_detected_in_either_operand_order() {
        let temp = project(&[
            ("main.py", "if __name__ == \"__main__\":\n    run()\n"),
            ("alt.py", "if \"__main__\" == __name__:\n    run()\n"),
            ("lib.py", "def run():\n    pass\n"),
        ]);
        let report = discover_entry_points(temp.path()).expect("scan succeeds");
        let names: Vec<_> = report
            .entry_files
            .iter()
            .filter_map(|path| path.file_name())
            .collect();
        assert_eq!(names, vec!["alt.py", "main.py"]);
    }

    #[test]
    fn central_leaf_has_minimum_out_degree_among_single_importers() {
        let temp = project(&[
            ("app.py", "import helpers\nimport util\n"),
            ("helpers.py", "import util\n"),
            ("util.py", "x = 1\n"),
        ]);
        let report = discover_entry_points(temp.path()).expect("scan succeeds");
        let central = report.central_leaf.expect("a central leaf exists");
        assert!(
            central.ends_with("helpers.py"),
            "only helpers has exactly one importer, got {}",
            central.display()
        );
    }

    #[test]
    fn central_leaf_ties_break_by_module_name() {
        let temp = project(&[
            ("root.py", "import alpha\nimport beta\n"),
            ("alpha.py", "x = 1\n"),
            ("beta.py", "y = 2\n"),
        ]);
        let report = discover_entry_points(temp.path()).expect("scan succeeds");
        let central = report.central_leaf.expect("a central leaf exists");
        assert!(central.ends_with("alpha.py"), "got {}", central.display());
    }

    #[test]
    fn cyclic_import_graphs_are_fatal() {
        let temp = project(&[
            ("a.py", "import b\n"),
            ("b.py", "import a\n"),
            ("solo.py", "x = 1\n"),
        ]);
        let err = discover_entry_points(temp.path()).expect_err("cycle must fail");
        match err {
            MergeError::UnresolvedCycle { mut modules } => {
                modules.sort();
                assert_eq!(modules, vec!["a", "b"]);
            }
            other => panic!("expected UnresolvedCycle, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_files_are_skipped() {
        let temp = project(&[
            ("main.py", "if __name__ == \"__main__\":\n    run()\n"),
            ("broken.py", "def broken(:\n"),
        ]);
        let report = discover_entry_points(temp.path()).expect("scan stays lenient");
        assert_eq!(report.entry_files.len(), 1);
        assert_eq!(report.modules, vec!["main"]);
    }

    #[test]
    fn package_init_files_take_the_package_name() {
        let temp = project(&[
            ("app.py", "from pkg import core\n"),
            ("pkg/__init__.py", ""),
            ("pkg/core.py", "x = 1\n"),
        ]);
        let report = discover_entry_points(temp.path()).expect("scan succeeds");
        assert!(report.modules.contains(&"pkg".to_owned()));
        assert!(report.modules.contains(&"pkg.core".to_owned()));
        let central = report.central_leaf.expect("a central leaf exists");
        assert!(
            central.ends_with("pkg/__init__.py"),
            "ties resolve to the shortest name first, got {}",
            central.display()
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let missing = temp.path().join("absent");
        assert!(discover_entry_points(&missing).is_err());
    }
}
