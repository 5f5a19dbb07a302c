//! Module resolution: mapping dotted import paths to files on disk and
//! classifying imports by origin.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use ruff_python_stdlib::sys::is_known_standard_library;

use crate::config::Config;
use crate::types::{FxIndexMap, ImportGroup};

/// Resolves dotted module paths against the project roots and classifies
/// imports for grouping. Resolution results are cached per conversion.
#[derive(Debug)]
pub struct ModuleResolver {
    config: Config,
    project_root: PathBuf,
    module_cache: FxIndexMap<String, Option<PathBuf>>,
    classification_cache: FxIndexMap<String, ImportGroup>,
}

impl ModuleResolver {
    /// Build a resolver for the project containing `entry`.
    ///
    /// The project root is the entry file's directory; when that directory
    /// is itself a package (it contains `__init__.py`), the root is one
    /// level up so sibling packages resolve.
    pub fn new(config: Config, entry: &Path) -> Self {
        let entry = canonicalize_lenient(entry);
        let mut project_root = entry
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        if project_root.join("__init__.py").is_file() {
            if let Some(parent) = project_root.parent() {
                debug!(
                    "entry lives in a package; using {} as project root",
                    parent.display()
                );
                project_root = parent.to_path_buf();
            }
        }
        Self {
            config,
            project_root,
            module_cache: FxIndexMap::default(),
            classification_cache: FxIndexMap::default(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Directories searched for first-party modules: the project root plus
    /// any configured `src` entries (relative ones are anchored at the
    /// root).
    pub fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.project_root.clone()];
        for dir in &self.config.src {
            let root = if dir.is_absolute() {
                dir.clone()
            } else {
                self.project_root.join(dir)
            };
            roots.push(root);
        }
        roots
    }

    /// Resolve a dotted module path to its source file, if the module is
    /// locally authored. `a.b.c` resolves to `<root>/a/b/c.py`.
    pub fn resolve_module_path(&mut self, module: &str) -> Option<PathBuf> {
        if let Some(cached) = self.module_cache.get(module) {
            return cached.clone();
        }
        let relative: PathBuf = module.split('.').collect();
        let relative = relative.with_extension("py");
        let mut found = None;
        for root in self.search_roots() {
            let candidate = root.join(&relative);
            if candidate.is_file() {
                debug!("resolved module '{module}' to {}", candidate.display());
                found = Some(candidate);
                break;
            }
        }
        if found.is_none() {
            debug!("module '{module}' does not resolve under the project roots");
        }
        self.module_cache.insert(module.to_owned(), found.clone());
        found
    }

    /// Classify an imported module for grouping purposes.
    pub fn classify_import(&mut self, module: &str) -> ImportGroup {
        if let Some(cached) = self.classification_cache.get(module) {
            return *cached;
        }
        let group = self.classify_uncached(module);
        self.classification_cache.insert(module.to_owned(), group);
        group
    }

    fn classify_uncached(&mut self, module: &str) -> ImportGroup {
        let top_level = module.split('.').next().unwrap_or(module);
        if top_level == "__future__" {
            return ImportGroup::Future;
        }
        if is_known_standard_library(self.config.python_version, top_level) {
            return ImportGroup::StandardLibrary;
        }
        if self.resolve_module_path(module).is_some() {
            return ImportGroup::FirstParty;
        }
        ImportGroup::ThirdParty
    }
}

fn canonicalize_lenient(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(err) => {
            warn!("could not canonicalize {}: {err}", path.display());
            path.to_path_buf()
        }
    }
}
