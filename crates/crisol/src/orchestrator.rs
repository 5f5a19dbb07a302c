//! The merge driver: iterates the transformation pipeline to a fixed
//! point and finalizes the output.
//!
//! One pass runs usage analysis, import individualization, import
//! formatting, dead code elimination, and a single inlining step, in
//! that order. Usage data is recomputed every pass because each pass
//! reshapes the document. The loop ends when an inlining step changes
//! nothing; the statement orderer then runs once over the converged
//! document.
//!
//! The orderer doubles as the completeness check for dropped repeated
//! imports. Inlining each module at most once means a second import of
//! an already inlined module is deleted without prepending anything;
//! when the final document still orders cleanly the drop was harmless,
//! and when ordering fails after such drops the mutual imports could
//! not be flattened and the merge fails with the modules involved.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;
use crate::document::Document;
use crate::error::MergeError;
use crate::format::{collect_import_groups, GroupingFormatter, ImportFormatter};
use crate::inline::inline_next_module;
use crate::order::{DefinitionOrderer, StatementOrderer};
use crate::resolver::ModuleResolver;
use crate::types::FxIndexSet;
use crate::visitors::attribute_usage::UsageMap;
use crate::visitors::dead_code::DeadCodeTransformer;
use crate::visitors::import_individualizer::{collect_bindings, individualize};

/// File name for merged output when no explicit destination is given.
pub const DEFAULT_OUTPUT_NAME: &str = "output.py";

/// Drives a whole conversion. Collaborators are swappable; the defaults
/// are the bundled formatter and orderer.
pub struct MergeDriver {
    config: Config,
    formatter: Box<dyn ImportFormatter>,
    orderer: Box<dyn StatementOrderer>,
}

impl MergeDriver {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            formatter: Box::new(GroupingFormatter),
            orderer: Box::new(DefinitionOrderer),
        }
    }

    pub fn with_formatter(mut self, formatter: Box<dyn ImportFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_orderer(mut self, orderer: Box<dyn StatementOrderer>) -> Self {
        self.orderer = orderer;
        self
    }

    /// Merge the program rooted at `entry` into a single source text.
    pub fn merge(&self, entry: &Path) -> Result<String, MergeError> {
        let source = fs::read_to_string(entry)?;
        let mut document = Document::parse(&source, entry)?;
        let mut resolver = ModuleResolver::new(self.config.clone(), entry);
        let mut processed: FxIndexSet<String> = FxIndexSet::default();
        let mut repeats: Vec<String> = Vec::new();

        let mut passes = 0usize;
        loop {
            passes += 1;
            if passes > self.config.max_passes {
                return Err(MergeError::PassLimit {
                    limit: self.config.max_passes,
                });
            }
            debug!("pass {passes}: {} top-level statements", document.len());

            let bindings = collect_bindings(&document);
            let tracked: FxIndexSet<String> = bindings
                .iter()
                .map(|binding| binding.local_name.clone())
                .collect();
            let usage = UsageMap::collect(document.stmts(), &tracked);
            let individualized = individualize(&mut document, &usage);
            if individualized > 0 {
                debug!("individualized {individualized} aggregate imports");
            }

            let groups = collect_import_groups(&document, &mut resolver);
            document = self.formatter.format(document, &groups);

            let stats = DeadCodeTransformer::new(self.config.noop_function.clone())
                .transform_document(&mut document);
            if stats.removed_statements > 0 || stats.stripped_annotations > 0 {
                debug!(
                    "removed {} dead statements, stripped {} annotations",
                    stats.removed_statements, stats.stripped_annotations
                );
            }

            let outcome =
                inline_next_module(&mut document, &mut resolver, &mut processed, &mut repeats)?;
            if !outcome.changed {
                break;
            }
        }
        info!(
            "converged after {passes} passes, {} modules inlined",
            processed.len()
        );

        let document = match self.orderer.order(document) {
            Ok(ordered) => ordered,
            Err(err) if repeats.is_empty() => return Err(MergeError::Ordering(err)),
            Err(err) => {
                debug!("ordering failed after dropped repeated imports: {err}");
                let modules: FxIndexSet<String> = repeats.iter().cloned().collect();
                return Err(MergeError::UnresolvedCycle {
                    modules: modules.into_iter().collect(),
                });
            }
        };
        Ok(document.render())
    }
}

/// Merge the program rooted at `entry` and return the flattened source.
pub fn merge_entry(entry: &Path, config: Config) -> Result<String, MergeError> {
    MergeDriver::new(config).merge(entry)
}

/// Merge the program rooted at `entry` and write the result. Without an
/// explicit `output` path the file lands at `<project-root>/output.py`.
/// Nothing is written when the merge fails.
pub fn convert_project_to_single_file(
    entry: &Path,
    output: Option<&Path>,
    config: Config,
) -> Result<PathBuf, MergeError> {
    let merged = MergeDriver::new(config.clone()).merge(entry)?;
    let destination = match output {
        Some(path) => path.to_path_buf(),
        None => ModuleResolver::new(config, entry)
            .project_root()
            .join(DEFAULT_OUTPUT_NAME),
    };
    fs::write(&destination, merged)?;
    info!("wrote merged program to {}", destination.display());
    Ok(destination)
}
