//! Error taxonomy for the merge engine.
//!
//! Every variant is fatal: a conversion either produces a complete merged
//! file or no output at all.

use std::path::PathBuf;

use thiserror::Error;

use crate::order::OrderError;

#[derive(Debug, Error)]
pub enum MergeError {
    /// Source text is not syntactically valid Python.
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ruff_python_parser::ParseError,
    },

    /// An import names a module under the project root, but the module
    /// file does not exist or cannot be read.
    #[error("module '{module}' resolves under the project root but {} is missing", path.display())]
    MissingModule { module: String, path: PathBuf },

    /// An already-inlined module was imported again and the merged result
    /// could not be ordered, so the duplicate guard alone did not preserve
    /// completeness.
    #[error("unresolvable cyclic imports involving: {}", modules.join(", "))]
    UnresolvedCycle { modules: Vec<String> },

    /// The statement orderer could not produce a definition-before-use
    /// permutation of the merged top-level statements.
    #[error("cannot order top-level statements")]
    Ordering(#[from] OrderError),

    /// The merge loop ran past its iteration cap without converging.
    #[error("merge did not converge within {limit} passes")]
    PassLimit { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MergeError {
    /// Parse failure for the given file.
    pub fn parse(path: impl Into<PathBuf>, source: ruff_python_parser::ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
