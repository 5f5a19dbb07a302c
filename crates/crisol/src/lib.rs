//! Crisol merges a multi-module Python program into a single
//! self-contained file.
//!
//! Imports of locally authored modules are resolved by inlining the
//! module's source. Attribute access through aggregate imports is
//! rewritten to direct name references, statements with no observable
//! effect are dropped, and the merged program is reordered so every
//! top-level definition precedes its first use.

pub mod ast_builder;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod format;
pub mod inline;
pub mod orchestrator;
pub mod order;
pub mod resolver;
pub mod types;
pub mod visitors;

pub use config::Config;
pub use discovery::{discover_entry_points, DiscoveryReport};
pub use document::Document;
pub use error::MergeError;
pub use orchestrator::{convert_project_to_single_file, merge_entry, MergeDriver};
