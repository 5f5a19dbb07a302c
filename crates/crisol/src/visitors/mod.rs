//! AST visitors: the per-pass analyses and rewrites.

pub mod attribute_usage;
pub mod dead_code;
pub mod import_individualizer;
