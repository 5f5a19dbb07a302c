//! Shared type definitions for the crisol crate.

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Insertion-ordered map with the fast FxHasher. Iteration order is
/// deterministic, which keeps rendered output reproducible.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered set with the fast FxHasher.
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Classification of an imported module based on its origin.
///
/// Drives import grouping in the formatter: groups are emitted in the
/// order of this enum's discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportGroup {
    /// `from __future__ import ...`, which Python requires to come first
    Future,

    /// Python standard library modules (e.g. os, sys, json)
    StandardLibrary,

    /// Third-party packages (anything not resolvable under the project roots)
    ThirdParty,

    /// Locally-authored modules that are part of the project being merged
    FirstParty,
}
