//! Combinatorial slug spaces and the generator built on top of them.
//!
//! This module provides:
//! - Leaf word and phrase lists (`WordList`, `PhraseList`)
//! - Composite spaces indexed by position (`Concatenation`, `Product`)
//! - Compilation of a configuration into a tree (`TreeBuilder`)
//! - Tree simplification (`squash`)
//! - Output constraints and their feasibility check (`Constraints`)
//! - The high-level generation interface (`Generator`)

/// Immutable word and phrase lists, the leaves of every tree.
pub mod leaf_list;

/// The `Space` trait and the tree node types.
///
/// Every node maps an index in `[0, size)` to one word sequence.
pub mod space;

/// Compiles configuration rules into shared subtrees, checking cycles,
/// depth and cartesian nesting.
pub mod builder;

/// Merges homogeneous concatenations into deduplicated lists.
pub mod squash;

/// Uniqueness and length constraints on generated slugs.
pub mod constraints;

/// High-level interface: root selection, rejection sampling and
/// lazily built auxiliary roots.
pub mod generator;
