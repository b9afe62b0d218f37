//! Random slug generation from combinatorial word lists.
//!
//! This crate turns a configuration of word lists, phrase lists, constants,
//! unions and cartesian products into a tree where every index selects one
//! word sequence, then samples that tree uniformly:
//! - Configuration parsing and validation (`config`)
//! - Loading from JSON files or directories of text lists (`io`)
//! - Tree construction, simplification and sampling (`model`)
//! - Pluggable random index sources (`random`)
//!
//! ```no_run
//! use slug_gen_core::{Generator, Root, load_config};
//!
//! let generator = Generator::new(load_config("./data")?)?;
//! println!("{}", generator.generate_slug(&Root::Default)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Configuration records and their validation.
pub mod config;

/// Error types for configuration, loading and generation.
pub mod error;

/// Configuration loading from disk.
pub mod io;

/// Slug spaces and the generator.
pub mod model;

/// Random index sources.
pub mod random;

pub use config::{Config, RuleDef};
pub use error::{ConfigError, GenerateError, LoadError};
pub use io::load_config;
pub use model::constraints::Constraints;
pub use model::generator::{Generator, Root};
pub use random::{FixedSource, IndexSource, SharedSource, StdRngSource};
