use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use super::builder::{Built, TreeBuilder};
use super::constraints::{Constraints, SLUG_SEPARATOR};
use super::space::{Node, Space};
use super::squash::{SquashCache, squash};
use crate::config::{Config, DEFAULT_ROOT, is_numeric};
use crate::error::{ConfigError, GenerateError};
use crate::random::SharedSource;

/// Entry point of a generator.
///
/// # Variants
/// - `Default`: the `all` rule, the only root that is squashed
/// - `Words(n)`: an all-digit rule such as `"2"` (conventionally
///   "exactly `n` words"); `"02"` addresses the same root
/// - `Named(name)`: a rule marked with `generator: true`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Root {
	#[default]
	Default,
	Words(usize),
	Named(String),
}

impl Root {
	/// Parses a root from a rule name: `""` and `"all"` are the default root,
	/// all-digit names are `Words`.
	pub fn parse(name: &str) -> Self {
		if name.is_empty() || name == DEFAULT_ROOT {
			return Root::Default;
		}
		match name.parse::<usize>() {
			Ok(n) if name.bytes().all(|b| b.is_ascii_digit()) => Root::Words(n),
			_ => Root::Named(name.to_owned()),
		}
	}

	/// Name of the configuration rule bound to this root.
	pub fn rule_name(&self) -> String {
		match self {
			Root::Default => DEFAULT_ROOT.to_owned(),
			Root::Words(n) => n.to_string(),
			Root::Named(name) => name.clone(),
		}
	}
}

impl From<usize> for Root {
	fn from(n: usize) -> Self {
		Root::Words(n)
	}
}

impl From<&str> for Root {
	fn from(name: &str) -> Self {
		Root::parse(name)
	}
}

impl fmt::Display for Root {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.rule_name())
	}
}

/// Auxiliary roots, built on first use.
#[derive(Default)]
struct LazyRoots {
	/// Builder memo, seeded with the unsquashed default tree so auxiliary
	/// roots share its subtrees.
	memo: HashMap<String, Built>,
	roots: HashMap<String, Arc<Node>>,
}

/// Constrained random slug generator.
///
/// # Responsibilities
/// - Compile the configuration into a combinatorial tree once
/// - Squash the default root; build auxiliary roots lazily
/// - Refuse constraints that sampling shows to be unsatisfiable
/// - Draw random combinations and reject those violating the constraints
///
/// A `Generator` is `Send + Sync`: the trees are immutable, auxiliary root
/// construction is serialized by a mutex and the index source serializes
/// its own access.
///
/// # Notes
/// The rejection loop has no attempt limit. The construction-time
/// feasibility check rules out configurations where (almost) nothing is
/// accepted; what remains is accepted as a latency risk.
pub struct Generator {
	config: Config,
	default: Arc<Node>,
	/// Auxiliary root rule name -> combination count, computed at construction.
	auxiliary: BTreeMap<String, u128>,
	/// Word count -> rule name of the all-digit roots.
	numbered: BTreeMap<usize, String>,
	lazy: Mutex<LazyRoots>,
	source: SharedSource,
}

impl Generator {
	/// Builds a generator drawing from the process-wide source.
	///
	/// # Errors
	/// Any structural problem of the configuration, or a constraint that
	/// can't be satisfied.
	pub fn new(config: Config) -> Result<Self, ConfigError> {
		Self::with_source(config, SharedSource::global())
	}

	/// Builds a generator drawing from `source`.
	///
	/// # Behavior
	/// - Builds the default root and checks every auxiliary root
	///   (cycles, depth, nesting, size) without building it.
	/// - Squashes the default root.
	/// - Runs the feasibility check of the configured constraints
	///   against the squashed default root.
	pub fn with_source(config: Config, source: SharedSource) -> Result<Self, ConfigError> {
		let mut builder = TreeBuilder::new(&config);
		let raw = builder.build(DEFAULT_ROOT)?;

		let mut auxiliary = BTreeMap::new();
		let mut numbered = BTreeMap::new();
		for name in config.auxiliary_roots() {
			auxiliary.insert(name.to_owned(), builder.check(name)?);
			if let (true, Ok(n)) = (is_numeric(name), name.parse::<usize>()) {
				numbered.insert(n, name.to_owned());
			}
		}

		let mut cache = SquashCache::new();
		let default = squash(&raw, &mut cache);
		config.constraints().check_feasibility(DEFAULT_ROOT, default.as_ref())?;

		debug!(
			"Generator ready: {} combinations, {} auxiliary roots, {} shared lists",
			default.size(),
			auxiliary.len(),
			cache.len()
		);

		let lazy = LazyRoots { memo: builder.into_memo(), roots: HashMap::new() };
		Ok(Self { config, default, auxiliary, numbered, lazy: Mutex::new(lazy), source })
	}

	/// Replaces the index source of this generator only.
	pub fn set_source(&mut self, source: SharedSource) {
		self.source = source;
	}

	pub fn source(&self) -> &SharedSource {
		&self.source
	}

	/// Re-seeds the index source from system entropy.
	///
	/// Call this if you are getting too many already known values in a row.
	///
	/// # Notes
	/// With the default source this has a process-wide effect: every
	/// generator sharing the global source is re-seeded.
	pub fn randomize(&self) {
		self.source.reseed();
	}

	pub fn constraints(&self) -> &Constraints {
		self.config.constraints()
	}

	/// Rule names of every root, default root first.
	pub fn root_names(&self) -> Vec<String> {
		std::iter::once(DEFAULT_ROOT.to_owned()).chain(self.auxiliary.keys().cloned()).collect()
	}

	/// Generates a random word sequence satisfying the configured constraints.
	///
	/// # Errors
	/// `GenerateError::UnknownRoot` if `root` is not defined.
	pub fn generate(&self, root: &Root) -> Result<Vec<String>, GenerateError> {
		let space = self.space(root)?;
		let constraints = self.config.constraints();
		loop {
			let index = self.source.next_index(space.size());
			let Some(sample) = space.sample(index) else {
				continue;
			};
			if constraints.accepts(&sample) {
				return Ok(sample.into_words().into_iter().map(str::to_owned).collect());
			}
		}
	}

	/// Generates a random slug: the words of `generate` joined with `-`.
	pub fn generate_slug(&self, root: &Root) -> Result<String, GenerateError> {
		let words = self.generate(root)?;
		Ok(words.join(SLUG_SEPARATOR.to_string().as_str()))
	}

	/// Total number of combinations reachable from `root`.
	///
	/// Auxiliary roots report their count without being built.
	pub fn combination_count(&self, root: &Root) -> Result<u128, GenerateError> {
		if *root == Root::Default {
			return Ok(self.default.size());
		}
		let name = self.auxiliary_rule(root)?;
		self.auxiliary.get(name).copied().ok_or_else(|| GenerateError::UnknownRoot(name.to_owned()))
	}

	/// Writes the tree of `root`, one node per line.
	pub fn dump(&self, root: &Root) -> Result<String, GenerateError> {
		Ok(self.space(root)?.tree().to_string())
	}

	/// Rule name bound to an auxiliary `root`.
	fn auxiliary_rule(&self, root: &Root) -> Result<&str, GenerateError> {
		let found = match root {
			Root::Words(n) => self.numbered.get(n).map(String::as_str),
			other => self.auxiliary.get_key_value(other.rule_name().as_str()).map(|(name, _)| name.as_str()),
		};
		found.ok_or_else(|| GenerateError::UnknownRoot(root.rule_name()))
	}

	fn space(&self, root: &Root) -> Result<Arc<Node>, GenerateError> {
		if *root == Root::Default {
			return Ok(self.default.clone());
		}
		let name = self.auxiliary_rule(root)?.to_owned();

		let mut lazy = self.lazy.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(space) = lazy.roots.get(&name) {
			return Ok(space.clone());
		}
		let mut builder = TreeBuilder::with_memo(&self.config, std::mem::take(&mut lazy.memo));
		let built = builder.build(&name);
		lazy.memo = builder.into_memo();
		let space = built?;
		debug!("Built generator root '{name}': {} combinations", space.size());
		lazy.roots.insert(name, space.clone());
		Ok(space)
	}
}

impl fmt::Debug for Generator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Generator")
			.field("combinations", &self.default.size())
			.field("auxiliary", &self.auxiliary)
			.field("constraints", self.config.constraints())
			.field("source", &self.source)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::random::FixedSource;
	use serde_json::json;

	fn fixed(config: serde_json::Value, values: impl IntoIterator<Item = u128>) -> Generator {
		let config = Config::from_json_value(config).unwrap();
		Generator::with_source(config, SharedSource::new(FixedSource::new(values))).unwrap()
	}

	#[test]
	fn root_parsing() {
		assert_eq!(Root::parse("all"), Root::Default);
		assert_eq!(Root::parse(""), Root::Default);
		assert_eq!(Root::parse("3"), Root::Words(3));
		assert_eq!(Root::parse("+3"), Root::Named("+3".to_owned()));
		assert_eq!(Root::parse("short"), Root::Named("short".to_owned()));
		assert_eq!(Root::Words(2).to_string(), "2");
	}

	#[test]
	fn fixed_index_selects_combination() {
		let generator = fixed(
			json!({
				"all": {"type": "cartesian", "lists": ["size", "color", "fruit"]},
				"justcolor": {"generator": true, "type": "cartesian", "lists": ["color", "fruit"]},
				"size": {"type": "words", "words": ["small", "large"]},
				"color": {"type": "words", "words": ["green", "yellow"]},
				"fruit": {"type": "words", "words": ["apple", "banana"]}
			}),
			[0],
		);
		assert_eq!(generator.generate_slug(&Root::Default).unwrap(), "small-green-apple");
		assert_eq!(generator.generate_slug(&"justcolor".into()).unwrap(), "green-apple");
		assert_eq!(generator.combination_count(&Root::Default).unwrap(), 8);
		assert_eq!(generator.combination_count(&"justcolor".into()).unwrap(), 4);
		assert_eq!(generator.root_names(), vec!["all", "justcolor"]);
	}

	#[test]
	fn zero_padded_digit_roots_are_addressable() {
		let generator = fixed(
			json!({
				"all": {"type": "words", "words": ["one"]},
				"02": {"type": "words", "words": ["a", "b"]}
			}),
			[1],
		);
		assert_eq!(generator.root_names(), vec!["all", "02"]);
		for name in generator.root_names() {
			assert!(generator.combination_count(&Root::parse(&name)).is_ok(), "{name}");
		}
		assert_eq!(generator.combination_count(&Root::parse("02")).unwrap(), 2);
		assert_eq!(generator.generate_slug(&Root::Words(2)).unwrap(), "b");
		assert!(generator.dump(&Root::Named("02".to_owned())).unwrap().starts_with("WordList"));
	}

	#[test]
	fn rejection_skips_repeated_words() {
		let generator = fixed(
			json!({
				"all": {"type": "cartesian", "lists": ["adjective", "of", "noun"], "ensure_unique": true},
				"adjective": {"type": "words", "words": ["one", "two"]},
				"of": {"type": "const", "value": "of"},
				"noun": {"type": "words", "words": ["one", "two"]}
			}),
			[0, 1, 2, 3],
		);
		assert_eq!(generator.generate_slug(&Root::Default).unwrap(), "one-of-two");
		assert_eq!(generator.generate_slug(&Root::Default).unwrap(), "two-of-one");
		assert_eq!(generator.generate_slug(&Root::Default).unwrap(), "one-of-two");
	}

	#[test]
	fn unknown_root_is_reported() {
		let generator = fixed(json!({"all": {"type": "words", "words": ["one"]}}), [0]);
		assert_eq!(generator.generate(&Root::Words(5)), Err(GenerateError::UnknownRoot("5".to_owned())));
		assert!(generator.combination_count(&"nope".into()).is_err());
	}

	#[test]
	fn auxiliary_roots_are_built_once_and_not_squashed() {
		let generator = fixed(
			json!({
				"all": {"type": "nested", "lists": ["2", "3"]},
				"2": {"type": "cartesian", "lists": ["w", "w"]},
				"3": {"type": "cartesian", "lists": ["w", "w", "w"]},
				"w": {"type": "nested", "lists": ["a", "b"]},
				"a": {"type": "words", "words": ["x"]},
				"b": {"type": "words", "words": ["y"]}
			}),
			[0],
		);
		let first = generator.space(&Root::Words(2)).unwrap();
		let second = generator.space(&Root::Words(2)).unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert!(generator.dump(&Root::Words(2)).unwrap().contains("Concatenation(2, len=2)"));
		assert!(!generator.dump(&Root::Default).unwrap().contains("Concatenation(2, len=2)"));
		assert_eq!(generator.combination_count(&Root::Default).unwrap(), 12);
	}

	#[test]
	fn dump_of_single_list() {
		let generator = fixed(json!({"all": {"type": "words", "words": ["one", "two", "three"]}}), [0]);
		assert_eq!(generator.dump(&Root::Default).unwrap(), "WordList(['one', 'two', 'three'], len=3)\n");
	}

	#[test]
	fn generator_is_send_and_sync() {
		fn assert_send_sync<T: Send + Sync>() {}
		assert_send_sync::<Generator>();
	}
}
