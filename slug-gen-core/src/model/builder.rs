use std::collections::HashMap;
use std::sync::Arc;

use super::leaf_list::{PhraseList, WordList};
use super::space::{Concatenation, Constant, Node, Product, Space};
use crate::config::{Config, RuleKind};
use crate::error::ConfigError;

/// Maximum length of the rule resolution stack.
pub const MAX_DEPTH: usize = 99;

/// A resolved rule, remembered so that every parent referencing the same
/// name shares one subtree.
#[derive(Clone, Debug)]
pub struct Built {
	node: Arc<Node>,
	/// Name of a cartesian rule somewhere in this subtree, if any.
	product: Option<String>,
}

/// Compiles a `Config` into a tree of `Node`s.
///
/// # Responsibilities
/// - Resolve rule names by recursive descent, building each rule once
/// - Detect cycles and excessive depth with an explicit resolution stack
/// - Reject a cartesian rule reachable from inside another cartesian rule
/// - Wrap single-word children of a concatenation that also holds
///   multi-word children, so the concatenation has one uniform shape
///
/// The memo of built rules can be carried between builders
/// (`into_memo` / `with_memo`), which lets auxiliary roots built later
/// share the subtrees of the default root.
pub struct TreeBuilder<'c> {
	config: &'c Config,
	memo: HashMap<String, Built>,
}

impl<'c> TreeBuilder<'c> {
	pub fn new(config: &'c Config) -> Self {
		Self::with_memo(config, HashMap::new())
	}

	pub fn with_memo(config: &'c Config, memo: HashMap<String, Built>) -> Self {
		Self { config, memo }
	}

	pub fn into_memo(self) -> HashMap<String, Built> {
		self.memo
	}

	/// Builds (or reuses) the space of rule `name`.
	///
	/// # Errors
	/// - the rule or one of its references is undefined
	/// - the rule is recursive
	/// - resolution goes deeper than `MAX_DEPTH`
	/// - a cartesian rule is nested inside another cartesian rule
	/// - a combination count does not fit in 128 bits
	pub fn build(&mut self, name: &str) -> Result<Arc<Node>, ConfigError> {
		let mut stack = Vec::new();
		Ok(self.resolve(name, &mut stack, None)?.node)
	}

	/// Validates rule `name` and computes its combination count without
	/// allocating any node.
	///
	/// Performs the same checks as `build`, so an auxiliary root that passes
	/// `check` can later be built lazily without structural errors.
	pub fn check(&self, name: &str) -> Result<u128, ConfigError> {
		let mut sizes = HashMap::new();
		let mut stack = Vec::new();
		Ok(self.measure(name, &mut stack, None, &mut sizes)?.0)
	}

	fn resolve(
		&mut self,
		current: &str,
		stack: &mut Vec<String>,
		inside_product: Option<&str>,
	) -> Result<Built, ConfigError> {
		if let Some(built) = self.memo.get(current) {
			nesting_guard(inside_product, built.product.as_deref())?;
			return Ok(built.clone());
		}
		let kind = self.enter(current, stack, inside_product)?;

		stack.push(current.to_owned());
		let result = self.resolve_kind(current, kind, stack, inside_product);
		stack.pop();

		let built = result?;
		self.memo.insert(current.to_owned(), built.clone());
		Ok(built)
	}

	fn resolve_kind(
		&mut self,
		current: &str,
		kind: &'c RuleKind,
		stack: &mut Vec<String>,
		inside_product: Option<&str>,
	) -> Result<Built, ConfigError> {
		let overflow = || ConfigError::new(current, "combination count is too large");
		let built = match kind {
			RuleKind::Words(words) => {
				let list = WordList::new(words.clone()).ok_or_else(|| ConfigError::new(current, "has invalid 'words'"))?;
				leaf(Node::Words(Arc::new(list)))
			}
			RuleKind::Phrases(phrases) => {
				let list =
					PhraseList::new(phrases.clone()).ok_or_else(|| ConfigError::new(current, "has invalid 'phrases'"))?;
				leaf(Node::Phrases(Arc::new(list)))
			}
			RuleKind::Const(value) => leaf(Node::Constant(Constant::new(value.as_str()))),
			RuleKind::Nested(lists) => {
				let mut children = Vec::with_capacity(lists.len());
				let mut product = None;
				for name in lists {
					let child = self.resolve(name, stack, inside_product)?;
					product = product.or(child.product);
					children.push(child.node);
				}
				Built { node: concatenate(children).ok_or_else(overflow)?, product }
			}
			RuleKind::Cartesian(lists) => {
				let mut children = Vec::with_capacity(lists.len());
				for name in lists {
					children.push(self.resolve(name, stack, Some(current))?.node);
				}
				let node = Product::new(children).ok_or_else(overflow)?;
				Built { node: Arc::new(Node::Product(node)), product: Some(current.to_owned()) }
			}
		};
		Ok(built)
	}

	fn measure(
		&self,
		current: &str,
		stack: &mut Vec<String>,
		inside_product: Option<&str>,
		sizes: &mut HashMap<String, (u128, Option<String>)>,
	) -> Result<(u128, Option<String>), ConfigError> {
		if let Some(built) = self.memo.get(current) {
			nesting_guard(inside_product, built.product.as_deref())?;
			return Ok((built.node.size(), built.product.clone()));
		}
		if let Some((size, product)) = sizes.get(current) {
			nesting_guard(inside_product, product.as_deref())?;
			return Ok((*size, product.clone()));
		}
		let kind = self.enter(current, stack, inside_product)?;

		stack.push(current.to_owned());
		let result = self.measure_kind(current, kind, stack, inside_product, sizes);
		stack.pop();

		let measured = result?;
		sizes.insert(current.to_owned(), measured.clone());
		Ok(measured)
	}

	fn measure_kind(
		&self,
		current: &str,
		kind: &'c RuleKind,
		stack: &mut Vec<String>,
		inside_product: Option<&str>,
		sizes: &mut HashMap<String, (u128, Option<String>)>,
	) -> Result<(u128, Option<String>), ConfigError> {
		let overflow = || ConfigError::new(current, "combination count is too large");
		let measured = match kind {
			RuleKind::Words(words) => (words.len() as u128, None),
			RuleKind::Phrases(phrases) => (phrases.len() as u128, None),
			RuleKind::Const(_) => (1, None),
			RuleKind::Nested(lists) => {
				let mut total = 0u128;
				let mut product = None;
				for name in lists {
					let (size, inner) = self.measure(name, stack, inside_product, sizes)?;
					total = total.checked_add(size).ok_or_else(overflow)?;
					product = product.or(inner);
				}
				(total, product)
			}
			RuleKind::Cartesian(lists) => {
				let mut total = 1u128;
				for name in lists {
					let (size, _) = self.measure(name, stack, Some(current), sizes)?;
					total = total.checked_mul(size).ok_or_else(overflow)?;
				}
				(total, Some(current.to_owned()))
			}
		};
		Ok(measured)
	}

	/// Guards run before a rule is resolved for the first time.
	fn enter(&self, current: &str, stack: &[String], inside_product: Option<&str>) -> Result<&'c RuleKind, ConfigError> {
		let origin = stack.first().map(String::as_str).unwrap_or(current);
		if stack.iter().any(|s| s == current) {
			let mut path: Vec<&str> = stack.iter().map(String::as_str).collect();
			path.push(current);
			return Err(ConfigError::new(origin, format!("Rule is recursive: {}", path.join(" -> "))));
		}
		if stack.len() > MAX_DEPTH {
			return Err(ConfigError::new(origin, format!("Rule is too deep (more than {MAX_DEPTH} levels)")));
		}
		let rule = self
			.config
			.rule(current)
			.ok_or_else(|| ConfigError::new(origin, format!("Rule '{current}' is referenced but not defined")))?;
		if let RuleKind::Cartesian(_) = rule.kind {
			nesting_guard(inside_product, Some(current))?;
		}
		Ok(&rule.kind)
	}
}

fn nesting_guard(outer: Option<&str>, inner: Option<&str>) -> Result<(), ConfigError> {
	match (outer, inner) {
		(Some(outer), Some(inner)) => Err(ConfigError::new(
			outer,
			format!("Cartesian list '{outer}' contains another Cartesian list '{inner}'. Nested Cartesian lists are not allowed."),
		)),
		_ => Ok(()),
	}
}

fn leaf(node: Node) -> Built {
	Built { node: Arc::new(node), product: None }
}

/// Builds a concatenation, degenerating to the child itself when there is
/// only one. Single-word children are wrapped in `AsPhrases` when any
/// sibling is multi-word.
fn concatenate(mut children: Vec<Arc<Node>>) -> Option<Arc<Node>> {
	if children.len() == 1 {
		return children.pop();
	}
	if children.iter().any(|c| c.is_multi_word()) {
		children = children
			.into_iter()
			.map(|c| if c.is_multi_word() { c } else { Arc::new(Node::AsPhrases(c)) })
			.collect();
	}
	Concatenation::new(children).map(|c| Arc::new(Node::Concatenation(c)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn config(value: serde_json::Value) -> Config {
		Config::from_json_value(value).unwrap()
	}

	#[test]
	fn builds_product_of_words() {
		let config = config(json!({
			"all": {"type": "cartesian", "lists": ["size", "color", "fruit"]},
			"size": {"type": "words", "words": ["small", "large"]},
			"color": {"type": "words", "words": ["green", "yellow"]},
			"fruit": {"type": "words", "words": ["apple", "banana"]}
		}));
		let node = TreeBuilder::new(&config).build("all").unwrap();
		assert_eq!(node.size(), 8);
		assert_eq!(node.at(0).unwrap(), vec!["small", "green", "apple"]);
		assert_eq!(node.at(7).unwrap(), vec!["large", "yellow", "banana"]);
	}

	#[test]
	fn shared_rules_are_built_once() {
		let config = config(json!({
			"all": {"type": "cartesian", "lists": ["number", "number"]},
			"number": {"type": "words", "words": ["0", "1", "2"]}
		}));
		let node = TreeBuilder::new(&config).build("all").unwrap();
		let Node::Product(product) = node.as_ref() else { panic!("expected a product") };
		assert!(Arc::ptr_eq(&product.children()[0], &product.children()[1]));
	}

	#[test]
	fn single_child_concatenation_degenerates() {
		let config = config(json!({
			"all": {"type": "nested", "lists": ["only"]},
			"only": {"type": "words", "words": ["one", "two"]}
		}));
		let node = TreeBuilder::new(&config).build("all").unwrap();
		assert!(matches!(node.as_ref(), Node::Words(_)));
	}

	#[test]
	fn mixed_concatenation_wraps_words() {
		let config = config(json!({
			"all": {"type": "nested", "lists": ["single", "double"]},
			"single": {"type": "words", "words": ["one", "two"]},
			"double": {"type": "phrases", "phrases": ["three four"]}
		}));
		let node = TreeBuilder::new(&config).build("all").unwrap();
		let Node::Concatenation(c) = node.as_ref() else { panic!("expected a concatenation") };
		assert!(node.is_multi_word());
		assert!(c.children().iter().any(|child| matches!(child.as_ref(), Node::AsPhrases(_))));
		assert_eq!(node.size(), 3);
	}

	#[test]
	fn recursive_rule_is_rejected() {
		let config = config(json!({
			"all": {"type": "nested", "lists": ["one"]},
			"one": {"type": "nested", "lists": ["all"]}
		}));
		let err = TreeBuilder::new(&config).build("all").unwrap_err();
		assert_eq!(err.rule(), "all");
		assert_eq!(err.reason(), "Rule is recursive: all -> one -> all");
		assert_eq!(TreeBuilder::new(&config).check("all").unwrap_err(), err);
	}

	fn chain(length: usize) -> Config {
		let mut rules = serde_json::Map::new();
		rules.insert("all".into(), json!({"type": "nested", "lists": ["list0"]}));
		for i in 0..length {
			rules.insert(format!("list{i}"), json!({"type": "nested", "lists": [format!("list{}", i + 1)]}));
		}
		rules.insert(format!("list{length}"), json!({"type": "words", "words": ["too", "deep"]}));
		config(serde_json::Value::Object(rules))
	}

	#[test]
	fn depth_is_bounded() {
		let config = chain(100);
		let err = TreeBuilder::new(&config).build("all").unwrap_err();
		assert_eq!(err.rule(), "all");
		assert!(err.reason().contains("too deep"));
		assert!(TreeBuilder::new(&config).check("all").is_err());

		let config = chain(50);
		assert_eq!(TreeBuilder::new(&config).build("all").unwrap().size(), 2);
	}

	#[test]
	fn cartesian_inside_cartesian_is_rejected() {
		let config = config(json!({
			"all": {"type": "cartesian", "lists": ["word_list", "cart_list"]},
			"word_list": {"type": "words", "words": ["word1", "word2"]},
			"cart_list": {"type": "cartesian", "lists": ["word_list", "word_list"]}
		}));
		let err = TreeBuilder::new(&config).build("all").unwrap_err();
		assert_eq!(err.rule(), "all");
		assert_eq!(
			err.reason(),
			"Cartesian list 'all' contains another Cartesian list 'cart_list'. Nested Cartesian lists are not allowed."
		);
	}

	#[test]
	fn cartesian_nesting_is_caught_through_memo_and_concatenation() {
		let config = config(json!({
			"all": {"type": "nested", "lists": ["pair", "outer"]},
			"outer": {"type": "cartesian", "lists": ["word", "mixed"]},
			"mixed": {"type": "nested", "lists": ["word", "pair"]},
			"pair": {"type": "cartesian", "lists": ["word", "word"]},
			"word": {"type": "words", "words": ["a", "b"]}
		}));
		let err = TreeBuilder::new(&config).build("all").unwrap_err();
		assert!(err.reason().contains("Nested Cartesian lists are not allowed"));
		assert!(TreeBuilder::new(&config).check("outer").is_err());
	}

	#[test]
	fn check_matches_build_size() {
		let config = config(json!({
			"all": {"type": "nested", "lists": ["2", "3"]},
			"2": {"type": "cartesian", "lists": ["w", "w"]},
			"3": {"type": "cartesian", "lists": ["w", "of", "w"]},
			"of": {"type": "const", "value": "of"},
			"w": {"type": "words", "words": ["a", "b", "c"]}
		}));
		let builder = TreeBuilder::new(&config);
		assert_eq!(builder.check("all").unwrap(), 18);
		assert_eq!(builder.check("3").unwrap(), 9);
	}
}
