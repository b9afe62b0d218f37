//! Declarative rule configuration.
//!
//! A configuration maps rule names to rule definitions. It arrives in two
//! shapes:
//! - `RuleDef`: the raw, serde-friendly record (every field optional), as
//!   found in `config.json` or produced by the word list loader
//! - `Config`: the validated form consumed by the tree builder
//!
//! `Config::from_rules` is the only way from the first to the second.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LoadError};
use crate::model::constraints::Constraints;

/// Name of the rule bound to the default generator root.
pub const DEFAULT_ROOT: &str = "all";

/// Only the first few undefined rule names are listed in errors.
const MAX_REPORTED_UNDEFINED: usize = 10;

/// A phrase as written in a configuration: either one string of
/// whitespace-separated words or an explicit list of words.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum PhraseDef {
	Text(String),
	Words(Vec<String>),
}

impl PhraseDef {
	fn into_words(self) -> Vec<String> {
		match self {
			PhraseDef::Text(text) => text.split_whitespace().map(str::to_owned).collect(),
			PhraseDef::Words(words) => words,
		}
	}
}

/// Raw rule record, one per configuration key.
///
/// The `type` discriminator selects which of the other fields are meaningful.
/// Root-only fields (`ensure_unique`, `ensure_unique_prefix`,
/// `max_slug_length`) are read from the default root rule and ignored
/// elsewhere.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RuleDef {
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub words: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phrases: Option<Vec<PhraseDef>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lists: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_length: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub number_of_words: Option<usize>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub generator: bool,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub ensure_unique: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ensure_unique_prefix: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_slug_length: Option<i64>,
}

/// Validated rule body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleKind {
	/// Flat list of single words.
	Words(Vec<String>),
	/// Flat list of phrases, each a non-empty tuple of words.
	Phrases(Vec<Vec<String>>),
	/// One fixed word.
	Const(String),
	/// Concatenation of the named rules.
	Nested(Vec<String>),
	/// Cartesian product of the named rules.
	Cartesian(Vec<String>),
}

impl RuleKind {
	/// Names of the rules this rule refers to.
	pub fn references(&self) -> &[String] {
		match self {
			RuleKind::Nested(lists) | RuleKind::Cartesian(lists) => lists,
			_ => &[],
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
	pub kind: RuleKind,
	/// Marked as an independently addressable generator root.
	pub generator: bool,
}

/// Validated configuration.
///
/// # Invariants
/// - a rule named `all` exists
/// - every referenced rule name is defined
/// - every leaf collection is non-empty and satisfies its length options
#[derive(Clone, Debug)]
pub struct Config {
	rules: BTreeMap<String, Rule>,
	constraints: Constraints,
}

impl Config {
	/// Validates raw rule records.
	///
	/// # Errors
	/// Returns a `ConfigError` naming the first offending rule.
	pub fn from_rules(raw: BTreeMap<String, RuleDef>) -> Result<Self, ConfigError> {
		let mut rules = BTreeMap::new();
		let mut constraints = Constraints::default();
		for (name, def) in raw {
			if name == DEFAULT_ROOT {
				constraints = root_constraints(&name, &def)?;
			}
			let rule = validate_rule(&name, def)?;
			rules.insert(name, rule);
		}

		if !rules.contains_key(DEFAULT_ROOT) {
			return Err(ConfigError::new(DEFAULT_ROOT, "default generator rule is not defined"));
		}
		check_references(&rules)?;
		check_numbered_roots(&rules)?;

		Ok(Self { rules, constraints })
	}

	/// Parses and validates a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
		let raw: BTreeMap<String, RuleDef> =
			serde_json::from_str(json).map_err(|source| LoadError::Json { path: None, source })?;
		Ok(Self::from_rules(raw)?)
	}

	/// Same as `from_json_str`, from an already parsed JSON value.
	pub fn from_json_value(value: serde_json::Value) -> Result<Self, LoadError> {
		let raw: BTreeMap<String, RuleDef> =
			serde_json::from_value(value).map_err(|source| LoadError::Json { path: None, source })?;
		Ok(Self::from_rules(raw)?)
	}

	pub fn rule(&self, name: &str) -> Option<&Rule> {
		self.rules.get(name)
	}

	pub fn rules(&self) -> impl Iterator<Item = (&str, &Rule)> {
		self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
	}

	/// Constraints declared on the default root rule.
	pub fn constraints(&self) -> &Constraints {
		&self.constraints
	}

	/// Names of auxiliary generator roots: all-digit rule names and rules
	/// marked with `generator: true`.
	pub fn auxiliary_roots(&self) -> impl Iterator<Item = &str> {
		self.rules
			.iter()
			.filter(|(name, rule)| name.as_str() != DEFAULT_ROOT && (is_numeric(name) || rule.generator))
			.map(|(name, _)| name.as_str())
	}
}

/// Whether `name` consists only of ASCII digits.
pub fn is_numeric(name: &str) -> bool {
	!name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

fn root_constraints(name: &str, def: &RuleDef) -> Result<Constraints, ConfigError> {
	let positive = |field: &str, value: Option<i64>| -> Result<Option<usize>, ConfigError> {
		match value {
			None => Ok(None),
			Some(v) if v > 0 => usize::try_from(v)
				.map(Some)
				.map_err(|_| ConfigError::new(name, format!("'{field}' is too large"))),
			Some(v) => Err(ConfigError::new(name, format!("'{field}' must be a positive integer, got {v}"))),
		}
	};
	Ok(Constraints {
		ensure_unique: def.ensure_unique,
		unique_prefix: positive("ensure_unique_prefix", def.ensure_unique_prefix)?,
		max_slug_length: positive("max_slug_length", def.max_slug_length)?,
	})
}

fn validate_rule(name: &str, def: RuleDef) -> Result<Rule, ConfigError> {
	let missing = |field: &str| ConfigError::new(name, format!("has no '{field}'"));
	let invalid = |field: &str| ConfigError::new(name, format!("has invalid '{field}'"));

	let kind_name = def.kind.as_deref().ok_or_else(|| missing("type"))?;
	let kind = match kind_name {
		"words" => {
			let words = def.words.ok_or_else(|| missing("words"))?;
			if words.is_empty() || words.iter().any(|w| w.trim().is_empty()) {
				return Err(invalid("words"));
			}
			if let Some(max) = def.max_length {
				if let Some(word) = words.iter().find(|w| w.chars().count() > max) {
					return Err(ConfigError::new(name, format!("Word is too long: '{word}' (max_length={max})")));
				}
			}
			RuleKind::Words(words)
		}
		"phrases" => {
			let phrases: Vec<Vec<String>> = def
				.phrases
				.ok_or_else(|| missing("phrases"))?
				.into_iter()
				.map(PhraseDef::into_words)
				.collect();
			if phrases.is_empty() || phrases.iter().any(|p| p.is_empty() || p.iter().any(|w| w.is_empty())) {
				return Err(invalid("phrases"));
			}
			for phrase in &phrases {
				check_phrase(name, phrase, def.max_length, def.number_of_words)?;
			}
			RuleKind::Phrases(phrases)
		}
		"const" => RuleKind::Const(def.value.ok_or_else(|| missing("value"))?),
		"nested" | "cartesian" => {
			let lists = def.lists.ok_or_else(|| missing("lists"))?;
			if lists.is_empty() || lists.iter().any(String::is_empty) {
				return Err(invalid("lists"));
			}
			if kind_name == "nested" {
				RuleKind::Nested(lists)
			} else {
				RuleKind::Cartesian(lists)
			}
		}
		_ => return Err(invalid("type")),
	};

	Ok(Rule { kind, generator: def.generator })
}

/// Validates one phrase against `max_length` (measured with single spaces
/// between words) and `number_of_words`.
fn check_phrase(
	name: &str,
	phrase: &[String],
	max_length: Option<usize>,
	number_of_words: Option<usize>,
) -> Result<(), ConfigError> {
	let text = phrase.join(" ");
	if let Some(expected) = number_of_words {
		if phrase.len() != expected {
			return Err(ConfigError::new(
				name,
				format!("Phrase has {} word(s) (while number_of_words={expected}): '{text}'", phrase.len()),
			));
		}
	}
	if let Some(max) = max_length {
		if text.chars().count() > max {
			return Err(ConfigError::new(name, format!("Phrase is too long: '{text}' (max_length={max})")));
		}
	}
	Ok(())
}

/// All-digit roots are addressed by their number, so `"2"` and `"02"`
/// can't both be defined.
fn check_numbered_roots(rules: &BTreeMap<String, Rule>) -> Result<(), ConfigError> {
	let mut seen: BTreeMap<usize, &str> = BTreeMap::new();
	for name in rules.keys().filter(|name| is_numeric(name)) {
		let Ok(n) = name.parse::<usize>() else {
			continue;
		};
		if let Some(other) = seen.insert(n, name.as_str()) {
			return Err(ConfigError::new(
				name.as_str(),
				format!("Generator roots '{other}' and '{name}' both address {n} words"),
			));
		}
	}
	Ok(())
}

fn check_references(rules: &BTreeMap<String, Rule>) -> Result<(), ConfigError> {
	let mut undefined = BTreeSet::new();
	let mut first_offender = None;
	for (name, rule) in rules {
		for reference in rule.kind.references() {
			if !rules.contains_key(reference) {
				undefined.insert(reference.as_str());
				first_offender.get_or_insert(name.as_str());
			}
		}
	}
	match first_offender {
		None => Ok(()),
		Some(rule) => {
			let names: Vec<&str> = undefined.into_iter().take(MAX_REPORTED_UNDEFINED).collect();
			Err(ConfigError::new(rule, format!("Lists are referenced but not defined: {}", names.join(", "))))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn config_err(value: serde_json::Value) -> ConfigError {
		match Config::from_json_value(value) {
			Err(LoadError::Config(e)) => e,
			other => panic!("expected a configuration error, got {other:?}"),
		}
	}

	#[test]
	fn parses_every_rule_type() {
		let config = Config::from_json_value(json!({
			"all": {"type": "cartesian", "lists": ["adj", "of", "noun"], "ensure_unique": true},
			"adj": {"type": "words", "words": ["brave", "agile"], "max_length": 5},
			"of": {"type": "const", "value": "of"},
			"noun": {"type": "nested", "lists": ["animal", "thing"]},
			"animal": {"type": "phrases", "phrases": ["snow leopard", ["fox"]]},
			"thing": {"type": "words", "words": ["rock"]},
			"2": {"type": "cartesian", "lists": ["adj", "thing"]},
			"short": {"type": "words", "words": ["a"], "generator": true}
		}))
		.unwrap();
		assert!(config.constraints().ensure_unique);
		assert_eq!(
			config.rule("animal").unwrap().kind,
			RuleKind::Phrases(vec![vec!["snow".to_owned(), "leopard".to_owned()], vec!["fox".to_owned()]])
		);
		let roots: Vec<&str> = config.auxiliary_roots().collect();
		assert_eq!(roots, vec!["2", "short"]);
	}

	#[test]
	fn structural_errors_name_the_rule() {
		let e = config_err(json!({"all": {"typ": "wrong"}}));
		assert_eq!((e.rule(), e.reason()), ("all", "has no 'type'"));
		assert_eq!(config_err(json!({"all": {"type": "wrong"}})).reason(), "has invalid 'type'");
		assert_eq!(config_err(json!({"all": {"type": "nested"}})).reason(), "has no 'lists'");
		assert_eq!(config_err(json!({"all": {"type": "nested", "lists": []}})).reason(), "has invalid 'lists'");
		assert_eq!(config_err(json!({"all": {"type": "const"}})).reason(), "has no 'value'");
		assert_eq!(config_err(json!({"all": {"type": "words"}})).reason(), "has no 'words'");
		assert_eq!(config_err(json!({"all": {"type": "words", "words": []}})).reason(), "has invalid 'words'");
		assert_eq!(config_err(json!({"all": {"type": "phrases", "phrases": [[]]}})).reason(), "has invalid 'phrases'");
	}

	#[test]
	fn undefined_references_are_listed() {
		let e = config_err(json!({"all": {"type": "nested", "lists": ["two", "one"]}}));
		assert_eq!(e.rule(), "all");
		assert_eq!(e.reason(), "Lists are referenced but not defined: one, two");
	}

	#[test]
	fn default_root_is_required() {
		let e = config_err(json!({"other": {"type": "words", "words": ["x"]}}));
		assert_eq!(e.rule(), "all");
	}

	#[test]
	fn digit_roots_must_not_collide() {
		let e = config_err(json!({
			"all": {"type": "words", "words": ["x"]},
			"2": {"type": "words", "words": ["y"]},
			"02": {"type": "words", "words": ["z"]}
		}));
		assert_eq!(e.rule(), "2");
		assert_eq!(e.reason(), "Generator roots '02' and '2' both address 2 words");
	}

	#[test]
	fn root_options_must_be_positive() {
		for bad in [0, -3] {
			let e = config_err(json!({"all": {"type": "words", "words": ["x"], "ensure_unique_prefix": bad}}));
			assert!(e.reason().contains("ensure_unique_prefix"), "{e}");
			let e = config_err(json!({"all": {"type": "words", "words": ["x"], "max_slug_length": bad}}));
			assert!(e.reason().contains("max_slug_length"), "{e}");
		}
	}

	#[test]
	fn length_options_are_enforced() {
		let e = config_err(json!({"all": {"type": "words", "words": ["alpha", "augmentation"], "max_length": 11}}));
		assert!(e.reason().starts_with("Word is too long: 'augmentation'"));

		let e = config_err(json!({"all": {"type": "phrases", "phrases": ["alpha beta", "gamma delta"], "max_length": 10}}));
		assert!(e.reason().starts_with("Phrase is too long: 'gamma delta'"));

		let e = config_err(json!({"all": {"type": "phrases", "phrases": ["one two", "five"], "number_of_words": 2}}));
		assert!(e.reason().starts_with("Phrase has 1 word(s) (while number_of_words=2): 'five'"));
	}

	#[test]
	fn invalid_json_is_a_load_error() {
		assert!(matches!(Config::from_json_str("word"), Err(LoadError::Json { .. })));
	}
}
