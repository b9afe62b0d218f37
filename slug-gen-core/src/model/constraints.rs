use std::collections::HashSet;

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::space::{Sample, Space};
use crate::error::ConfigError;

/// Number of samples drawn by the feasibility pre-check.
pub const FEASIBILITY_SAMPLES: usize = 100;

/// Violation count at which the pre-check warns about slow generation.
pub const SLOW_WARNING_THRESHOLD: usize = 20;

/// Seed of the pre-check RNG. Fixed so that construction is deterministic
/// and never draws from the generator's own index source.
const FEASIBILITY_SEED: u64 = 0x5EED_C0DE;

/// Separator placed between words of a slug.
pub const SLUG_SEPARATOR: char = '-';

/// Constraints applied to every generated word sequence.
///
/// All constraints are optional and off by default. They are read from the
/// default root rule of the configuration.
///
/// # Invariants
/// - `unique_prefix`, when set, is `>= 1`
/// - `max_slug_length`, when set, is `>= 1`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
	/// All words must be pairwise distinct.
	pub ensure_unique: bool,

	/// All words must have pairwise distinct prefixes of this many characters.
	pub unique_prefix: Option<usize>,

	/// Maximum length, in characters, of the words joined with `-`.
	pub max_slug_length: Option<usize>,
}

impl Constraints {
	/// Returns `true` when no constraint is configured.
	pub fn is_empty(&self) -> bool {
		!self.ensure_unique && self.unique_prefix.is_none() && self.max_slug_length.is_none()
	}

	fn has_uniqueness(&self) -> bool {
		self.ensure_unique || self.unique_prefix.is_some()
	}

	/// Checks `ensure_unique` and `unique_prefix` over atoms.
	///
	/// A phrase is one atom: `["sea lion", "lion"]` holds distinct atoms.
	pub fn uniqueness_ok<S: AsRef<str>>(&self, atoms: &[S]) -> bool {
		if self.ensure_unique {
			let mut seen = HashSet::with_capacity(atoms.len());
			if !atoms.iter().all(|a| seen.insert(a.as_ref())) {
				return false;
			}
		}
		if let Some(k) = self.unique_prefix {
			let mut seen = HashSet::with_capacity(atoms.len());
			if !atoms.iter().all(|a| seen.insert(prefix(a.as_ref(), k))) {
				return false;
			}
		}
		true
	}

	/// Checks `max_slug_length`.
	pub fn length_ok(&self, words: &[&str]) -> bool {
		match self.max_slug_length {
			Some(max) => slug_length(words) <= max,
			None => true,
		}
	}

	/// Returns `true` when `sample` satisfies every configured constraint.
	pub fn accepts(&self, sample: &Sample<'_>) -> bool {
		self.length_ok(sample.words()) && (!self.has_uniqueness() || self.uniqueness_ok(&sample.atom_texts()))
	}

	/// One-time probabilistic check that rejection sampling can terminate.
	///
	/// Draws `FEASIBILITY_SAMPLES` outputs from `space` and counts how many
	/// violate each constraint group (uniqueness, then length). Each group is
	/// judged independently:
	/// - every sample violates: the configuration is rejected
	/// - at least `SLOW_WARNING_THRESHOLD` samples violate: a warning is logged
	///
	/// # Errors
	/// Returns a `ConfigError` on `root` when a constraint can never (or
	/// practically never) be satisfied.
	///
	/// # Notes
	/// Sampling makes the check conservative: a configuration where almost
	/// every combination violates may be rejected although it is satisfiable.
	pub fn check_feasibility<S: Space + ?Sized>(&self, root: &str, space: &S) -> Result<(), ConfigError> {
		if self.is_empty() {
			return Ok(());
		}

		let mut rng = StdRng::seed_from_u64(FEASIBILITY_SEED);
		let mut unique_violations = 0;
		let mut length_violations = 0;
		for _ in 0..FEASIBILITY_SAMPLES {
			let index = rng.random_range(0..space.size());
			let Some(sample) = space.sample(index) else {
				continue;
			};
			if self.has_uniqueness() && !self.uniqueness_ok(&sample.atom_texts()) {
				unique_violations += 1;
			}
			if !self.length_ok(sample.words()) {
				length_violations += 1;
			}
		}

		if self.has_uniqueness() {
			let what = self.describe_uniqueness();
			Self::judge(root, &what, unique_violations)?;
		}
		if let Some(max) = self.max_slug_length {
			Self::judge(root, &format!("max_slug_length={max}"), length_violations)?;
		}
		Ok(())
	}

	fn judge(root: &str, what: &str, violations: usize) -> Result<(), ConfigError> {
		if violations >= FEASIBILITY_SAMPLES {
			return Err(ConfigError::new(root, format!("Impossible to generate with {what}")));
		}
		if violations >= SLOW_WARNING_THRESHOLD {
			warn!(
				"Slugs with {what} will be generated slowly ({violations} of {FEASIBILITY_SAMPLES} samples rejected)"
			);
		}
		Ok(())
	}

	fn describe_uniqueness(&self) -> String {
		match (self.ensure_unique, self.unique_prefix) {
			(true, Some(k)) => format!("ensure_unique and ensure_unique_prefix={k}"),
			(false, Some(k)) => format!("ensure_unique_prefix={k}"),
			_ => "ensure_unique".to_owned(),
		}
	}
}

/// First `k` characters of `word` (the whole word if shorter).
fn prefix(word: &str, k: usize) -> &str {
	match word.char_indices().nth(k) {
		Some((end, _)) => &word[..end],
		None => word,
	}
}

/// Length in characters of `words` joined with `SLUG_SEPARATOR`.
pub fn slug_length(words: &[&str]) -> usize {
	let letters: usize = words.iter().map(|w| w.chars().count()).sum();
	letters + words.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::leaf_list::WordList;

	/// One atom per word.
	fn words<'a>(items: &[&'a str]) -> Sample<'a> {
		let mut sample = Sample::new();
		for item in items {
			sample.push_atom([*item]);
		}
		sample
	}

	#[test]
	fn unique_words() {
		let c = Constraints { ensure_unique: true, ..Default::default() };
		assert!(c.accepts(&words(&["one", "of", "two"])));
		assert!(!c.accepts(&words(&["one", "of", "one"])));
	}

	#[test]
	fn phrases_are_compared_as_whole_atoms() {
		let c = Constraints { ensure_unique: true, ..Default::default() };
		let mut sample = Sample::new();
		sample.push_atom(["sea", "lion"]);
		sample.push_atom(["lion"]);
		assert!(c.accepts(&sample));

		sample.push_atom(["sea", "lion"]);
		assert!(!c.accepts(&sample));

		let prefixed = Constraints { unique_prefix: Some(3), ..Default::default() };
		let mut sample = Sample::new();
		sample.push_atom(["sea", "lion"]);
		sample.push_atom(["seal"]);
		assert!(!prefixed.accepts(&sample));
	}

	#[test]
	fn unique_prefix_counts_characters() {
		let c = Constraints { unique_prefix: Some(4), ..Default::default() };
		assert!(!c.accepts(&words(&["brave", "bravery"])));
		assert!(c.accepts(&words(&["brave", "brass"])));
		assert!(!c.accepts(&words(&["белый", "белые"])));
		assert!(c.accepts(&words(&["age", "agile"])));
	}

	#[test]
	fn max_slug_length_includes_separators() {
		let c = Constraints { max_slug_length: Some(7), ..Default::default() };
		assert_eq!(slug_length(&["abc", "def"]), 7);
		assert!(c.accepts(&words(&["abc", "def"])));
		assert!(!c.accepts(&words(&["abc", "defg"])));

		let mut phrase = Sample::new();
		phrase.push_atom(["abc", "defg"]);
		assert!(!c.accepts(&phrase));
	}

	#[test]
	fn no_constraints_accepts_everything() {
		let c = Constraints::default();
		assert!(c.is_empty());
		assert!(c.accepts(&words(&["same", "same"])));
	}

	#[test]
	fn impossible_length_is_rejected() {
		let space = WordList::new(vec!["unbearably".to_owned(), "lengthy".to_owned()]).unwrap();
		let c = Constraints { max_slug_length: Some(5), ..Default::default() };
		let err = c.check_feasibility("all", &space).unwrap_err();
		assert_eq!(err.rule(), "all");
		assert!(err.reason().contains("Impossible to generate"));
	}

	#[test]
	fn feasible_length_passes() {
		let space = WordList::new(vec!["ok".to_owned(), "lengthy".to_owned()]).unwrap();
		let c = Constraints { max_slug_length: Some(5), ..Default::default() };
		assert!(c.check_feasibility("all", &space).is_ok());
	}

	#[test]
	fn frequent_violations_only_warn() {
		// Half of the words are too long: well inside the warning band.
		let items: Vec<String> =
			(0..5).map(|i| format!("ok{i}")).chain((0..5).map(|i| format!("lengthy{i}"))).collect();
		let space = WordList::new(items).unwrap();
		let c = Constraints { max_slug_length: Some(5), ..Default::default() };

		let mut rng = StdRng::seed_from_u64(FEASIBILITY_SEED);
		let violations = (0..FEASIBILITY_SAMPLES)
			.filter(|_| !c.length_ok(&space.at(rng.random_range(0..space.size())).unwrap()))
			.count();
		assert!((SLOW_WARNING_THRESHOLD..FEASIBILITY_SAMPLES).contains(&violations), "{violations}");
		assert!(c.check_feasibility("all", &space).is_ok());
	}
}
