use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::space::Sample;

/// One indivisible output unit stored in a `LeafList`.
///
/// Implemented for `String` (a single word) and `Vec<String>` (a phrase,
/// i.e. a fixed tuple of words treated as one logical unit).
pub trait Atom: Clone + Ord + Hash + fmt::Debug {
	/// Label used when dumping a list of this atom kind.
	const LIST_KIND: &'static str;

	/// Whether one atom expands into a sequence of words.
	const MULTI_WORD: bool;

	/// Appends this atom to `out`.
	fn push_to<'a>(&'a self, out: &mut Sample<'a>);

	/// Short rendering used by tree dumps.
	fn render(&self) -> String;
}

impl Atom for String {
	const LIST_KIND: &'static str = "WordList";
	const MULTI_WORD: bool = false;

	fn push_to<'a>(&'a self, out: &mut Sample<'a>) {
		out.push_atom([self.as_str()]);
	}

	fn render(&self) -> String {
		format!("'{self}'")
	}
}

impl Atom for Vec<String> {
	const LIST_KIND: &'static str = "PhraseList";
	const MULTI_WORD: bool = true;

	fn push_to<'a>(&'a self, out: &mut Sample<'a>) {
		out.push_atom(self.iter().map(String::as_str));
	}

	fn render(&self) -> String {
		let words: Vec<String> = self.iter().map(|w| format!("'{w}'")).collect();
		if words.len() == 1 {
			format!("({},)", words[0])
		} else {
			format!("({})", words.join(", "))
		}
	}
}

/// Flat, ordered, immutable collection of atoms.
///
/// This is the leaf of the combinatorial tree: index `i` simply yields
/// the `i`-th atom.
///
/// # Invariants
/// - The list is never empty
/// - `fingerprint` is computed once from the length and the elements and
///   never changes afterwards
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafList<A: Atom> {
	items: Vec<A>,
	fingerprint: u64,
}

/// List of single words.
pub type WordList = LeafList<String>;

/// List of phrases (fixed tuples of words).
pub type PhraseList = LeafList<Vec<String>>;

impl<A: Atom> LeafList<A> {
	/// Creates a list from its atoms, keeping their order.
	///
	/// Returns `None` if `items` is empty.
	pub fn new(items: Vec<A>) -> Option<Self> {
		if items.is_empty() {
			return None;
		}
		let fingerprint = Self::compute_fingerprint(&items);
		Some(Self { items, fingerprint })
	}

	/// Builds the deduplicated union of several lists.
	///
	/// Atoms are sorted into their natural order, so the resulting index
	/// mapping is canonical regardless of the input order.
	pub fn union<'a, I>(lists: I) -> Option<Self>
	where
		I: IntoIterator<Item = &'a LeafList<A>>,
		A: 'a,
	{
		let merged: BTreeSet<&A> = lists.into_iter().flat_map(|l| l.items.iter()).collect();
		Self::new(merged.into_iter().cloned().collect())
	}

	/// Deterministic hash over the length and the elements.
	///
	/// Only used to find candidate duplicates; equal fingerprints are
	/// confirmed with a full comparison before two lists are shared.
	pub fn fingerprint(&self) -> u64 {
		self.fingerprint
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Always `false`; kept for API symmetry with `len`.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&A> {
		self.items.get(index)
	}

	pub fn iter(&self) -> impl Iterator<Item = &A> {
		self.items.iter()
	}

	fn compute_fingerprint(items: &[A]) -> u64 {
		let mut hasher = DefaultHasher::new();
		hasher.write_usize(items.len());
		for item in items {
			item.hash(&mut hasher);
		}
		hasher.finish()
	}
}

impl WordList {
	/// Re-reads every word as a one-word phrase.
	pub fn to_phrases(&self) -> Vec<Vec<String>> {
		self.items.iter().map(|w| vec![w.clone()]).collect()
	}
}

impl<A: Atom> fmt::Display for LeafList<A> {
	/// Shows at most three atoms, then `...`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut shown: Vec<String> = self.items.iter().take(3).map(Atom::render).collect();
		if self.items.len() > 3 {
			shown.push("...".to_owned());
		}
		write!(f, "{}([{}], len={})", A::LIST_KIND, shown.join(", "), self.items.len())
	}
}
