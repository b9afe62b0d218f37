use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::leaf_list::{Atom, LeafList, PhraseList, WordList};

/// One output of a space: a flat word sequence plus the boundaries of
/// the atoms it was assembled from.
///
/// A phrase contributes several words but stays one atom, which is what
/// uniqueness constraints compare.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sample<'a> {
	words: Vec<&'a str>,
	/// `ends[i]` is one past the last word of atom `i`.
	ends: Vec<usize>,
}

impl<'a> Sample<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends one atom made of `words`.
	pub fn push_atom(&mut self, words: impl IntoIterator<Item = &'a str>) {
		self.words.extend(words);
		self.ends.push(self.words.len());
	}

	pub fn words(&self) -> &[&'a str] {
		&self.words
	}

	pub fn into_words(self) -> Vec<&'a str> {
		self.words
	}

	/// Words of each atom, in order.
	pub fn atoms(&self) -> impl Iterator<Item = &[&'a str]> {
		let mut start = 0;
		self.ends.iter().map(move |&end| {
			let atom = &self.words[start..end];
			start = end;
			atom
		})
	}

	/// Each atom as text, the words of a phrase joined with one space.
	pub fn atom_texts(&self) -> Vec<Cow<'a, str>> {
		self.atoms()
			.map(|atom| match atom {
				[word] => Cow::Borrowed(*word),
				words => Cow::Owned(words.join(" ")),
			})
			.collect()
	}
}

/// A combinatorial collection addressable by integer index.
///
/// Every node of the tree implements this capability. Nodes are immutable
/// once built, so `size` and `at` are pure and may be called concurrently.
pub trait Space {
	/// Number of outputs in the space (always `>= 1`).
	fn size(&self) -> u128;

	/// Whether an output can hold more than one word.
	fn is_multi_word(&self) -> bool;

	/// Appends the output at `index` to `out`.
	///
	/// The caller guarantees `index < self.size()`.
	fn write_at<'a>(&'a self, index: u128, out: &mut Sample<'a>);

	/// Returns the output at `index` with its atom boundaries,
	/// or `None` if the index is outside `[0, size)`.
	fn sample(&self, index: u128) -> Option<Sample<'_>> {
		if index >= self.size() {
			return None;
		}
		let mut out = Sample::new();
		self.write_at(index, &mut out);
		Some(out)
	}

	/// Returns the output at `index` as a flat word sequence.
	fn at(&self, index: u128) -> Option<Vec<&str>> {
		self.sample(index).map(Sample::into_words)
	}
}

impl<A: Atom> Space for LeafList<A> {
	fn size(&self) -> u128 {
		self.len() as u128
	}

	fn is_multi_word(&self) -> bool {
		A::MULTI_WORD
	}

	fn write_at<'a>(&'a self, index: u128, out: &mut Sample<'a>) {
		if let Some(atom) = usize::try_from(index).ok().and_then(|i| self.get(i)) {
			atom.push_to(out);
		}
	}
}

/// A space holding exactly one fixed word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constant {
	value: String,
}

impl Constant {
	pub fn new(value: impl Into<String>) -> Self {
		Self { value: value.into() }
	}
}

impl Space for Constant {
	fn size(&self) -> u128 {
		1
	}

	fn is_multi_word(&self) -> bool {
		false
	}

	fn write_at<'a>(&'a self, _index: u128, out: &mut Sample<'a>) {
		out.push_atom([self.value.as_str()]);
	}
}

/// Union of child spaces: `size` is the sum of the children's sizes.
///
/// Children are kept sorted by descending size, so the linear scan in
/// `locate` stops early for most indices.
#[derive(Debug)]
pub struct Concatenation {
	children: Vec<Arc<Node>>,
	size: u128,
}

impl Concatenation {
	/// Returns `None` if `children` is empty or the total size overflows.
	pub fn new(mut children: Vec<Arc<Node>>) -> Option<Self> {
		if children.is_empty() {
			return None;
		}
		children.sort_by(|a, b| b.size().cmp(&a.size()));
		let size = children.iter().try_fold(0u128, |acc, c| acc.checked_add(c.size()))?;
		Some(Self { children, size })
	}

	pub fn children(&self) -> &[Arc<Node>] {
		&self.children
	}

	/// Finds the child owning `index` and the index inside that child.
	pub fn locate(&self, index: u128) -> Option<(usize, u128)> {
		let mut index = index;
		for (position, child) in self.children.iter().enumerate() {
			let length = child.size();
			if index < length {
				return Some((position, index));
			}
			index -= length;
		}
		None
	}
}

impl Space for Concatenation {
	fn size(&self) -> u128 {
		self.size
	}

	fn is_multi_word(&self) -> bool {
		self.children.iter().any(|c| c.is_multi_word())
	}

	fn write_at<'a>(&'a self, index: u128, out: &mut Sample<'a>) {
		if let Some((position, inner)) = self.locate(index) {
			self.children[position].write_at(inner, out);
		}
	}
}

/// Cartesian product of child spaces: `size` is the product of the
/// children's sizes and every output is the concatenation of one output
/// of each child, in child order.
///
/// The last child varies fastest. `divisors[k]` is the product of the
/// sizes of all children after `k`, so the sub-index of child `k` is
/// `(index / divisors[k]) % size_k`.
#[derive(Debug)]
pub struct Product {
	children: Vec<Arc<Node>>,
	divisors: Vec<u128>,
	size: u128,
}

impl Product {
	/// Returns `None` if `children` is empty or the total size overflows.
	pub fn new(children: Vec<Arc<Node>>) -> Option<Self> {
		if children.is_empty() {
			return None;
		}
		let mut divisors = vec![1u128; children.len()];
		let mut suffix = 1u128;
		for (k, child) in children.iter().enumerate().rev() {
			divisors[k] = suffix;
			suffix = suffix.checked_mul(child.size())?;
		}
		Some(Self { children, divisors, size: suffix })
	}

	pub fn children(&self) -> &[Arc<Node>] {
		&self.children
	}

	/// Splits `index` into one sub-index per child.
	pub fn decompose(&self, index: u128) -> Option<Vec<u128>> {
		if index >= self.size {
			return None;
		}
		Some(
			self.children
				.iter()
				.zip(&self.divisors)
				.map(|(child, divisor)| (index / divisor) % child.size())
				.collect(),
		)
	}

	/// Inverse of `decompose`.
	pub fn compose(&self, parts: &[u128]) -> Option<u128> {
		if parts.len() != self.children.len() {
			return None;
		}
		let mut index = 0u128;
		for ((part, divisor), child) in parts.iter().zip(&self.divisors).zip(&self.children) {
			if *part >= child.size() {
				return None;
			}
			index += part * divisor;
		}
		Some(index)
	}
}

impl Space for Product {
	fn size(&self) -> u128 {
		self.size
	}

	fn is_multi_word(&self) -> bool {
		true
	}

	fn write_at<'a>(&'a self, index: u128, out: &mut Sample<'a>) {
		for (child, divisor) in self.children.iter().zip(&self.divisors) {
			child.write_at((index / divisor) % child.size(), out);
		}
	}
}

/// Node of the combinatorial tree.
///
/// Leaf lists are held behind `Arc` so that the squash pass can share one
/// deduplicated list between unrelated branches.
#[derive(Debug)]
pub enum Node {
	Words(Arc<WordList>),
	Phrases(Arc<PhraseList>),
	/// Presents a single-word space as a phrase space, so that a
	/// concatenation mixing words and phrases has a uniform shape.
	AsPhrases(Arc<Node>),
	Constant(Constant),
	Concatenation(Concatenation),
	Product(Product),
}

impl Node {
	fn as_space(&self) -> &dyn Space {
		match self {
			Node::Words(list) => &**list,
			Node::Phrases(list) => &**list,
			Node::AsPhrases(inner) => &**inner,
			Node::Constant(constant) => constant,
			Node::Concatenation(concatenation) => concatenation,
			Node::Product(product) => product,
		}
	}

	/// Writes an indented, one-line-per-node description of the subtree.
	pub fn dump<W: fmt::Write>(&self, out: &mut W, depth: usize) -> fmt::Result {
		writeln!(out, "{}{}", "  ".repeat(depth), self)?;
		match self {
			Node::Concatenation(c) => c.children.iter().try_for_each(|child| child.dump(out, depth + 1)),
			Node::Product(p) => p.children.iter().try_for_each(|child| child.dump(out, depth + 1)),
			_ => Ok(()),
		}
	}

	/// Displays the whole subtree as written by `dump`.
	pub fn tree(&self) -> Tree<'_> {
		Tree(self)
	}
}

/// `Display` adapter over `Node::dump`.
pub struct Tree<'a>(&'a Node);

impl fmt::Display for Tree<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.dump(f, 0)
	}
}

impl Space for Node {
	fn size(&self) -> u128 {
		self.as_space().size()
	}

	fn is_multi_word(&self) -> bool {
		match self {
			Node::AsPhrases(_) => true,
			other => other.as_space().is_multi_word(),
		}
	}

	fn write_at<'a>(&'a self, index: u128, out: &mut Sample<'a>) {
		self.as_space().write_at(index, out)
	}
}

impl fmt::Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Node::Words(list) => fmt::Display::fmt(list, f),
			Node::Phrases(list) => fmt::Display::fmt(list, f),
			Node::AsPhrases(inner) => write!(f, "AsPhrases({inner})"),
			Node::Constant(c) => write!(f, "Constant(value='{}')", c.value),
			Node::Concatenation(c) => write!(f, "Concatenation({}, len={})", c.children.len(), c.size),
			Node::Product(p) => write!(f, "Product({}, len={})", p.children.len(), p.size),
		}
	}
}
