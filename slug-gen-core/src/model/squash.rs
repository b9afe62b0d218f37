use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::leaf_list::{Atom, LeafList, PhraseList, WordList};
use super::space::{Concatenation, Node, Product, Space};

/// Fingerprint-indexed pool of the lists produced by `squash`.
///
/// If 4 branches end up with the same merged list of nouns, they all
/// point to one shared `Arc` instead of 4 copies.
#[derive(Default, Debug)]
pub struct SquashCache {
	words: HashMap<u64, Vec<Arc<WordList>>>,
	phrases: HashMap<u64, Vec<Arc<PhraseList>>>,
	hits: usize,
}

impl SquashCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of merged lists that were replaced by an existing one.
	pub fn hits(&self) -> usize {
		self.hits
	}

	/// Number of distinct lists held by the cache.
	pub fn len(&self) -> usize {
		self.words.values().map(Vec::len).sum::<usize>() + self.phrases.values().map(Vec::len).sum::<usize>()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn share_words(&mut self, list: WordList) -> Arc<WordList> {
		share(&mut self.words, &mut self.hits, list)
	}

	fn share_phrases(&mut self, list: PhraseList) -> Arc<PhraseList> {
		share(&mut self.phrases, &mut self.hits, list)
	}
}

/// Returns the pooled list equal to `list`, inserting it if there is none.
///
/// Equal fingerprints are confirmed by comparing contents.
fn share<A: Atom>(pool: &mut HashMap<u64, Vec<Arc<LeafList<A>>>>, hits: &mut usize, list: LeafList<A>) -> Arc<LeafList<A>> {
	let bucket = pool.entry(list.fingerprint()).or_default();
	if let Some(existing) = bucket.iter().find(|candidate| candidate.as_ref() == &list) {
		*hits += 1;
		return existing.clone();
	}
	let shared = Arc::new(list);
	bucket.push(shared.clone());
	shared
}

/// Collapses homogeneous concatenations into single deduplicated lists.
///
/// # Behavior
/// - A concatenation with one child becomes that child.
/// - A concatenation whose children are all word lists becomes one word
///   list: the sorted, deduplicated union of its children.
/// - A concatenation whose children are all phrase lists (or word lists
///   presented as phrases) becomes one phrase list the same way.
/// - Products and other concatenations are rebuilt from squashed children.
///
/// The set of reachable outputs is preserved. The size is preserved too
/// unless merged lists overlap, in which case duplicates are dropped.
/// Index-to-output mapping changes deterministically (canonical order).
pub fn squash(node: &Arc<Node>, cache: &mut SquashCache) -> Arc<Node> {
	let squashed = squash_node(node, cache);
	debug!(
		"Squashed tree: {} -> {} combinations, {} shared lists reused",
		node.size(),
		squashed.size(),
		cache.hits()
	);
	squashed
}

fn squash_node(node: &Arc<Node>, cache: &mut SquashCache) -> Arc<Node> {
	match node.as_ref() {
		Node::Concatenation(concatenation) => {
			let children: Vec<Arc<Node>> = concatenation.children().iter().map(|c| squash_node(c, cache)).collect();
			merge_children(children, cache).unwrap_or_else(|| node.clone())
		}
		Node::Product(product) => {
			let children: Vec<Arc<Node>> = product.children().iter().map(|c| squash_node(c, cache)).collect();
			Product::new(children).map(|p| Arc::new(Node::Product(p))).unwrap_or_else(|| node.clone())
		}
		Node::AsPhrases(inner) => Arc::new(Node::AsPhrases(squash_node(inner, cache))),
		Node::Words(_) | Node::Phrases(_) | Node::Constant(_) => node.clone(),
	}
}

fn merge_children(mut children: Vec<Arc<Node>>, cache: &mut SquashCache) -> Option<Arc<Node>> {
	if children.len() == 1 {
		return children.pop();
	}

	let word_lists: Option<Vec<&WordList>> = children
		.iter()
		.map(|c| match c.as_ref() {
			Node::Words(list) => Some(&**list),
			_ => None,
		})
		.collect();
	if let Some(lists) = word_lists {
		let merged = WordList::union(lists)?;
		return Some(Arc::new(Node::Words(cache.share_words(merged))));
	}

	let phrase_lists: Option<Vec<PhraseList>> = children.iter().map(|c| as_phrase_list(c)).collect();
	if let Some(lists) = phrase_lists {
		let merged = PhraseList::union(&lists)?;
		return Some(Arc::new(Node::Phrases(cache.share_phrases(merged))));
	}

	Concatenation::new(children).map(|c| Arc::new(Node::Concatenation(c)))
}

/// Reads a phrase-kind leaf as a phrase list.
fn as_phrase_list(node: &Node) -> Option<PhraseList> {
	match node {
		Node::Phrases(list) => Some((**list).clone()),
		Node::AsPhrases(inner) => match inner.as_ref() {
			Node::Words(list) => PhraseList::new(list.to_phrases()),
			_ => None,
		},
		_ => None,
	}
}
