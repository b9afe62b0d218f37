//! Random-index sources feeding the generators.
//!
//! A generator never calls a global RNG directly. It holds a
//! `SharedSource`, which is either the process-wide default
//! (`SharedSource::global`) or a source given at construction.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces uniformly distributed indices.
pub trait IndexSource: Send {
	/// Returns an index in `[0, bound)`. `bound` is always `>= 1`.
	fn next_index(&mut self, bound: u128) -> u128;

	/// Re-seeds the source from system entropy.
	fn reseed(&mut self);

	/// Re-seeds the source deterministically.
	fn seed(&mut self, seed: u64);
}

/// `StdRng`-backed source.
#[derive(Clone, Debug)]
pub struct StdRngSource {
	rng: StdRng,
}

impl StdRngSource {
	/// Source seeded from the operating system.
	pub fn from_entropy() -> Self {
		Self { rng: StdRng::from_os_rng() }
	}

	/// Reproducible source.
	pub fn from_seed(seed: u64) -> Self {
		Self { rng: StdRng::seed_from_u64(seed) }
	}
}

impl IndexSource for StdRngSource {
	fn next_index(&mut self, bound: u128) -> u128 {
		self.rng.random_range(0..bound.max(1))
	}

	fn reseed(&mut self) {
		self.rng = StdRng::from_os_rng();
	}

	fn seed(&mut self, seed: u64) {
		self.rng = StdRng::seed_from_u64(seed);
	}
}

/// Replays a fixed list of values, cycling when exhausted.
///
/// Each value is reduced modulo the requested bound. Meant for tests and
/// demonstrations where the generated sequence must be known in advance.
#[derive(Clone, Debug, Default)]
pub struct FixedSource {
	values: Vec<u128>,
	position: usize,
}

impl FixedSource {
	pub fn new(values: impl IntoIterator<Item = u128>) -> Self {
		Self { values: values.into_iter().collect(), position: 0 }
	}
}

impl IndexSource for FixedSource {
	fn next_index(&mut self, bound: u128) -> u128 {
		if self.values.is_empty() {
			return 0;
		}
		let value = self.values[self.position % self.values.len()];
		self.position = (self.position + 1) % self.values.len();
		value % bound.max(1)
	}

	fn reseed(&mut self) {
		self.position = 0;
	}

	/// Moves the replay position to `seed`.
	fn seed(&mut self, seed: u64) {
		if !self.values.is_empty() {
			self.position = (seed % self.values.len() as u64) as usize;
		}
	}
}

/// Cloneable, thread-safe handle to an `IndexSource`.
///
/// Access is serialized by a mutex, so one source may feed generators
/// used from several threads. Clones share the same underlying source:
/// re-seeding through one handle affects every holder.
#[derive(Clone)]
pub struct SharedSource {
	inner: Arc<Mutex<Box<dyn IndexSource>>>,
}

static GLOBAL: OnceLock<SharedSource> = OnceLock::new();

impl SharedSource {
	pub fn new<S: IndexSource + 'static>(source: S) -> Self {
		Self { inner: Arc::new(Mutex::new(Box::new(source))) }
	}

	/// Process-wide default source, seeded from the OS on first use.
	///
	/// Every generator built without an explicit source draws from this one.
	/// Re-seeding it is a process-wide side effect.
	pub fn global() -> Self {
		GLOBAL.get_or_init(|| SharedSource::new(StdRngSource::from_entropy())).clone()
	}

	pub fn next_index(&self, bound: u128) -> u128 {
		self.lock().next_index(bound)
	}

	pub fn reseed(&self) {
		self.lock().reseed()
	}

	pub fn seed(&self, seed: u64) {
		self.lock().seed(seed)
	}

	/// Whether both handles point to the same underlying source.
	pub fn same_source(&self, other: &SharedSource) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	fn lock(&self) -> MutexGuard<'_, Box<dyn IndexSource>> {
		// Poisoning is ignored: a source has no invariant to break.
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Default for SharedSource {
	fn default() -> Self {
		Self::global()
	}
}

impl fmt::Debug for SharedSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SharedSource").field("global", &self.same_source(&Self::global())).finish()
	}
}
