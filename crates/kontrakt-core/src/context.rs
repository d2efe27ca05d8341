//! Per-session generation state.
//!
//! A [`GenerationContext`] carries the three pieces of session state the
//! synthesiser needs: a seeded RNG, a fixed clock, and the set of types
//! currently on the active generation stack.
//!
//! # Invariants
//!
//! 1. The RNG is shared by handle and advanced strictly in generation
//!    order: two sessions with the same seed and identical call sequences
//!    produce identical values
//! 2. The history is extended immutably: children observe the parent set
//!    plus the current type, peers stay isolated
//! 3. The clock never advances within a session

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::descriptor::TypeId;

/// Per-session value object threading RNG, clock, and recursion history.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    seed: u64,
    rng: Rc<RefCell<ChaCha8Rng>>,
    clock: DateTime<Utc>,
    history: im::HashSet<TypeId>,
    path: im::Vector<TypeId>,
}

impl GenerationContext {
    /// Create a session context from a seed and a captured clock.
    #[must_use]
    pub fn new(seed: u64, clock: DateTime<Utc>) -> Self {
        Self {
            seed,
            rng: Rc::new(RefCell::new(ChaCha8Rng::seed_from_u64(seed))),
            clock,
            history: im::HashSet::new(),
            path: im::Vector::new(),
        }
    }

    /// The session seed, stamped into failure records for reproduction.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The fixed session clock.
    #[must_use]
    pub const fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    /// Child context whose history includes `type_id`. The RNG handle is
    /// shared with the parent; the history extension is immutable, so
    /// sibling branches never observe each other's types.
    #[must_use]
    pub fn descend(&self, type_id: &TypeId) -> Self {
        Self {
            seed: self.seed,
            rng: Rc::clone(&self.rng),
            clock: self.clock,
            history: self.history.update(type_id.clone()),
            path: {
                let mut path = self.path.clone();
                path.push_back(type_id.clone());
                path
            },
        }
    }

    /// Whether `type_id` is already on the active generation stack.
    #[must_use]
    pub fn in_history(&self, type_id: &TypeId) -> bool {
        self.history.contains(type_id)
    }

    /// The ordered stack of types currently in construction, for
    /// diagnostics.
    #[must_use]
    pub fn path(&self) -> Vec<TypeId> {
        self.path.iter().cloned().collect()
    }

    /// Next raw 64-bit draw.
    #[must_use]
    pub fn next_u64(&self) -> u64 {
        self.rng.borrow_mut().gen()
    }

    /// Uniform boolean draw.
    #[must_use]
    pub fn gen_bool(&self) -> bool {
        self.rng.borrow_mut().gen()
    }

    /// Uniform draw from an inclusive integer range.
    #[must_use]
    pub fn gen_range_i64(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.borrow_mut().gen_range(min..=max)
    }

    /// Uniform draw from an inclusive usize range.
    #[must_use]
    pub fn gen_range_usize(&self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        self.rng.borrow_mut().gen_range(min..=max)
    }

    /// Uniform draw from the unit interval.
    #[must_use]
    pub fn gen_unit_f64(&self) -> f64 {
        self.rng.borrow_mut().gen_range(0.0..1.0)
    }

    /// Uniform index into a non-empty collection of `len` items.
    #[must_use]
    pub fn choose_index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.borrow_mut().gen_range(0..len)
    }
}
