//! Interpreter random number generator
//!
//! Story interpreters draw every random decision (wandering characters,
//! combat rolls, ...) from this generator. Its whole state is the triple
//! `(a, interval, counter)`, which is what a game snapshot stores and what a
//! restore writes back, so replaying a snapshot reproduces the same rolls.
//!
//! Two modes are supported:
//! - standard mode: a linear congruential sequence driven by `a`
//! - predictable mode: a counter cycling through `1..=interval`

use serde::{Deserialize, Serialize};

/// Multiplier of the standard-mode linear congruential sequence
const LCG_MULTIPLIER: i64 = 0x015a_4e35;

/// Seeds below this value select predictable mode
const PREDICTABLE_SEED_LIMIT: u64 = 1000;

/// The complete, restorable state of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RngTriple {
    /// Standard-mode accumulator
    pub a: i64,
    /// Predictable-mode cycle length (0 in standard mode)
    pub interval: i32,
    /// Predictable-mode position
    pub counter: i32,
}

impl Default for RngTriple {
    fn default() -> Self {
        Self {
            a: 1,
            interval: 0,
            counter: 0,
        }
    }
}

/// An RNG call trace entry for debugging divergent replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngTraceEntry {
    /// Sequence number (0-indexed)
    pub seq: u64,
    /// Requested range (results fall in `1..=range`)
    pub range: u16,
    /// Result value
    pub result: u16,
}

/// Interpreter random number generator
#[derive(Clone, Serialize, Deserialize)]
pub struct StoryRng {
    state: RngTriple,
    /// Number of draws since the last seeding (for tracing)
    call_count: u64,
    #[serde(skip)]
    tracing: bool,
    #[serde(skip)]
    trace: Vec<RngTraceEntry>,
}

impl core::fmt::Debug for StoryRng {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoryRng")
            .field("a", &self.state.a)
            .field("interval", &self.state.interval)
            .field("counter", &self.state.counter)
            .field("call_count", &self.call_count)
            .finish()
    }
}

impl StoryRng {
    /// Create a generator seeded with `seed`.
    ///
    /// A seed of 0 draws a fresh seed from entropy, seeds in `1..1000`
    /// select predictable mode with that interval, anything else seeds the
    /// standard sequence.
    pub fn new(seed: i64) -> Self {
        let mut rng = Self {
            state: RngTriple::default(),
            call_count: 0,
            tracing: false,
            trace: Vec::new(),
        };
        rng.reseed(seed);
        rng
    }

    /// Restore a generator from a snapshot triple.
    pub fn from_triple(state: RngTriple) -> Self {
        Self {
            state,
            call_count: 0,
            tracing: false,
            trace: Vec::new(),
        }
    }

    /// Re-seed in place (same rules as [`StoryRng::new`]).
    pub fn reseed(&mut self, seed: i64) {
        if seed == 0 {
            self.state.a = i64::from(rand::random::<u32>()) | 1;
            self.state.interval = 0;
        } else if seed.unsigned_abs() < PREDICTABLE_SEED_LIMIT {
            self.state.counter = 0;
            self.state.interval = seed.unsigned_abs() as i32;
        } else {
            self.state.a = seed;
            self.state.interval = 0;
        }
        self.call_count = 0;
    }

    /// Snapshot of the current state.
    pub fn triple(&self) -> RngTriple {
        self.state
    }

    /// Overwrite the current state with a snapshot.
    pub fn set_triple(&mut self, state: RngTriple) {
        self.state = state;
    }

    /// Whether the generator is cycling a fixed interval.
    pub fn is_predictable(&self) -> bool {
        self.state.interval != 0
    }

    /// Next raw value in `0..=0x7fff` (standard) or `1..=interval` (predictable).
    fn next_raw(&mut self) -> u16 {
        self.call_count += 1;
        if self.state.interval != 0 {
            if self.state.counter == self.state.interval {
                self.state.counter = 1;
            } else {
                self.state.counter += 1;
            }
            self.state.counter as u16
        } else {
            self.state.a = LCG_MULTIPLIER.wrapping_mul(self.state.a).wrapping_add(1);
            ((self.state.a >> 16) & 0x7fff) as u16
        }
    }

    /// Returns a value in `1..=range`; 0 when `range` is 0.
    pub fn roll(&mut self, range: u16) -> u16 {
        if range == 0 {
            return 0;
        }
        let result = self.next_raw() % range + 1;
        if self.tracing {
            self.trace.push(RngTraceEntry {
                seq: self.call_count - 1,
                range,
                result,
            });
        }
        result
    }

    /// Returns true with probability 1/n
    pub fn one_in(&mut self, n: u16) -> bool {
        self.roll(n) == 1
    }

    /// Choose an element of a slice
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let range = u16::try_from(items.len()).unwrap_or(u16::MAX);
        items.get(usize::from(self.roll(range)) - 1)
    }

    /// Enable RNG tracing
    pub fn enable_tracing(&mut self) {
        self.tracing = true;
        self.trace.clear();
    }

    /// Disable RNG tracing
    pub fn disable_tracing(&mut self) {
        self.tracing = false;
    }

    /// Recorded draws since tracing was enabled
    pub fn trace(&self) -> &[RngTraceEntry] {
        &self.trace
    }

    /// Total number of draws since seeding
    pub fn call_count(&self) -> u64 {
        self.call_count
    }
}

impl Default for StoryRng {
    fn default() -> Self {
        Self::from_triple(RngTriple::default())
    }
}
