//! Mulberry32: a single-state 32-bit generator.

use super::RandomSource;

/// Seeded Mulberry32 generator.
///
/// Small, fast, and exactly reproducible: the complete state is one
/// `u32`, which makes save/restore trivial and keeps generation runs
/// bit-identical across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Creates a generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }
}

impl RandomSource for Mulberry32 {
    fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    fn state(&self) -> u32 {
        self.state
    }

    fn restore(&mut self, state: u32) {
        self.state = state;
    }
}
