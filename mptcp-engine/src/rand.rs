//! Randomness source for per-subflow nonces and, when the script does not
//! pin one, the tool-generated session key.
//!
//! The generator is an explicit field on [`crate::Session`] rather than a
//! global: a host driving several sessions gets one generator per session,
//! and tests can swap in a deterministic source without touching any
//! global state.

/// A source of the 32-bit and 64-bit random values the engine needs:
/// per-subflow nonces (`rand_u32`) and the tool's own MP_CAPABLE key
/// (`rand_u64`).
pub trait RngSource {
    /// Called once, lazily, before the first draw. Implementations that
    /// don't need explicit seeding (e.g. wrapping the OS RNG) may no-op.
    fn seed_once(&mut self) {}

    fn rand_u32(&mut self) -> u32;

    fn rand_u64(&mut self) -> u64;
}

/// Default [`RngSource`] backed by `rand`'s thread-local generator.
#[derive(Debug, Default)]
pub struct ThreadRng {
    seeded: bool,
}

impl RngSource for ThreadRng {
    fn seed_once(&mut self) {
        if !self.seeded {
            // rand::rng() seeds itself from the OS on first use; this just
            // marks the session as having passed that point.
            self.seeded = true;
        }
    }

    fn rand_u32(&mut self) -> u32 {
        self.seed_once();
        rand::random()
    }

    fn rand_u64(&mut self) -> u64 {
        self.seed_once();
        rand::random()
    }
}

/// Deterministic [`RngSource`] for tests: yields a fixed sequence of values
/// so integration scenarios can assert exact output.
#[derive(Debug, Clone)]
pub struct FixedRng {
    u32s: std::collections::VecDeque<u32>,
    u64s: std::collections::VecDeque<u64>,
}

impl FixedRng {
    pub fn new(u32s: impl IntoIterator<Item = u32>, u64s: impl IntoIterator<Item = u64>) -> Self {
        Self { u32s: u32s.into_iter().collect(), u64s: u64s.into_iter().collect() }
    }
}

impl RngSource for FixedRng {
    fn rand_u32(&mut self) -> u32 {
        self.u32s.pop_front().expect("FixedRng exhausted its u32 sequence")
    }

    fn rand_u64(&mut self) -> u64 {
        self.u64s.pop_front().expect("FixedRng exhausted its u64 sequence")
    }
}
