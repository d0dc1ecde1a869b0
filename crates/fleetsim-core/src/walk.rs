//! Bounded biased random walk for simulated sensor values.
//!
//! [`step`] is a pure function of (kind, current value, draw): the same
//! inputs always produce the same output, which makes the walk fully
//! deterministic given a scripted draw sequence. Randomness enters only
//! through the [`WalkRng`] trait, which abstracts the draw source the
//! same way the decision source is abstracted elsewhere -- a real RNG
//! in production, a scripted stub in tests.

use fleetsim_types::DeviceKind;
use rand::Rng as _;

/// Advance a sensor value by one random-walk step.
///
/// `draw` must be in `[1, 10]`. Per the kind's parameter table, a draw
/// above the up threshold moves the value up by one step while it is
/// below the upper bound; a draw inside the down range moves it down by
/// one step while it is above the lower bound; any other draw leaves
/// the value unchanged. The stepped value is clamped against the bound
/// in the direction of movement, so a step can never carry a value past
/// its hard bound.
pub fn step(kind: DeviceKind, value: f64, draw: u8) -> f64 {
    let p = kind.walk_params();
    if draw > p.up_threshold && value < p.up_bound {
        (value + p.up_step).min(p.up_bound)
    } else if draw >= p.down_lo && draw <= p.down_hi && value > p.down_bound {
        (value - p.down_step).max(p.down_bound)
    } else {
        value
    }
}

/// Source of randomness for the walk.
///
/// Two implementations exist: [`ThreadWalkRng`] backed by [`rand`] for
/// production, and [`ScriptedWalkRng`] for deterministic tests.
pub trait WalkRng: Send {
    /// Draw a uniform integer in `[1, 10]`.
    fn draw(&mut self) -> u8;

    /// Draw a uniform integer from the kind's nominal seed range,
    /// cast to `f64`. Used when a device is registered or when the
    /// scheduler (re)loads the catalog.
    fn seed_value(&mut self, kind: DeviceKind) -> f64;
}

/// Production [`WalkRng`] backed by the thread-local [`rand`] generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadWalkRng;

impl ThreadWalkRng {
    /// Create a new thread-RNG walk source.
    pub const fn new() -> Self {
        Self
    }
}

impl WalkRng for ThreadWalkRng {
    fn draw(&mut self) -> u8 {
        rand::rng().random_range(1..=10)
    }

    fn seed_value(&mut self, kind: DeviceKind) -> f64 {
        let range = kind.seed_range();
        f64::from(rand::rng().random_range(range.lo..=range.hi))
    }
}

/// Deterministic [`WalkRng`] replaying a scripted draw sequence.
///
/// Once the script is exhausted every further draw returns 1, which
/// moves no kind in either direction. Seed values are fixed per call
/// rather than random.
#[derive(Debug, Clone)]
pub struct ScriptedWalkRng {
    draws: std::collections::VecDeque<u8>,
    seed: f64,
}

impl ScriptedWalkRng {
    /// Create a scripted source with the given draw sequence and a
    /// fixed seed value returned for every kind.
    pub fn new(draws: Vec<u8>, seed: f64) -> Self {
        Self {
            draws: draws.into(),
            seed,
        }
    }
}

impl WalkRng for ScriptedWalkRng {
    fn draw(&mut self) -> u8 {
        self.draws.pop_front().unwrap_or(1)
    }

    fn seed_value(&mut self, _kind: DeviceKind) -> f64 {
        self.seed
    }
}
