//! Simulation strategy and state types.
//!
//! A [`crate::star::Star`] is parameterized by a [`SimulationStrategy`] that
//! determines how time advances. All strategies execute the same six-phase
//! step; they differ only in the step duration and in how many steps run
//! per `advance()` call.

use crate::fixed::{Fixed64, Seconds, Ticks};

// ---------------------------------------------------------------------------
// Simulation strategy
// ---------------------------------------------------------------------------

/// How a star system advances time. Chosen at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SimulationStrategy {
    /// Single step of `timestep` seconds per `advance()` call, whatever
    /// `dt` is passed. Deterministic by construction.
    Tick { timestep: Seconds },

    /// Real-time mode. `advance(dt)` accumulates elapsed seconds and runs
    /// as many fixed steps as fit, carrying the remainder forward.
    Delta { fixed_timestep: Seconds },
}

impl SimulationStrategy {
    /// Duration of one simulation step.
    pub fn step_duration(&self) -> Seconds {
        match self {
            SimulationStrategy::Tick { timestep } => *timestep,
            SimulationStrategy::Delta { fixed_timestep } => *fixed_timestep,
        }
    }

    /// A strategy only advances time when its step duration is positive.
    pub fn is_valid(&self) -> bool {
        self.step_duration() > Seconds::ZERO
    }
}

impl Default for SimulationStrategy {
    /// One-second ticks.
    fn default() -> Self {
        SimulationStrategy::Tick {
            timestep: Seconds::ONE,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable clock state tracked by the star.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Incremented by 1 for each simulation step.
    pub tick: Ticks,

    /// Simulated seconds since the system was created.
    pub elapsed: Seconds,

    /// Unconsumed time for delta mode. Unused in tick mode.
    pub accumulator: Seconds,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Step results
// ---------------------------------------------------------------------------

/// Counters for a single simulation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The tick this step ran as.
    pub tick: Ticks,
    pub cycles_started: u32,
    pub cycles_completed: u32,
    pub contracts_posted: u32,
    pub contracts_accepted: u32,
    pub contracts_completed: u32,
    pub contracts_failed: u32,
    /// Open contracts no idle employee could take this step.
    pub unmatched_contracts: u32,
}

/// Result of a `Star::advance()` call.
#[derive(Debug, Default)]
pub struct AdvanceResult {
    /// Number of simulation steps actually executed.
    pub steps_run: u64,

    /// One report per executed step, in order.
    pub reports: Vec<StepReport>,
}

impl AdvanceResult {
    pub fn total_completed(&self) -> u32 {
        self.reports.iter().map(|r| r.contracts_completed).sum()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
