// src/services/availability.rs

//! Open-seat inference from the notes cell of an enrollment row.

use std::sync::{LazyLock, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use crate::models::AvailabilityConfig;

/// `<used>/<total>`, e.g. "12/20" or "12 / 20".
static SEAT_RATIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s?/\s?(\d+)").expect("seat ratio pattern is valid"));

/// Marker the catalog uses on sections without visible capacity.
const FULL_MARKER: &str = "Full";

/// Random source for rows whose notes hide the real capacity.
///
/// The catalog prints "Full" (or nothing) instead of a count on some rows.
/// Those rows are reported as one open seat with a small fixed chance and as
/// zero otherwise. The RNG is injectable so runs can be made reproducible.
pub struct SeatSampler {
    hidden_seat_percent: u8,
    rng: Mutex<StdRng>,
}

impl SeatSampler {
    /// Create a sampler; `seed` fixes the RNG, `None` seeds from entropy.
    pub fn new(hidden_seat_percent: u8, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            hidden_seat_percent: hidden_seat_percent.min(100),
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(config: &AvailabilityConfig) -> Self {
        Self::new(config.hidden_seat_percent, config.seed)
    }

    /// Draw 1 with `hidden_seat_percent`% probability, else 0.
    pub fn sample_hidden(&self) -> u32 {
        let roll: u8 = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_range(1..=100);
        u32::from(roll <= self.hidden_seat_percent)
    }

    /// Infer the open seat count for a notes cell.
    pub fn infer(&self, notes: &str) -> u32 {
        if notes.is_empty() || notes.contains(FULL_MARKER) {
            return self.sample_hidden();
        }
        seat_total(notes).unwrap_or(0)
    }
}

impl Default for SeatSampler {
    fn default() -> Self {
        Self::from_config(&AvailabilityConfig::default())
    }
}

/// Total from the first `<used>/<total>` pair in `notes`.
fn seat_total(notes: &str) -> Option<u32> {
    SEAT_RATIO
        .captures(notes)
        .and_then(|caps| caps.get(1))
        .and_then(|total| total.as_str().parse().ok())
}
