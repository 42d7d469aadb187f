use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ROULETTE_PRIZES, ROULETTE_HEAVY_WEIGHT, ROULETTE_HEAVY_WEIGHT_CEILING};

/// One spin of the roulette and the prize it paid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinRecord {
    pub user_id: u64,
    pub prize: Decimal,
    /// Unix timestamp
    pub spun_at: i64,
    pub is_approved: bool,
}

/// Staff-managed prize list, e.g. "100,200,500,1000"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouletteSettings {
    pub prizes: Option<String>,
}

/// Prize list expanded by weight: a prize appears once per unit of weight,
/// so a uniform pick over `slots` is the weighted draw
#[derive(Debug, Clone, PartialEq)]
pub struct PrizeTable {
    slots: Vec<i64>,
}

impl PrizeTable {
    /// Build the table from the configured prize list
    ///
    /// Entries that are not plain non-negative integers are ignored. Prizes
    /// up to 1000 get weight 3, larger ones weight 1. With nothing usable
    /// configured, the default prizes are drawn uniformly.
    pub fn from_settings(prizes: Option<&str>) -> Self {
        let configured: Vec<i64> = prizes
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|p| p.parse().ok())
            .collect();

        if configured.is_empty() {
            return Self::default_prizes();
        }

        let mut slots = Vec::new();
        for prize in configured {
            let weight = if prize <= ROULETTE_HEAVY_WEIGHT_CEILING {
                ROULETTE_HEAVY_WEIGHT
            } else {
                1
            };
            slots.extend(std::iter::repeat_n(prize, weight));
        }

        Self { slots }
    }

    pub fn default_prizes() -> Self {
        Self {
            slots: DEFAULT_ROULETTE_PRIZES.to_vec(),
        }
    }

    /// Distinct prizes, in configuration order
    pub fn prizes(&self) -> Vec<i64> {
        let mut prizes: Vec<i64> = Vec::new();
        for &prize in &self.slots {
            if !prizes.contains(&prize) {
                prizes.push(prize);
            }
        }
        prizes
    }

    /// How many slots a prize occupies
    pub fn weight_of(&self, prize: i64) -> usize {
        self.slots.iter().filter(|&&p| p == prize).count()
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        if self.slots.is_empty() {
            return DEFAULT_ROULETTE_PRIZES[0];
        }
        self.slots[rng.gen_range(0..self.slots.len())]
    }
}
