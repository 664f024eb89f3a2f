#![deny(warnings)]

//! Core domain models and invariants for Tap Tycoon.
//!
//! This crate defines the serializable player snapshot types, the leveling
//! curve, and validation helpers to guarantee basic invariants. Snapshots are
//! plain value types: every transition in `sim-engine` returns a brand new
//! `State`, so the storage layer can persist any snapshot as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Energy cost of a single click.
pub const CLICK_COST_ENERGY: f64 = 1.0;

/// A purchasable upgrade granting passive income, energy regeneration
/// and/or a click bonus. Immutable once owned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Currency cost paid at purchase.
    pub price: f64,
    /// Passive currency accrual contributed by this card, per second.
    pub profit_per_second: f64,
    /// Passive energy regeneration contributed by this card, per second.
    pub energy_per_second: f64,
    /// Currency bonus per click contributed by this card.
    pub profit_per_click: f64,
    /// Instant of acquisition.
    pub own_since: DateTime<Utc>,
}

/// A snapshot of one player's progress, valid as-of `timestamp`.
///
/// The three `*_per_second` / `*_per_click` fields cache the aggregates over
/// `cards` (plus a base contribution of 1 for energy and click). They are
/// recomputed from the card list on every transition, never adjusted
/// incrementally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Instant this snapshot is valid as-of.
    pub timestamp: DateTime<Utc>,
    /// Current action resource, in `[0, max_energy]`.
    pub energy: f64,
    /// Energy capacity; always `1000 * level`.
    pub max_energy: f64,
    /// Spendable currency.
    pub balance: f64,
    /// Lifetime cumulative currency earned; never decreases, drives leveling.
    pub total_earned: f64,
    /// Progression tier derived from `total_earned`; >= 1.
    pub level: u32,
    /// Owned cards in acquisition order. Append-only; duplicates allowed.
    pub cards: Vec<Card>,
    /// Cached aggregate: `1 + sum(card.energy_per_second)`.
    pub energy_per_second: f64,
    /// Cached aggregate: `sum(card.profit_per_second)`.
    pub profit_per_second: f64,
    /// Cached aggregate: `1 + sum(card.profit_per_click)`.
    pub profit_per_click: f64,
}

/// Fresh level-1 snapshot with full energy and no cards.
pub fn create_initial_state(now: DateTime<Utc>) -> State {
    State {
        timestamp: now,
        energy: 1000.0,
        max_energy: 1000.0,
        balance: 0.0,
        total_earned: 0.0,
        level: 1,
        cards: Vec::new(),
        energy_per_second: 1.0,
        profit_per_second: 0.0,
        profit_per_click: 1.0,
    }
}

/// Map lifetime earnings to `(level, earnings threshold for the next level)`.
///
/// The first four levels are fixed 10k bands for fast early progression.
/// From 40k on the curve turns geometric: level `n` requires roughly
/// `2^(3n)` total earnings, so the next threshold is `2^(3 * (level + 1))`.
///
/// Example:
/// assert_eq!(leveling(0.0), (1, 10_000.0));
/// assert_eq!(leveling(15_000.0), (2, 20_000.0));
pub fn leveling(total_earned: f64) -> (u32, f64) {
    if total_earned < 10_000.0 {
        (1, 10_000.0)
    } else if total_earned < 20_000.0 {
        (2, 20_000.0)
    } else if total_earned < 30_000.0 {
        (3, 30_000.0)
    } else if total_earned < 40_000.0 {
        (4, 40_000.0)
    } else {
        let level = (total_earned.log2() / 3.0).round() as u32;
        let threshold = (3 * (level + 1)) as f64;
        (level, threshold.exp2())
    }
}

/// Energy capacity granted at a level.
pub fn max_energy_for_level(level: u32) -> f64 {
    1000.0 * f64::from(level)
}

/// Aggregate energy regeneration rate: base 1 plus all cards.
pub fn energy_rate(cards: &[Card]) -> f64 {
    1.0 + cards.iter().map(|c| c.energy_per_second).sum::<f64>()
}

/// Aggregate passive income rate: sum over all cards (no base income).
pub fn profit_rate(cards: &[Card]) -> f64 {
    cards.iter().map(|c| c.profit_per_second).sum()
}

/// Aggregate per-click earnings: base 1 plus all cards.
pub fn click_rate(cards: &[Card]) -> f64 {
    1.0 + cards.iter().map(|c| c.profit_per_click).sum::<f64>()
}

/// Validation errors for snapshot invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Monetary and energy amounts must be non-negative.
    #[error("negative amount is invalid")]
    NegativeAmount,
    /// Energy must not exceed capacity.
    #[error("energy {energy} exceeds capacity {max_energy}")]
    EnergyOverCapacity { energy: f64, max_energy: f64 },
    /// Level must equal the one derived from total earnings.
    #[error("level {cached} does not match derived level {derived}")]
    LevelMismatch { cached: u32, derived: u32 },
    /// Capacity must equal `1000 * level`.
    #[error("capacity {0} does not match level")]
    CapacityMismatch(f64),
    /// A cached aggregate rate has drifted from the card list.
    #[error("cached rate {0} drifted from cards")]
    RateDrift(&'static str),
}

/// Validate the §3-style snapshot invariants.
///
/// Transitions uphold these by construction; this helper exists for tests
/// and for callers that load snapshots from untrusted storage.
pub fn validate_state(state: &State) -> Result<(), ValidationError> {
    let amounts = [
        state.energy,
        state.max_energy,
        state.balance,
        state.total_earned,
        state.energy_per_second,
        state.profit_per_second,
        state.profit_per_click,
    ];
    if amounts.iter().any(|a| !a.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    if amounts.iter().any(|a| *a < 0.0) {
        return Err(ValidationError::NegativeAmount);
    }
    if state.energy > state.max_energy {
        return Err(ValidationError::EnergyOverCapacity {
            energy: state.energy,
            max_energy: state.max_energy,
        });
    }
    let (derived, _) = leveling(state.total_earned);
    if state.level != derived {
        return Err(ValidationError::LevelMismatch {
            cached: state.level,
            derived,
        });
    }
    if state.max_energy != max_energy_for_level(state.level) {
        return Err(ValidationError::CapacityMismatch(state.max_energy));
    }
    if state.energy_per_second != energy_rate(&state.cards) {
        return Err(ValidationError::RateDrift("energy_per_second"));
    }
    if state.profit_per_second != profit_rate(&state.cards) {
        return Err(ValidationError::RateDrift("profit_per_second"));
    }
    if state.profit_per_click != click_rate(&state.cards) {
        return Err(ValidationError::RateDrift("profit_per_click"));
    }
    Ok(())
}
