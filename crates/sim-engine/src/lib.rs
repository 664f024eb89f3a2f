#![deny(warnings)]

//! Pure state transitions for Tap Tycoon.
//!
//! Every function here takes a snapshot plus a caller-supplied `now` and
//! returns a brand new snapshot. The engine never reads the system clock,
//! performs no I/O, and never mutates its inputs, so identical
//! `(state, now)` pairs always produce identical outputs and independent
//! players can be processed in parallel without coordination.
//!
//! The two action functions reject on insufficient resources by returning
//! the input state unchanged; there are no engine-level errors.

use chrono::{DateTime, Duration, Utc};
use sim_core::{
    click_rate, energy_rate, leveling, max_energy_for_level, profit_rate, Card, State,
    CLICK_COST_ENERGY,
};
use tracing::debug;

/// Whole seconds elapsed between two instants, truncated toward zero.
///
/// This is the engine's single quantization point: sub-second remainders are
/// dropped on every call, so repeated fine-grained advances lose fractional
/// seconds cumulatively. A fractional accrual model would replace this
/// function without touching its call sites.
pub fn elapsed_whole_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds()
}

/// Project a snapshot forward to `now` in a single step.
///
/// Energy and currency accrue linearly at the snapshot's current rates over
/// the whole interval, then level, capacity and the cached rates are
/// re-derived. Accrued energy is capped at the pre-advance capacity; a
/// level-up inside the interval raises capacity for later calls only. Rate
/// changes at level boundaries within the interval are likewise not applied
/// mid-flight; use [`time_travel_iterative`] for jumps that may cross them.
///
/// Requires `now >= state.timestamp`; an earlier `now` yields negative
/// elapsed seconds and unspecified (though non-panicking) results.
pub fn time_travel(state: &State, now: DateTime<Utc>) -> State {
    let seconds = elapsed_whole_seconds(state.timestamp, now) as f64;

    let earned = seconds * state.profit_per_second;
    let new_total_earned = state.total_earned + earned;
    let new_balance = state.balance + earned;
    let (new_level, _) = leveling(new_total_earned);

    let new_energy = (state.energy + seconds * state.energy_per_second).min(state.max_energy);

    State {
        timestamp: now,
        energy: new_energy,
        max_energy: max_energy_for_level(new_level),
        balance: new_balance,
        total_earned: new_total_earned,
        level: new_level,
        cards: state.cards.clone(),
        energy_per_second: energy_rate(&state.cards),
        profit_per_second: profit_rate(&state.cards),
        profit_per_click: click_rate(&state.cards),
    }
}

/// Seconds of passive income until the next level-up threshold is reached,
/// or `None` when the snapshot has no passive income at all.
///
/// Measured against `balance`, matching the established pacing behavior:
/// a snapshot whose balance trails its lifetime earnings (money was spent)
/// reports a proportionally longer wait.
pub fn seconds_to_next_levelup(state: &State) -> Option<i64> {
    if state.profit_per_second == 0.0 {
        return None;
    }
    let (_, threshold) = leveling(state.total_earned);
    Some(((threshold - state.balance) / state.profit_per_second).round() as i64)
}

/// Project a snapshot forward to `now`, honoring every level-up on the way.
///
/// Repeatedly applies [`time_travel`] in sub-steps bounded by the next
/// level-up, so capacity and rate changes at each crossed threshold take
/// effect before further accrual. Zero-length sub-steps are stretched to one
/// second to guarantee progress.
pub fn time_travel_iterative(state: &State, now: DateTime<Utc>) -> State {
    let mut s = state.clone();
    while s.timestamp < now {
        let Some(to_next) = seconds_to_next_levelup(&s) else {
            // No passive income: no threshold can be crossed, one hop suffices.
            return time_travel(&s, now);
        };
        let remaining = elapsed_whole_seconds(s.timestamp, now);
        if remaining < 1 {
            // Sub-second tail; pins the timestamp to `now` with zero accrual.
            return time_travel(&s, now);
        }
        let step = to_next.clamp(1, remaining);
        debug!(step, level = s.level, "sub-step advance");
        s = time_travel(&s, s.timestamp + Duration::seconds(step));
    }
    s
}

/// Spend one energy to earn `profit_per_click`, advancing time to `now`
/// first (single-step).
///
/// The click credit uses the pre-advance rate, and the lifetime total is
/// credited on top of the pre-advance total. A level-up caused by the click
/// refills energy to the enlarged capacity. When energy is insufficient the
/// click is a no-op: the input state is returned unchanged, timestamp
/// included.
pub fn click(state: &State, now: DateTime<Utc>) -> State {
    let advanced = time_travel(state, now);

    let new_balance = advanced.balance + state.profit_per_click;
    let new_total_earned = state.total_earned + state.profit_per_click;

    let (new_level, _) = leveling(new_total_earned);
    let new_max_energy = max_energy_for_level(new_level);

    let mut new_energy = advanced.energy - CLICK_COST_ENERGY;
    if new_level > state.level {
        new_energy = new_max_energy;
    }
    if new_energy < 0.0 {
        debug!(energy = advanced.energy, "click rejected: not enough energy");
        return state.clone();
    }
    if new_energy > new_max_energy {
        new_energy = new_max_energy;
    }

    State {
        timestamp: now,
        energy: new_energy,
        max_energy: new_max_energy,
        balance: new_balance,
        total_earned: new_total_earned,
        level: new_level,
        cards: advanced.cards,
        energy_per_second: advanced.energy_per_second,
        profit_per_second: advanced.profit_per_second,
        profit_per_click: advanced.profit_per_click,
    }
}

/// Buy a card: deduct its price and append it with `own_since = now`.
///
/// Does not advance time; the purchase is judged against the snapshot's
/// current balance as-is. When the balance is insufficient the purchase is a
/// no-op and the input state is returned unchanged. The passed-in template
/// is not consumed, so callers can reuse one definition for repeat
/// purchases.
pub fn buy_card(state: &State, now: DateTime<Utc>, card: &Card) -> State {
    let new_balance = state.balance - card.price;
    if new_balance < 0.0 {
        debug!(
            price = card.price,
            balance = state.balance,
            "purchase rejected: not enough balance"
        );
        return state.clone();
    }

    let mut cards = state.cards.clone();
    cards.push(Card {
        own_since: now,
        ..card.clone()
    });

    let energy_per_second = energy_rate(&cards);
    let profit_per_second = profit_rate(&cards);
    let profit_per_click = click_rate(&cards);

    State {
        timestamp: now,
        energy: state.energy,
        max_energy: state.max_energy,
        balance: new_balance,
        total_earned: state.total_earned,
        level: state.level,
        cards,
        energy_per_second,
        profit_per_second,
        profit_per_click,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use sim_core::{create_initial_state, validate_state};

    fn day_one() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 22, 0, 0, 0).unwrap()
    }

    fn one_year_later() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 22, 0, 0, 0).unwrap()
    }

    fn standard_card() -> Card {
        Card {
            price: 100.0,
            profit_per_second: 4.0,
            energy_per_second: 1.0,
            profit_per_click: 1.0,
            own_since: day_one(),
        }
    }

    #[test]
    fn ten_clicks() {
        let mut state = create_initial_state(day_one());
        for _ in 0..10 {
            state = click(&state, day_one());
        }
        assert_eq!(state.balance, 10.0);
        assert_eq!(state.energy, 990.0);
        validate_state(&state).unwrap();
    }

    #[test]
    fn energy_restores_after_depletion() {
        let mut state = create_initial_state(day_one());
        for _ in 0..1000 {
            state = click(&state, day_one());
        }
        assert_eq!(state.energy, 0.0);

        let five_later = day_one() + Duration::seconds(5);
        let state = click(&state, five_later);
        assert_eq!(state.balance, 1001.0);
        assert_eq!(state.energy, 4.0);
    }

    #[test]
    fn time_travel_without_cards_only_moves_the_clock() {
        let initial = create_initial_state(day_one());
        let future = time_travel(&initial, one_year_later());

        assert_eq!(future.balance, initial.balance);
        assert_eq!(future.energy, initial.energy);
        assert_eq!(future.level, initial.level);
        assert_eq!(future.total_earned, initial.total_earned);
        assert_eq!(future.cards, initial.cards);
        assert_eq!(future.energy_per_second, initial.energy_per_second);
        assert_eq!(future.profit_per_second, initial.profit_per_second);
        assert_eq!(future.profit_per_click, initial.profit_per_click);
        assert_eq!(future.timestamp, one_year_later());
    }

    #[test]
    fn time_travel_is_idempotent_at_zero_elapsed() {
        let mut state = create_initial_state(day_one());
        state.balance = 1000.0;
        let state = buy_card(&state, day_one(), &standard_card());
        assert_eq!(time_travel(&state, state.timestamp), state);
    }

    #[test]
    fn buying_a_card_deducts_and_reprices() {
        let mut initial = create_initial_state(day_one());
        initial.balance = 1000.0;
        let state = buy_card(&initial, initial.timestamp, &standard_card());

        assert_eq!(state.balance, 900.0);
        assert_eq!(state.energy, 1000.0);
        assert_eq!(state.profit_per_second, 4.0);
        assert_eq!(state.cards.len(), 1);
        assert_eq!(state.cards[0].own_since, initial.timestamp);
        validate_state(&state).unwrap();
    }

    #[test]
    fn buy_card_is_rejected_whole_when_unaffordable() {
        let initial = create_initial_state(day_one());
        let later = day_one() + Duration::seconds(60);
        let state = buy_card(&initial, later, &standard_card());
        assert_eq!(state, initial);
    }

    #[test]
    fn click_is_rejected_whole_when_out_of_energy() {
        let mut state = create_initial_state(day_one());
        state.energy = 0.0;
        let later = day_one() + Duration::milliseconds(200);
        let after = click(&state, later);
        assert_eq!(after, state);
    }

    #[test]
    fn click_levelup_refills_to_new_capacity() {
        let mut state = create_initial_state(day_one());
        state.balance = 9_999.0;
        state.total_earned = 9_999.0;
        state.energy = 500.0;
        let state = click(&state, day_one());

        assert_eq!(state.level, 2);
        assert_eq!(state.max_energy, 2000.0);
        assert_eq!(state.energy, 2000.0);
        assert_eq!(state.total_earned, 10_000.0);
        validate_state(&state).unwrap();
    }

    #[test]
    fn seconds_to_levelup_without_income_is_none() {
        let initial = create_initial_state(day_one());
        assert_eq!(seconds_to_next_levelup(&initial), None);
    }

    #[test]
    fn seconds_to_levelup_counts_from_balance() {
        let mut initial = create_initial_state(day_one());
        initial.balance = 1000.0;
        initial.total_earned = 1000.0;
        let state = buy_card(&initial, initial.timestamp, &standard_card());

        assert_eq!(state.total_earned, 1000.0);
        // 9100 still to earn at 4/s, measured against the post-purchase balance
        assert_eq!(seconds_to_next_levelup(&state), Some(2275));
    }

    #[test]
    fn year_of_passive_income() {
        let mut initial = create_initial_state(day_one());
        initial.balance = 1000.0;
        let state = buy_card(&initial, initial.timestamp, &standard_card());
        assert_eq!(state.profit_per_second, 4.0);

        let future = time_travel_iterative(&state, one_year_later());
        assert_eq!(future.balance, 126_144_900.0);
        assert_eq!(future.timestamp, one_year_later());
        validate_state(&future).unwrap();
    }

    #[test]
    fn iterative_travel_applies_each_levelup_in_order() {
        let mut initial = create_initial_state(day_one());
        initial.balance = 1000.0;
        let state = buy_card(&initial, initial.timestamp, &standard_card());

        let future = time_travel_iterative(&state, one_year_later());
        let (derived, _) = leveling(future.total_earned);
        assert_eq!(future.level, derived);
        assert_eq!(future.max_energy, max_energy_for_level(future.level));
        assert!(future.level > state.level);
    }

    proptest! {
        #[test]
        fn advance_preserves_invariants(
            seconds in 0i64..10_000_000,
            pps in 0.0f64..100.0,
            eps in 0.0f64..100.0,
            ppc in 0.0f64..100.0,
        ) {
            let mut initial = create_initial_state(day_one());
            initial.balance = 50.0;
            let card = Card {
                price: 50.0,
                profit_per_second: pps,
                energy_per_second: eps,
                profit_per_click: ppc,
                own_since: day_one(),
            };
            let state = buy_card(&initial, day_one(), &card);
            let future = time_travel(&state, day_one() + Duration::seconds(seconds));
            prop_assert!(validate_state(&future).is_ok());
            prop_assert!(future.total_earned >= state.total_earned);
            prop_assert!(future.energy >= 0.0 && future.energy <= future.max_energy);
        }

        #[test]
        fn iterative_advance_lands_on_target(
            seconds in 1i64..50_000_000,
            pps in 0.1f64..50.0,
        ) {
            let mut initial = create_initial_state(day_one());
            initial.balance = 10.0;
            let card = Card {
                price: 10.0,
                profit_per_second: pps,
                energy_per_second: 0.5,
                profit_per_click: 0.0,
                own_since: day_one(),
            };
            let state = buy_card(&initial, day_one(), &card);
            let target = day_one() + Duration::seconds(seconds);
            let future = time_travel_iterative(&state, target);
            prop_assert_eq!(future.timestamp, target);
            prop_assert!(validate_state(&future).is_ok());
            prop_assert!(future.total_earned >= state.total_earned);
        }

        #[test]
        fn click_spree_never_overdraws(clicks in 0u32..1500) {
            let mut state = create_initial_state(day_one());
            for _ in 0..clicks {
                state = click(&state, day_one());
            }
            let expected = f64::from(clicks.min(1000));
            prop_assert_eq!(state.balance, expected);
            prop_assert_eq!(state.energy, 1000.0 - expected);
            prop_assert!(validate_state(&state).is_ok());
        }
    }
}
