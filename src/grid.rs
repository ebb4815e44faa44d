// grid.rs — Grid Planner
//
// Grounded on original_source/src/gridbot/core/grid_logic.py's
// `build_grid_candidates`: descend from `base_price` in `grid_step`
// increments until `max_ladders` non-blocked levels have been found (a
// level whose buy already filled and whose TP is still live is TP-blocked
// and doesn't count toward that total, it's just not re-bought — the
// descent keeps going past it to still deliver the requested count). A
// 20,000-iteration safety cap guards against a pathological step/ladder
// combination spinning forever.
use std::collections::HashSet;

use rust_decimal::prelude::*;

const MAX_ITERATIONS: u32 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLevel {
    pub price: Decimal,
    pub blocked: bool,
}

/// Build the full ladder of candidate buy prices below `base_price`,
/// marking which are currently TP-blocked. Keeps descending past blocked
/// levels until `max_ladders` non-blocked levels have been collected, so
/// the ladder always offers the requested number of re-buyable slots.
pub fn build_grid_candidates(
    base_price: Decimal,
    grid_step: Decimal,
    max_ladders: u32,
    tp_blocked_prices: &HashSet<String>,
) -> Vec<GridLevel> {
    let mut levels = Vec::with_capacity(max_ladders as usize);
    let mut unblocked_count = 0u32;
    let mut iterations = 0u32;
    let mut price = base_price - grid_step;
    while unblocked_count < max_ladders && iterations < MAX_ITERATIONS {
        iterations += 1;
        if price <= Decimal::ZERO {
            log::warn!("[GRID] candidate price fell to or below zero, stopping ladder build");
            break;
        }
        let blocked = tp_blocked_prices.contains(&price_key(price));
        if !blocked {
            unblocked_count += 1;
        }
        levels.push(GridLevel { price, blocked });
        price -= grid_step;
    }
    if iterations >= MAX_ITERATIONS {
        log::error!("[GRID] hit {} iteration safety cap building candidates", MAX_ITERATIONS);
    }
    levels
}

/// Canonical string key for a price, used to match against blocked-price
/// sets without floating point surprises.
pub fn price_key(price: Decimal) -> String {
    price.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn builds_descending_ladder_of_requested_length() {
        let levels = build_grid_candidates(dec!(100), dec!(1), 5, &HashSet::new());
        assert_eq!(levels.len(), 5);
        assert_eq!(levels[0].price, dec!(99));
        assert_eq!(levels[4].price, dec!(95));
        assert!(levels.iter().all(|l| !l.blocked));
    }

    #[test]
    fn continues_past_blocked_levels_to_reach_target_unblocked_count() {
        let mut blocked = HashSet::new();
        blocked.insert(price_key(dec!(98)));
        let levels = build_grid_candidates(dec!(100), dec!(1), 3, &blocked);
        // 99, 98(blocked), 97, 96 -> 4 levels needed to find 3 unblocked ones.
        assert_eq!(levels.len(), 4);
        assert!(!levels[0].blocked);
        assert!(levels[1].blocked);
        assert!(!levels[2].blocked);
        assert!(!levels[3].blocked);
        assert_eq!(levels[3].price, dec!(96));
    }

    #[test]
    fn stops_before_going_non_positive() {
        let levels = build_grid_candidates(dec!(2), dec!(1), 10, &HashSet::new());
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, dec!(1));
    }
}
