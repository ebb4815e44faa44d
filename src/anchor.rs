// anchor.rs — Anchor Controller
//
// Grounded on original_source/src/gridbot/core/utils.py's `align_to_grid`
// (Decimal ROUND_CEILING) and grid_logic.py's `reanchor_up_if_needed`:
// the base price only ever moves up, snapped to the grid step, and only
// once the market has moved at least `trail_trigger_steps` steps above
// the current base.
use rust_decimal::prelude::*;

/// Round `price` up to the nearest multiple of `step` at or above it
/// (ROUND_CEILING).
pub fn align_to_grid(price: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return price;
    }
    let steps = (price / step).ceil();
    steps * step
}

pub struct AnchorController {
    pub grid_step: Decimal,
    pub trail_up: bool,
    pub trail_trigger_steps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReanchorDecision {
    pub new_base: Decimal,
    pub new_low: Decimal,
}

impl AnchorController {
    /// First-ever base price for a fresh session: align the current mid
    /// up to the grid.
    pub fn initial_base(&self, mid: Decimal) -> Decimal {
        align_to_grid(mid, self.grid_step)
    }

    /// Returns Some(decision) if the market has trailed far enough above
    /// the current base to justify moving it up, per `reanchor_up_if_needed`.
    pub fn maybe_reanchor(&self, base_price: Decimal, mid: Decimal, max_ladders: u32) -> Option<ReanchorDecision> {
        if !self.trail_up {
            return None;
        }
        let target_base = align_to_grid(mid, self.grid_step);
        let trigger_distance = self.grid_step * Decimal::from(self.trail_trigger_steps);
        if target_base >= base_price + trigger_distance {
            let new_low = target_base - self.grid_step * Decimal::from(max_ladders);
            Some(ReanchorDecision {
                new_base: target_base,
                new_low,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn controller() -> AnchorController {
        AnchorController {
            grid_step: dec!(1),
            trail_up: true,
            trail_trigger_steps: 1,
        }
    }

    #[test]
    fn align_to_grid_rounds_up_to_step() {
        assert_eq!(align_to_grid(dec!(100.1), dec!(1)), dec!(101));
        assert_eq!(align_to_grid(dec!(100.0), dec!(1)), dec!(100));
    }

    #[test]
    fn initial_base_aligns_mid_up() {
        let c = controller();
        assert_eq!(c.initial_base(dec!(100.4)), dec!(101));
    }

    #[test]
    fn maybe_reanchor_none_when_under_trigger_distance() {
        let c = controller();
        assert!(c.maybe_reanchor(dec!(100), dec!(100.5), 15).is_none());
    }

    #[test]
    fn maybe_reanchor_some_when_trigger_reached() {
        let c = controller();
        let decision = c.maybe_reanchor(dec!(100), dec!(101.2), 15).unwrap();
        assert_eq!(decision.new_base, dec!(102));
        assert_eq!(decision.new_low, dec!(87));
    }

    #[test]
    fn maybe_reanchor_disabled_when_trail_up_false() {
        let mut c = controller();
        c.trail_up = false;
        assert!(c.maybe_reanchor(dec!(100), dec!(200), 15).is_none());
    }
}
