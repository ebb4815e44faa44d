// quantize.rs — price/quantity rounding to venue filters
//
// Grounded on original_source/src/gridbot/core/utils.py (`format_step`,
// Decimal ROUND_DOWN) and broker/binance_connector.py (`clamp_price`,
// `clamp_qty`). Uses `rust_decimal` rather than f64 — the spec requires
// exact decimal semantics for price/qty arithmetic, something f64 cannot
// give; the base engine itself uses raw f64 throughout, but that's exactly
// the part of its idiom this spec overrides (grounded instead on
// `guribe94-bog`'s workspace, which reaches for `rust_decimal` in the same
// role).
use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;

#[derive(Debug, Clone, Copy)]
pub struct SymbolFilters {
    pub tick_size: Decimal,
    pub step_size: Decimal,
    pub min_qty: Decimal,
    pub min_notional: Decimal,
}

impl Default for SymbolFilters {
    fn default() -> Self {
        SymbolFilters {
            tick_size: Decimal::new(1, 2),    // 0.01
            step_size: Decimal::new(1, 3),    // 0.001
            min_qty: Decimal::new(1, 3),      // 0.001
            min_notional: Decimal::new(5, 0), // 5
        }
    }
}

fn round_down_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    let steps = (value / step).floor();
    (steps * step).round_dp_with_strategy(step.scale().max(8), RoundingStrategy::ToZero)
}

pub struct Quantizer {
    pub filters: SymbolFilters,
}

impl Quantizer {
    pub fn new(filters: SymbolFilters) -> Self {
        Quantizer { filters }
    }

    /// Round a price down to the venue's tick size.
    pub fn clamp_price(&self, price: Decimal) -> Decimal {
        round_down_to_step(price, self.filters.tick_size)
    }

    /// Round a quantity down to the venue's step size, enforcing min_qty.
    pub fn clamp_qty(&self, qty: Decimal) -> Decimal {
        let q = round_down_to_step(qty, self.filters.step_size);
        if q < self.filters.min_qty {
            Decimal::ZERO
        } else {
            q
        }
    }

    /// If notional (price*qty) is below min_notional, bump qty up by one
    /// step at a time until it clears the floor (mirrors binance_connector.py's
    /// limit_buy re-quantization on the buy side only).
    pub fn ensure_min_notional(&self, price: Decimal, qty: Decimal) -> Decimal {
        let mut q = qty;
        let mut guard = 0;
        while price * q < self.filters.min_notional && guard < 10_000 {
            q += self.filters.step_size;
            guard += 1;
        }
        self.clamp_qty(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn filters() -> SymbolFilters {
        SymbolFilters {
            tick_size: dec!(0.01),
            step_size: dec!(0.001),
            min_qty: dec!(0.001),
            min_notional: dec!(5),
        }
    }

    #[test]
    fn clamp_price_rounds_down_to_tick() {
        let q = Quantizer::new(filters());
        assert_eq!(q.clamp_price(dec!(123.4567)), dec!(123.45));
    }

    #[test]
    fn clamp_qty_below_min_qty_is_zero() {
        let q = Quantizer::new(filters());
        assert_eq!(q.clamp_qty(dec!(0.0005)), dec!(0));
    }

    #[test]
    fn ensure_min_notional_bumps_qty_up() {
        let q = Quantizer::new(filters());
        let qty = q.ensure_min_notional(dec!(100), dec!(0.01));
        assert!(dec!(100) * qty >= dec!(5));
    }
}
