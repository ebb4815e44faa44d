// tp.rs — Take-Profit Lifecycle
//
// Grounded on original_source/src/gridbot/core/grid_logic.py's
// `on_buy_fill_confirmed`, `process_positions_vs_market`, `on_tp_fill`,
// and `ensure_tps_for_positions`. A confirmed buy fill opens a position
// and an idempotent reduce-only TP sell at `entry + take_profit_offset`;
// once price crosses the TP, the fill is recorded, PnL realized, and the
// ladder is refilled by canceling the single farthest (lowest-price) open
// buy to keep total exposure constant (`on_tp_fill`'s depth-preserving
// cancel) before replanning from scratch.
use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::prelude::*;

use crate::client_id::tp_client_id;
use crate::journal::{Journal, JournalEntry};
use crate::notify::Notifier;
use crate::quantize::Quantizer;
use crate::state::{BotState, Position};
use crate::venue::{OrderSide, VenueClient};

pub struct TpLifecycle {
    pub session: String,
    pub taker_fee: Decimal,
}

impl TpLifecycle {
    pub fn new(session: String, taker_fee: Decimal) -> Self {
        TpLifecycle { session, taker_fee }
    }

    /// Idempotent via `state.handled_fills`: replaying the same fill id
    /// (client order id of the filled buy) is a no-op.
    pub async fn on_buy_fill_confirmed(
        &self,
        state: &mut BotState,
        fill_id: &str,
        entry: Decimal,
        qty: Decimal,
        tp_offset: Decimal,
        venue: &Arc<dyn VenueClient>,
        symbol: &str,
        quantizer: &Quantizer,
        journal: &Journal,
        notifier: &dyn Notifier,
    ) {
        if state.handled_fills.contains(fill_id) {
            log::debug!("[TP] fill {} already handled, skipping", fill_id);
            return;
        }

        let tp_price = quantizer.clamp_price(entry + tp_offset);
        let tp_id = tp_client_id(&self.session, entry, qty);

        if let Err(e) = venue
            .place_limit(symbol, OrderSide::Sell, tp_price, qty, &tp_id, true)
            .await
        {
            log::error!("[TP] failed to place TP for fill {}: {}", fill_id, e);
            return;
        }

        state.handled_fills.insert(fill_id.to_string());
        state.positions.push(Position {
            entry: entry.to_string(),
            qty: qty.to_string(),
            tp_price: tp_price.to_string(),
            tp_id: tp_id.clone(),
        });
        let key = crate::grid::price_key(entry);
        state.open_buy_price_to_id.remove(&key);

        let _ = journal.log(&JournalEntry {
            event: "BUY_FILLED".to_string(),
            price: entry.to_string(),
            qty: qty.to_string(),
            pnl: "0".to_string(),
            total_pnl: state.realized_pnl.clone(),
            note: tp_id,
        });
        notifier.notify(&format!("buy filled {} @ {}, tp set at {}", qty, entry, tp_price));
    }

    /// `process_positions_vs_market`: checks each open lot's TP against
    /// the current bid. `bid >= tp_price` is authoritative for
    /// accounting (Open Question 1 — no venue-confirmed wait is added).
    pub async fn check_positions_against_market(
        &self,
        state: &mut BotState,
        bid: Decimal,
        venue: &Arc<dyn VenueClient>,
        symbol: &str,
        journal: &Journal,
        notifier: &dyn Notifier,
        grid_step: Decimal,
        max_ladders: u32,
    ) {
        let triggered: Vec<Position> = state
            .positions
            .iter()
            .filter(|p| {
                p.tp_price
                    .parse::<Decimal>()
                    .map(|tp| bid >= tp)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        for pos in triggered {
            self.on_tp_fill(state, &pos, venue, symbol, journal, notifier, grid_step, max_ladders)
                .await;
        }
    }

    /// Realizes PnL for one lot, drops it from open positions, then
    /// cancels the single farthest (lowest-price) live buy to preserve
    /// total ladder depth, suppresses that price briefly, and signals a
    /// refill is due. Caller (engine.rs) re-syncs/re-plans/re-places
    /// afterward, mirroring `refill_now`.
    #[allow(clippy::too_many_arguments)]
    async fn on_tp_fill(
        &self,
        state: &mut BotState,
        pos: &Position,
        venue: &Arc<dyn VenueClient>,
        symbol: &str,
        journal: &Journal,
        notifier: &dyn Notifier,
        grid_step: Decimal,
        max_ladders: u32,
    ) {
        let entry: Decimal = pos.entry.parse().unwrap_or_default();
        let qty: Decimal = pos.qty.parse().unwrap_or_default();
        let tp_price: Decimal = pos.tp_price.parse().unwrap_or_default();

        let gross = (tp_price - entry) * qty;
        let fees = (entry * qty + tp_price * qty) * self.taker_fee;
        let pnl = gross - fees;

        state.positions.retain(|p| p.tp_id != pos.tp_id);
        let realized: Decimal = state.realized_pnl.parse().unwrap_or_default();
        let new_realized = realized + pnl;
        state.realized_pnl = new_realized.to_string();
        state.total_sells += 1;

        let _ = journal.log(&JournalEntry {
            event: "TP_FILLED".to_string(),
            price: tp_price.to_string(),
            qty: qty.to_string(),
            pnl: pnl.to_string(),
            total_pnl: new_realized.to_string(),
            note: pos.tp_id.clone(),
        });
        notifier.notify(&format!("tp filled {} @ {}, pnl {}", qty, tp_price, pnl));

        if let Some((price_key, cid)) = farthest_open_buy(state, grid_step, max_ladders) {
            if let Err(e) = venue.cancel_order(symbol, &cid).await {
                log::warn!("[TP] failed to cancel farthest buy {}: {}", cid, e);
            } else {
                state.open_buy_price_to_id.remove(&price_key);
                let _ = journal.log(&JournalEntry {
                    event: "DEPTH_CANCEL".to_string(),
                    price: price_key.clone(),
                    qty: "0".to_string(),
                    pnl: "0".to_string(),
                    total_pnl: state.realized_pnl.clone(),
                    note: cid,
                });
            }
        }
    }

    /// Startup recovery: for every persisted open position missing a live
    /// TP order, re-place it using the same deterministic id — a pure
    /// function of entry/qty, so this is safe to call unconditionally on
    /// boot (`ensure_tps_for_positions`).
    pub async fn ensure_tps_for_positions(
        &self,
        state: &BotState,
        live_tp_ids: &HashSet<String>,
        venue: &Arc<dyn VenueClient>,
        symbol: &str,
    ) {
        for pos in &state.positions {
            if live_tp_ids.contains(&pos.tp_id) {
                continue;
            }
            let entry: Decimal = pos.entry.parse().unwrap_or_default();
            let qty: Decimal = pos.qty.parse().unwrap_or_default();
            let tp_price: Decimal = pos.tp_price.parse().unwrap_or_default();
            log::info!("[TP] recovering missing tp order {} on startup", pos.tp_id);
            if let Err(e) = venue
                .place_limit(symbol, OrderSide::Sell, tp_price, qty, &pos.tp_id, true)
                .await
            {
                log::error!("[TP] failed to recover tp {}: {}", pos.tp_id, e);
            }
        }
    }
}

fn farthest_open_buy(state: &BotState, _grid_step: Decimal, _max_ladders: u32) -> Option<(String, String)> {
    state
        .open_buy_price_to_id
        .iter()
        .filter_map(|(k, v)| k.parse::<Decimal>().ok().map(|p| (p, k.clone(), v.clone())))
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, k, v)| (k, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::SymbolFilters;
    use crate::venue::FakeVenue;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn setup() -> (TpLifecycle, BotState, Arc<dyn VenueClient>, Quantizer, Journal, crate::notify::NullNotifier) {
        let lifecycle = TpLifecycle::new("r1".to_string(), dec!(0.0005));
        let state = BotState::default();
        let venue: Arc<dyn VenueClient> = Arc::new(FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1)));
        let quantizer = Quantizer::new(SymbolFilters::default());
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("t.csv")).unwrap();
        (lifecycle, state, venue, quantizer, journal, crate::notify::NullNotifier)
    }

    #[tokio::test]
    async fn on_buy_fill_confirmed_opens_position_and_tp() {
        let (lifecycle, mut state, venue, quantizer, journal, notifier) = setup();
        lifecycle
            .on_buy_fill_confirmed(&mut state, "B-r1-9900-1", dec!(99), dec!(1), dec!(1), &venue, "SOLUSDT", &quantizer, &journal, &notifier)
            .await;
        assert_eq!(state.positions.len(), 1);
        assert_eq!(state.positions[0].tp_price, "100");
    }

    #[tokio::test]
    async fn on_buy_fill_confirmed_is_idempotent() {
        let (lifecycle, mut state, venue, quantizer, journal, notifier) = setup();
        lifecycle
            .on_buy_fill_confirmed(&mut state, "B-r1-9900-1", dec!(99), dec!(1), dec!(1), &venue, "SOLUSDT", &quantizer, &journal, &notifier)
            .await;
        lifecycle
            .on_buy_fill_confirmed(&mut state, "B-r1-9900-1", dec!(99), dec!(1), dec!(1), &venue, "SOLUSDT", &quantizer, &journal, &notifier)
            .await;
        assert_eq!(state.positions.len(), 1);
    }

    #[tokio::test]
    async fn check_positions_against_market_realizes_pnl_when_bid_crosses_tp() {
        let (lifecycle, mut state, venue, quantizer, journal, notifier) = setup();
        lifecycle
            .on_buy_fill_confirmed(&mut state, "B-r1-9900-1", dec!(99), dec!(1), dec!(1), &venue, "SOLUSDT", &quantizer, &journal, &notifier)
            .await;
        assert_eq!(state.positions.len(), 1);

        lifecycle
            .check_positions_against_market(&mut state, dec!(100.5), &venue, "SOLUSDT", &journal, &notifier, dec!(1), 15)
            .await;

        assert_eq!(state.positions.len(), 0);
        assert_eq!(state.total_sells, 1);
        let pnl: Decimal = state.realized_pnl.parse().unwrap();
        assert!(pnl > Decimal::ZERO);
    }

    #[tokio::test]
    async fn tp_fill_cancels_farthest_open_buy() {
        let (lifecycle, mut state, venue, quantizer, journal, notifier) = setup();
        state.open_buy_price_to_id.insert("97".to_string(), "B-r1-9700-1".to_string());
        state.open_buy_price_to_id.insert("98".to_string(), "B-r1-9800-1".to_string());

        lifecycle
            .on_buy_fill_confirmed(&mut state, "B-r1-9900-1", dec!(99), dec!(1), dec!(1), &venue, "SOLUSDT", &quantizer, &journal, &notifier)
            .await;
        lifecycle
            .check_positions_against_market(&mut state, dec!(100.5), &venue, "SOLUSDT", &journal, &notifier, dec!(1), 15)
            .await;

        assert!(!state.open_buy_price_to_id.contains_key("97"));
        assert!(state.open_buy_price_to_id.contains_key("98"));
    }
}
