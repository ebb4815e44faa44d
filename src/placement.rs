// placement.rs — Placement Controller
//
// Grounded on original_source/src/gridbot/core/grid_logic.py's
// `_allowed_new_buys_now` and `place_missing_buys`: capacity is
// `min(max_open_trades - (positions + open_buys), max_ladders - open_buys)`,
// and every candidate level must clear a guard chain (already open,
// TP-blocked, price-suppressed, pending-lock, persistent cooldown, daily
// budget) before a buy is actually submitted. Anti-duplication is layered:
// an in-memory suppress map and pending-submission lock guard the hot
// path, a persisted `recent_submissions` cooldown guards across restarts.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::prelude::*;

use crate::client_id::buy_client_id;
use crate::grid::GridLevel;
use crate::journal::{Journal, JournalEntry};
use crate::notify::Notifier;
use crate::quantize::Quantizer;
use crate::state::BotState;
use crate::venue::{OrderSide, VenueClient};

pub struct PlacementController {
    pub session: String,
    pub duplicate_cooldown_sec: f64,
    pub pending_lock_max_sec: f64,
    pub suppress_after_cancel_sec: f64,
    pub suppress_on_unknown_sec: f64,
    pub max_open_trades: u32,
    pub max_ladders: u32,
    pub max_daily_notional: Decimal,
    pub qty_per_ladder: Decimal,

    suppress_until: HashMap<String, Instant>,
    pending_submissions: HashMap<String, Instant>,
    nonce: std::sync::atomic::AtomicU64,
}

impl PlacementController {
    pub fn new(
        session: String,
        duplicate_cooldown_sec: f64,
        pending_lock_max_sec: f64,
        suppress_after_cancel_sec: f64,
        suppress_on_unknown_sec: f64,
        max_open_trades: u32,
        max_ladders: u32,
        max_daily_notional: Decimal,
        qty_per_ladder: Decimal,
    ) -> Self {
        PlacementController {
            session,
            duplicate_cooldown_sec,
            pending_lock_max_sec,
            suppress_after_cancel_sec,
            suppress_on_unknown_sec,
            max_open_trades,
            max_ladders,
            max_daily_notional,
            qty_per_ladder,
            suppress_until: HashMap::new(),
            pending_submissions: HashMap::new(),
            nonce: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub fn suppress_price(&mut self, price_key: &str, seconds: f64) {
        self.suppress_until
            .insert(price_key.to_string(), Instant::now() + Duration::from_secs_f64(seconds.max(0.0)));
    }

    fn is_suppressed(&self, price_key: &str) -> bool {
        self.suppress_until
            .get(price_key)
            .map(|until| Instant::now() < *until)
            .unwrap_or(false)
    }

    fn prune_stale_pending(&mut self) {
        let max_age = Duration::from_secs_f64(self.pending_lock_max_sec.max(0.1));
        self.pending_submissions.retain(|_, t| t.elapsed() < max_age);
    }

    /// `_allowed_new_buys_now`: how many new buys may be placed this pass.
    pub fn capacity(&self, open_positions: u32, open_buys: u32) -> u32 {
        let by_open_trades = self.max_open_trades.saturating_sub(open_positions + open_buys);
        let by_ladders = self.max_ladders.saturating_sub(open_buys);
        by_open_trades.min(by_ladders)
    }

    fn persistent_cooldown_hit(&self, state: &BotState, price_key: &str) -> bool {
        if let Some(last_ts) = state.recent_submissions.get(price_key) {
            let now = chrono::Utc::now().timestamp();
            return (now - *last_ts) < self.duplicate_cooldown_sec as i64;
        }
        false
    }

    /// Places missing buys for the given candidate levels, respecting the
    /// full guard chain. `ignore_recent` bypasses the persisted cooldown —
    /// used by `refill_now` right after a TP fill, matching the Python's
    /// `place_missing_buys(ignore_recent=True)` call site.
    #[allow(clippy::too_many_arguments)]
    pub async fn place_missing_buys(
        &mut self,
        state: &mut BotState,
        levels: &[GridLevel],
        venue: &Arc<dyn VenueClient>,
        symbol: &str,
        quantizer: &Quantizer,
        journal: &Journal,
        notifier: &dyn Notifier,
        ignore_recent: bool,
        open_positions: u32,
    ) {
        if state.halt_placement {
            log::debug!("[PLACEMENT] halted, skipping");
            return;
        }
        self.prune_stale_pending();

        let open_buys = state.open_buy_price_to_id.len() as u32;
        let mut slots = self.capacity(open_positions, open_buys);
        if slots == 0 {
            return;
        }

        for level in levels {
            if slots == 0 {
                break;
            }
            let key = crate::grid::price_key(level.price);

            if level.blocked {
                continue;
            }
            if state.open_buy_price_to_id.contains_key(&key) {
                continue;
            }
            if self.is_suppressed(&key) {
                continue;
            }
            if self.pending_submissions.contains_key(&key) {
                continue;
            }
            if !ignore_recent && self.persistent_cooldown_hit(state, &key) {
                continue;
            }

            let qty = quantizer.ensure_min_notional(level.price, self.qty_per_ladder);
            if qty.is_zero() {
                log::warn!("[PLACEMENT] qty quantized to zero at price {}, skipping", level.price);
                continue;
            }
            let notional = level.price * qty;

            let today_spent: Decimal = state.spent_today.parse().unwrap_or(Decimal::ZERO);
            if today_spent + notional > self.max_daily_notional {
                log::info!("[PLACEMENT] daily cap reached, skipping further buys this pass");
                let _ = journal.log(&JournalEntry {
                    event: "DAILY_CAP_SKIP".to_string(),
                    price: level.price.to_string(),
                    qty: qty.to_string(),
                    pnl: "0".to_string(),
                    total_pnl: state.realized_pnl.clone(),
                    note: "daily notional cap reached".to_string(),
                });
                break;
            }

            self.pending_submissions.insert(key.clone(), Instant::now());
            let nonce = self.nonce.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let cid = buy_client_id(&self.session, level.price, nonce);

            match venue
                .place_limit(symbol, OrderSide::Buy, level.price, qty, &cid, false)
                .await
            {
                Ok(()) => {
                    state.open_buy_price_to_id.insert(key.clone(), cid.clone());
                    state.recent_submissions.insert(key.clone(), chrono::Utc::now().timestamp());
                    state.total_buys += 1;
                    state.spent_today = (today_spent + notional).to_string();
                    let _ = journal.log(&JournalEntry {
                        event: "BUY_PLACED".to_string(),
                        price: level.price.to_string(),
                        qty: qty.to_string(),
                        pnl: "0".to_string(),
                        total_pnl: state.realized_pnl.clone(),
                        note: cid.clone(),
                    });
                    notifier.notify(&format!("buy placed {} @ {}", qty, level.price));
                    slots -= 1;
                }
                Err(e) => {
                    log::warn!("[PLACEMENT] place_limit failed at {}: {}", level.price, e);
                }
            }
            self.pending_submissions.remove(&key);
        }
    }
}

/// TP-blocked price set is derived, not persisted: every open position's
/// entry price is blocked until its TP fills (`tp_blocked_entries` in the
/// Python original).
pub fn tp_blocked_price_keys(positions: &[crate::state::Position]) -> HashSet<String> {
    positions
        .iter()
        .filter_map(|p| p.entry.parse::<Decimal>().ok())
        .map(crate::grid::price_key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::notify::NullNotifier;
    use crate::quantize::SymbolFilters;
    use crate::venue::FakeVenue;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn controller() -> PlacementController {
        PlacementController::new(
            "r1".to_string(),
            90.0,
            3.0,
            8.0,
            3.0,
            20,
            15,
            dec!(10000),
            dec!(1),
        )
    }

    #[test]
    fn capacity_is_min_of_open_trades_and_ladders() {
        let c = controller();
        assert_eq!(c.capacity(2, 3), 12); // 20-(2+3)=15, 15-3=12 -> min is 12
    }

    #[tokio::test]
    async fn places_buys_for_unblocked_unsuppressed_levels() {
        let mut c = controller();
        let mut state = BotState::default();
        let venue: Arc<dyn VenueClient> = Arc::new(FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1)));
        let quantizer = Quantizer::new(SymbolFilters::default());
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("t.csv")).unwrap();
        let notifier = NullNotifier;

        let levels = crate::grid::build_grid_candidates(dec!(100), dec!(1), 3, &HashSet::new());
        c.place_missing_buys(&mut state, &levels, &venue, "SOLUSDT", &quantizer, &journal, &notifier, false, 0)
            .await;

        assert_eq!(state.open_buy_price_to_id.len(), 3);
        assert_eq!(state.total_buys, 3);
    }

    #[tokio::test]
    async fn suppressed_price_is_skipped() {
        let mut c = controller();
        c.suppress_price(&crate::grid::price_key(dec!(99)), 30.0);
        let mut state = BotState::default();
        let venue: Arc<dyn VenueClient> = Arc::new(FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1)));
        let quantizer = Quantizer::new(SymbolFilters::default());
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("t.csv")).unwrap();
        let notifier = NullNotifier;

        let levels = crate::grid::build_grid_candidates(dec!(100), dec!(1), 1, &HashSet::new());
        c.place_missing_buys(&mut state, &levels, &venue, "SOLUSDT", &quantizer, &journal, &notifier, false, 0)
            .await;

        assert_eq!(state.open_buy_price_to_id.len(), 0);
    }

    #[tokio::test]
    async fn persistent_cooldown_blocks_resubmission_unless_ignored() {
        let mut c = controller();
        let mut state = BotState::default();
        state
            .recent_submissions
            .insert(crate::grid::price_key(dec!(99)), chrono::Utc::now().timestamp());
        let venue: Arc<dyn VenueClient> = Arc::new(FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1)));
        let quantizer = Quantizer::new(SymbolFilters::default());
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("t.csv")).unwrap();
        let notifier = NullNotifier;

        let levels = crate::grid::build_grid_candidates(dec!(100), dec!(1), 1, &HashSet::new());
        c.place_missing_buys(&mut state, &levels, &venue, "SOLUSDT", &quantizer, &journal, &notifier, false, 0)
            .await;
        assert_eq!(state.open_buy_price_to_id.len(), 0);

        c.place_missing_buys(&mut state, &levels, &venue, "SOLUSDT", &quantizer, &journal, &notifier, true, 0)
            .await;
        assert_eq!(state.open_buy_price_to_id.len(), 1);
    }
}
