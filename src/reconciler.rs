// reconciler.rs — Fill Reconciler
//
// Grounded on original_source/src/gridbot/core/grid_logic.py's
// `sync_open_from_exchange_full`, `detect_filled_buys_and_restore`, and
// `confirm_and_process_vanished`. A buy "vanishes" when it no longer
// appears in the venue's live open-orders snapshot; what happened to it
// (filled, canceled, expired, rejected, or genuinely unknown) is resolved
// either instantly via a status query or after a short debounce window,
// per `INSTANT_TP_REFILL`.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::prelude::*;

use crate::client_id::is_ours;
use crate::state::BotState;
use crate::venue::{OrderStatus, OrderStatusReport, VenueClient};

#[derive(Debug, Clone, PartialEq)]
pub enum VanishOutcome {
    Filled,
    CanceledOrExpiredOrRejected,
    Unknown,
    StillLive,
}

pub struct FillReconciler {
    pub session: String,
    pub instant_tp_refill: bool,
    pub debounce_sec: f64,
    suspected_filled: HashMap<String, Instant>,
}

impl FillReconciler {
    pub fn new(session: String, instant_tp_refill: bool, debounce_sec: f64) -> Self {
        FillReconciler {
            session,
            instant_tp_refill,
            debounce_sec,
            suspected_filled: HashMap::new(),
        }
    }

    /// Rebuild `open_buy_price_to_id` from the venue's live snapshot,
    /// keeping only orders that belong to this session
    /// (`sync_open_from_exchange_full`).
    pub fn sync_open_from_exchange(&self, state: &mut BotState, live_orders: &[crate::venue::OpenOrder]) {
        let mut rebuilt = HashMap::new();
        for o in live_orders {
            if o.side != crate::venue::OrderSide::Buy || o.reduce_only {
                continue;
            }
            if !is_ours(&o.client_order_id, &self.session) {
                continue;
            }
            if matches!(o.status, OrderStatus::New | OrderStatus::PartiallyFilled) {
                rebuilt.insert(crate::grid::price_key(o.price), o.client_order_id.clone());
            }
        }
        state.open_buy_price_to_id = rebuilt;
    }

    /// Which of the buys we believe are open no longer show up in the live
    /// snapshot (`detect_filled_buys_and_restore`'s vanished set).
    pub fn detect_vanished(
        &self,
        state: &BotState,
        live_orders: &[crate::venue::OpenOrder],
    ) -> Vec<(String, String)> {
        let live_ids: HashSet<&str> = live_orders
            .iter()
            .filter(|o| o.side == crate::venue::OrderSide::Buy && !o.reduce_only)
            .filter(|o| matches!(o.status, OrderStatus::New | OrderStatus::PartiallyFilled))
            .map(|o| o.client_order_id.as_str())
            .collect();

        state
            .open_buy_price_to_id
            .iter()
            .filter(|(_, cid)| !live_ids.contains(cid.as_str()))
            .map(|(price_key, cid)| (price_key.clone(), cid.clone()))
            .collect()
    }

    /// Resolve one vanished buy to an outcome, applying the debounce
    /// policy when `instant_tp_refill` is false: the first observation
    /// starts a timer; only once `debounce_sec` has elapsed do we query
    /// the venue and classify.
    pub async fn confirm_vanished(
        &mut self,
        venue: &Arc<dyn VenueClient>,
        symbol: &str,
        price_key: &str,
        client_order_id: &str,
        expected_qty: Decimal,
    ) -> VanishOutcome {
        if !self.instant_tp_refill {
            let now = Instant::now();
            let first_seen = *self
                .suspected_filled
                .entry(price_key.to_string())
                .or_insert(now);
            if now.duration_since(first_seen) < Duration::from_secs_f64(self.debounce_sec) {
                return VanishOutcome::StillLive;
            }
        }

        let report = venue.query_order(symbol, client_order_id).await.unwrap_or(OrderStatusReport {
            status: OrderStatus::Unknown,
            executed_qty: Decimal::ZERO,
        });
        self.suspected_filled.remove(price_key);

        match report.status {
            OrderStatus::Filled => {
                if expected_qty > Decimal::ZERO && report.executed_qty < expected_qty * Decimal::new(999, 3) {
                    VanishOutcome::Unknown
                } else {
                    VanishOutcome::Filled
                }
            }
            OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Rejected => {
                VanishOutcome::CanceledOrExpiredOrRejected
            }
            OrderStatus::NotFound => VanishOutcome::Unknown,
            OrderStatus::New | OrderStatus::PartiallyFilled => VanishOutcome::StillLive,
            OrderStatus::Unknown => VanishOutcome::Unknown,
        }
    }

    pub fn clear_suspected(&mut self, price_key: &str) {
        self.suspected_filled.remove(price_key);
    }
}

pub fn price_from_key(key: &str) -> Option<Decimal> {
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::SymbolFilters;
    use crate::venue::{FakeVenue, OrderSide};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn detect_vanished_finds_missing_buy() {
        let reconciler = FillReconciler::new("r1".to_string(), true, 2.0);
        let mut state = BotState::default();
        state.open_buy_price_to_id.insert("99".to_string(), "B-r1-9900-1".to_string());

        let vanished = reconciler.detect_vanished(&state, &[]);
        assert_eq!(vanished.len(), 1);
        assert_eq!(vanished[0].0, "99");
    }

    #[tokio::test]
    async fn confirm_vanished_instant_classifies_filled() {
        let fake = FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1));
        fake.place_limit("SOLUSDT", OrderSide::Buy, dec!(99), dec!(1), "B-r1-9900-1", false)
            .await
            .unwrap();
        fake.fill_order("B-r1-9900-1");
        let fake: Arc<dyn VenueClient> = Arc::new(fake);

        let mut reconciler = FillReconciler::new("r1".to_string(), true, 2.0);
        let outcome = reconciler
            .confirm_vanished(&fake, "SOLUSDT", "99", "B-r1-9900-1", dec!(1))
            .await;
        assert_eq!(outcome, VanishOutcome::Filled);
    }

    #[tokio::test]
    async fn confirm_vanished_instant_treats_partial_fill_as_unknown() {
        let fake = FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1));
        fake.place_limit("SOLUSDT", OrderSide::Buy, dec!(99), dec!(1), "B-r1-9900-1", false)
            .await
            .unwrap();
        fake.fill_order_partial("B-r1-9900-1", dec!(0.5));
        let fake: Arc<dyn VenueClient> = Arc::new(fake);

        let mut reconciler = FillReconciler::new("r1".to_string(), true, 2.0);
        let outcome = reconciler
            .confirm_vanished(&fake, "SOLUSDT", "99", "B-r1-9900-1", dec!(1))
            .await;
        assert_eq!(outcome, VanishOutcome::Unknown);
    }

    #[tokio::test]
    async fn confirm_vanished_instant_treats_not_found_as_unknown() {
        let fake = FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1));
        let fake: Arc<dyn VenueClient> = Arc::new(fake);

        let mut reconciler = FillReconciler::new("r1".to_string(), true, 2.0);
        let outcome = reconciler
            .confirm_vanished(&fake, "SOLUSDT", "99", "B-r1-9900-1", dec!(1))
            .await;
        assert_eq!(outcome, VanishOutcome::Unknown);
    }

    #[tokio::test]
    async fn confirm_vanished_debounces_when_not_instant() {
        let fake = FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1));
        fake.place_limit("SOLUSDT", OrderSide::Buy, dec!(99), dec!(1), "B-r1-9900-1", false)
            .await
            .unwrap();
        fake.fill_order("B-r1-9900-1");
        let fake: Arc<dyn VenueClient> = Arc::new(fake);

        let mut reconciler = FillReconciler::new("r1".to_string(), false, 2.0);
        let first = reconciler
            .confirm_vanished(&fake, "SOLUSDT", "99", "B-r1-9900-1", dec!(1))
            .await;
        assert_eq!(first, VanishOutcome::StillLive);
    }
}
