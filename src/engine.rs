// engine.rs — processor: the sole owner of engine state
//
// Grounded on original_source's `__main__.py` wiring order and
// grid_logic.py's tick sequence, reshaped around the base engine's
// concurrency idiom (`MmExecutionEngine` owning `InternalInventory` by
// value, mutated only from the single task that holds it). Each pass:
// maybe reanchor -> detect/classify vanished buys against the prior
// snapshot -> sync open orders from the fresh snapshot -> spread guard ->
// plan grid -> place missing buys -> match TP fills against the tick ->
// persist.
use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::prelude::*;
use tokio::sync::mpsc;

use crate::anchor::AnchorController;
use crate::client_id::sanitize_tag;
use crate::config::EngineConfig;
use crate::grid::build_grid_candidates;
use crate::journal::{Journal, JournalEntry};
use crate::notify::Notifier;
use crate::placement::{tp_blocked_price_keys, PlacementController};
use crate::quantize::{Quantizer, SymbolFilters};
use crate::reconciler::{FillReconciler, VanishOutcome};
use crate::shutdown::{cancel_all_open_buys, ShutdownCoordinator};
use crate::state::{BotState, StateStore};
use crate::tp::TpLifecycle;
use crate::venue::{BookTicker, VenueClient};

pub struct Engine {
    pub config: EngineConfig,
    pub session: String,
    pub state: BotState,
    pub state_store: StateStore,
    pub venue: Arc<dyn VenueClient>,
    pub quantizer: Quantizer,
    pub anchor: AnchorController,
    pub placement: PlacementController,
    pub reconciler: FillReconciler,
    pub tp: TpLifecycle,
    pub journal: Journal,
    pub notifier: Box<dyn Notifier>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        filters: SymbolFilters,
        venue: Arc<dyn VenueClient>,
        journal: Journal,
        notifier: Box<dyn Notifier>,
    ) -> std::io::Result<Self> {
        let session = sanitize_tag(
            &config.session_tag_env,
            &format!("r{}", chrono::Utc::now().timestamp() % 100_000),
            16,
        );
        let state_store = StateStore::new(&config.state_file);
        let state = state_store.load()?;

        let grid_step = Decimal::from_f64(config.grid_step).unwrap_or(Decimal::ONE);
        let max_daily = Decimal::from_f64(config.max_daily_notional).unwrap_or(Decimal::ZERO);
        let qty_per_ladder = Decimal::from_f64(config.qty_per_ladder).unwrap_or(Decimal::ONE);
        let taker_fee = Decimal::from_f64(config.taker_fee).unwrap_or_default();

        Ok(Engine {
            anchor: AnchorController {
                grid_step,
                trail_up: config.trail_up,
                trail_trigger_steps: config.trail_trigger_steps,
            },
            placement: PlacementController::new(
                session.clone(),
                config.duplicate_cooldown_sec,
                config.pending_lock_max_sec,
                config.suppress_after_cancel_sec,
                config.suppress_on_unknown_sec,
                config.max_open_trades,
                config.max_ladders,
                max_daily,
                qty_per_ladder,
            ),
            reconciler: FillReconciler::new(session.clone(), config.instant_tp_refill, 2.0),
            tp: TpLifecycle::new(session.clone(), taker_fee),
            quantizer: Quantizer::new(filters),
            session,
            config,
            state,
            state_store,
            venue,
            journal,
            notifier,
        })
    }

    async fn persist(&self) {
        if let Err(e) = self.state_store.save(&self.state) {
            log::error!("[ENGINE] failed to persist state: {}", e);
        }
    }

    /// Startup recovery pass: sync live orders, reconcile any position
    /// missing a live TP.
    pub async fn recover_on_startup(&mut self) {
        self.state.roll_daily_budget_if_needed();
        let live = self.venue.open_orders(&self.config.symbol).await.unwrap_or_default();
        self.reconciler.sync_open_from_exchange(&mut self.state, &live);

        let live_tp_ids: HashSet<String> = live
            .iter()
            .filter(|o| o.side == crate::venue::OrderSide::Sell && o.reduce_only)
            .map(|o| o.client_order_id.clone())
            .collect();
        self.tp
            .ensure_tps_for_positions(&self.state, &live_tp_ids, &self.venue, &self.config.symbol)
            .await;

        if self.state.base_price == "0" {
            if let Ok(tick) = self.venue.book_ticker(&self.config.symbol).await {
                let base = self.anchor.initial_base(tick.mid());
                self.state.base_price = base.to_string();
                log::info!("[ENGINE] initialized base_price={}", base);
            }
        }
        self.persist().await;
    }

    /// One full tick: Anchor -> Reconciler(fill detect against prior
    /// snapshot) -> Reconciler(sync) -> spread guard -> Planner ->
    /// Placement -> TP match -> persist.
    pub async fn process_tick(&mut self, tick: BookTicker) {
        let base_price: Decimal = self.state.base_price.parse().unwrap_or_default();
        let symbol = self.config.symbol.clone();

        if let Some(decision) = self
            .anchor
            .maybe_reanchor(base_price, tick.mid(), self.config.max_ladders)
        {
            self.reanchor_up(decision).await;
        }

        let live = self.venue.open_orders(&symbol).await.unwrap_or_default();

        // Detect vanished buys against the prior tick's snapshot before
        // `sync_open_from_exchange` rebuilds it from `live` — otherwise every
        // cid we're tracking already matches `live` and nothing ever vanishes.
        self.detect_and_process_fills(&live).await;

        self.reconciler.sync_open_from_exchange(&mut self.state, &live);

        let max_spread = Decimal::from_f64(self.config.max_spread_bps).unwrap_or(Decimal::ZERO);
        if tick.spread_bps() > max_spread {
            log::warn!(
                "[ENGINE] spread {} bps exceeds max {} bps, skipping placement/tp matching this tick",
                tick.spread_bps(),
                max_spread
            );
            self.persist().await;
            return;
        }

        let base_price: Decimal = self.state.base_price.parse().unwrap_or_default();
        let blocked = tp_blocked_price_keys(&self.state.positions);
        let levels = build_grid_candidates(base_price, self.anchor.grid_step, self.config.max_ladders, &blocked);

        let open_positions = self.state.positions.len() as u32;
        self.placement
            .place_missing_buys(
                &mut self.state,
                &levels,
                &self.venue,
                &symbol,
                &self.quantizer,
                &self.journal,
                self.notifier.as_ref(),
                false,
                open_positions,
            )
            .await;

        self.tp
            .check_positions_against_market(
                &mut self.state,
                tick.bid,
                &self.venue,
                &symbol,
                &self.journal,
                self.notifier.as_ref(),
                self.anchor.grid_step,
                self.config.max_ladders,
            )
            .await;

        self.persist().await;
    }

    async fn detect_and_process_fills(&mut self, live: &[crate::venue::OpenOrder]) {
        let vanished = self.reconciler.detect_vanished(&self.state, live);
        let expected_qty = Decimal::from_f64(self.config.qty_per_ladder).unwrap_or(Decimal::ONE);
        for (price_key, client_order_id) in vanished {
            let outcome = self
                .reconciler
                .confirm_vanished(&self.venue, &self.config.symbol, &price_key, &client_order_id, expected_qty)
                .await;
            match outcome {
                VanishOutcome::Filled => {
                    let entry: Decimal = match price_key.parse() {
                        Ok(p) => p,
                        Err(_) => continue,
                    };
                    let qty = Decimal::from_f64(self.config.qty_per_ladder).unwrap_or(Decimal::ONE);
                    let tp_offset = Decimal::from_f64(self.config.take_profit_offset).unwrap_or(Decimal::ONE);
                    self.tp
                        .on_buy_fill_confirmed(
                            &mut self.state,
                            &client_order_id,
                            entry,
                            qty,
                            tp_offset,
                            &self.venue,
                            &self.config.symbol,
                            &self.quantizer,
                            &self.journal,
                            self.notifier.as_ref(),
                        )
                        .await;
                }
                VanishOutcome::CanceledOrExpiredOrRejected => {
                    self.state.open_buy_price_to_id.remove(&price_key);
                    self.placement
                        .suppress_price(&price_key, self.config.suppress_after_cancel_sec);
                    let _ = self.journal.log(&JournalEntry {
                        event: "BUY_CANCELED".to_string(),
                        price: price_key.clone(),
                        qty: "0".to_string(),
                        pnl: "0".to_string(),
                        total_pnl: self.state.realized_pnl.clone(),
                        note: client_order_id.clone(),
                    });
                }
                VanishOutcome::Unknown => {
                    self.placement
                        .suppress_price(&price_key, self.config.suppress_on_unknown_sec);
                }
                VanishOutcome::StillLive => {}
            }
        }
    }

    async fn reanchor_up(&mut self, decision: crate::anchor::ReanchorDecision) {
        let mut cancelled = 0u32;
        let to_cancel: Vec<(String, String)> = self
            .state
            .open_buy_price_to_id
            .iter()
            .filter_map(|(k, v)| k.parse::<Decimal>().ok().map(|p| (p, k.clone(), v.clone())))
            .filter(|(p, _, _)| *p < decision.new_low)
            .map(|(_, k, v)| (k, v))
            .collect();

        for (price_key, cid) in to_cancel {
            if cancelled >= self.config.trail_max_cancel_per_reanchor {
                break;
            }
            if self.venue.cancel_order(&self.config.symbol, &cid).await.is_ok() {
                self.state.open_buy_price_to_id.remove(&price_key);
                self.placement
                    .suppress_price(&price_key, self.config.suppress_after_cancel_sec);
                cancelled += 1;
            }
        }

        self.state.base_price = decision.new_base.to_string();
        let _ = self.journal.log(&JournalEntry {
            event: "REANCHOR_UP".to_string(),
            price: decision.new_base.to_string(),
            qty: "0".to_string(),
            pnl: "0".to_string(),
            total_pnl: self.state.realized_pnl.clone(),
            note: format!("cancelled {} stale buys", cancelled),
        });
        self.notifier
            .notify(&format!("reanchored up to {}", decision.new_base));
    }

    pub async fn shutdown(&self) {
        cancel_all_open_buys(&self.state, &self.venue, &self.config.symbol).await;
        self.persist().await;
    }
}

/// Drives ticks from the price feed channel until shutdown is triggered.
pub async fn run(mut engine: Engine, mut ticks: mpsc::Receiver<BookTicker>, shutdown: Arc<ShutdownCoordinator>) {
    engine.recover_on_startup().await;
    loop {
        if shutdown.is_triggered() {
            log::info!("[ENGINE] shutdown triggered, halting placement and flushing state");
            engine.state.halt_placement = true;
            engine.shutdown().await;
            break;
        }
        match tokio::time::timeout(std::time::Duration::from_millis(500), ticks.recv()).await {
            Ok(Some(tick)) => engine.process_tick(tick).await,
            Ok(None) => {
                log::warn!("[ENGINE] price feed closed, shutting down");
                engine.shutdown().await;
                break;
            }
            Err(_) => continue,
        }
    }
}
