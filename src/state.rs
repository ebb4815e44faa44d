// state.rs — durable engine state
//
// Grounded on original_source/src/gridbot/state/manager.py: `BotState`,
// `Position`, `save_state` (temp file + fsync + atomic rename), and
// `load_state` (empty-file and corrupt-file quarantine, daily spend
// rollover). Replaces the base engine's `persistence.rs`, which wrote
// state with a plain `fs::write` and is not crash-safe — the spec requires
// atomic durability (§4.2), so this module does not reuse that file's
// approach, only its surrounding shape (plain struct + load/save pair).
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub entry: String, // decimal string, exact on round-trip
    pub qty: String,
    pub tp_price: String,
    pub tp_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotState {
    pub base_price: String,
    pub positions: Vec<Position>,
    pub realized_pnl: String,
    pub total_buys: u64,
    pub total_sells: u64,
    pub spent_today: String,
    pub spent_date: String,
    pub open_buy_price_to_id: HashMap<String, String>,
    pub handled_fills: HashSet<String>,
    pub recent_submissions: HashMap<String, i64>,
    pub halt_placement: bool,
}

impl Default for BotState {
    fn default() -> Self {
        BotState {
            base_price: "0".to_string(),
            positions: Vec::new(),
            realized_pnl: "0".to_string(),
            total_buys: 0,
            total_sells: 0,
            spent_today: "0".to_string(),
            spent_date: Utc::now().date_naive().to_string(),
            open_buy_price_to_id: HashMap::new(),
            handled_fills: HashSet::new(),
            recent_submissions: HashMap::new(),
            halt_placement: false,
        }
    }
}

impl BotState {
    /// Reset the daily spend counter if the calendar day has rolled over
    /// since the last persisted state (utils.py's date-comparison in
    /// `load_state`).
    pub fn roll_daily_budget_if_needed(&mut self) {
        let today = Utc::now().date_naive().to_string();
        if self.spent_date != today {
            log::info!(
                "[STATE] daily budget rollover: {} -> {}",
                self.spent_date,
                today
            );
            self.spent_date = today;
            self.spent_today = "0".to_string();
        }
    }
}

pub struct StateStore {
    path: std::path::PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        StateStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write-temp-then-rename-then-fsync, matching `save_state` in the
    /// Python original exactly.
    pub fn save(&self, state: &BotState) -> std::io::Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(state)?;
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(body.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Load state, quarantining empty or corrupt files the way
    /// `load_state` does (`.json.empty.bak` / `.json.corrupt.bak`) rather
    /// than failing the whole process.
    pub fn load(&self) -> std::io::Result<BotState> {
        if !self.path.exists() {
            log::info!("[STATE] no state file at {:?}, starting fresh", self.path);
            return Ok(BotState::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            let backup = self.quarantine_suffix("empty");
            log::warn!("[STATE] state file empty, quarantining to {:?}", backup);
            let _ = fs::rename(&self.path, &backup);
            return Ok(BotState::default());
        }

        match serde_json::from_str::<BotState>(&raw) {
            Ok(mut state) => {
                state.roll_daily_budget_if_needed();
                Ok(state)
            }
            Err(e) => {
                let backup = self.quarantine_suffix("corrupt");
                log::error!(
                    "[STATE] state file corrupt ({}), quarantining to {:?}",
                    e,
                    backup
                );
                let _ = fs::rename(&self.path, &backup);
                Ok(BotState::default())
            }
        }
    }

    fn quarantine_suffix(&self, kind: &str) -> std::path::PathBuf {
        let ts = Utc::now().format("%Y%m%dT%H%M%S");
        self.path.with_extension(format!("json.{}.{}.bak", kind, ts))
    }
}

/// `today`-in-terms-of is exposed separately so the Anchor/Placement
/// controllers don't need to re-derive it.
pub fn today_str() -> String {
    Utc::now().date_naive().to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);
        let mut state = BotState::default();
        state.base_price = "100.50".to_string();
        state.total_buys = 3;
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.base_price, "100.50");
        assert_eq!(loaded.total_buys, 3);
    }

    #[test]
    fn missing_file_yields_default_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let store = StateStore::new(&path);
        let state = store.load().unwrap();
        assert_eq!(state.base_price, "0");
    }

    #[test]
    fn corrupt_file_is_quarantined_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let store = StateStore::new(&path);
        let state = store.load().unwrap();
        assert_eq!(state.base_price, "0");
        assert!(!path.exists());
    }

    #[test]
    fn empty_file_is_quarantined_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "").unwrap();
        let store = StateStore::new(&path);
        let state = store.load().unwrap();
        assert_eq!(state.base_price, "0");
        assert!(!path.exists());
    }

    #[test]
    fn stale_spend_date_rolls_over_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);
        let mut state = BotState::default();
        state.spent_date = "2000-01-01".to_string();
        state.spent_today = "500".to_string();
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_ne!(loaded.spent_date, "2000-01-01");
        assert_eq!(loaded.spent_today, "0");
    }
}
