// config.rs — Engine configuration
//
// Loads from environment (.env via dotenvy, same as the base engine) with
// a `clap` CLI layer on top for the handful of knobs an operator wants to
// flip without touching the environment. Every env var in the spec gets a
// documented default; unparseable values log a warning and fall back
// rather than panicking.
use clap::Parser;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySide {
    LongOnly,
    ShortOnly,
}

impl StrategySide {
    fn parse(raw: &str, default: StrategySide) -> StrategySide {
        match raw.to_uppercase().as_str() {
            "LONG_ONLY" | "LONG" => StrategySide::LongOnly,
            "SHORT_ONLY" | "SHORT" => StrategySide::ShortOnly,
            other => {
                log::warn!("[CONFIG] unrecognized STRATEGY_SIDE={:?}, defaulting", other);
                default
            }
        }
    }
}

/// CLI surface (spec §6): symbol, grid step, TP offset, max ladders,
/// spacing/quantity, polling interval, state path, qty per order, dry-run
/// toggle (default on), testnet toggle, `--confirm-live`.
#[derive(Parser, Debug, Clone)]
#[command(name = "grid-engine-rs", about = "Grid trading engine for perpetual futures")]
pub struct Cli {
    #[arg(long)]
    pub symbol: Option<String>,
    #[arg(long)]
    pub grid_step: Option<f64>,
    #[arg(long)]
    pub take_profit_offset: Option<f64>,
    #[arg(long)]
    pub max_ladders: Option<u32>,
    #[arg(long)]
    pub qty_per_ladder: Option<f64>,
    #[arg(long)]
    pub price_refresh_sec: Option<f64>,
    #[arg(long)]
    pub state_file: Option<String>,
    /// Dry-run is the default; pass --live to disable it.
    #[arg(long)]
    pub live: bool,
    #[arg(long)]
    pub testnet: bool,
    /// Required alongside --live to actually issue real orders.
    #[arg(long)]
    pub confirm_live: bool,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Trading parameters
    pub symbol: String,
    pub grid_step: f64,
    pub take_profit_offset: f64,
    pub max_ladders: u32,
    pub qty_per_ladder: f64,
    pub max_spread_bps: f64,
    pub max_open_trades: u32,
    pub margin_mode: String,
    pub strategy_side: StrategySide,

    // API & environment
    pub api_key: String,
    pub api_secret: String,
    pub use_testnet: bool,
    pub dry_run: bool,
    pub confirm_live: bool,

    // Fees & budget
    pub taker_fee: f64,
    pub max_daily_notional: f64,
    pub auto_fee: bool,

    // State & logging
    pub csv_file: String,
    pub state_file: String,
    pub session_tag_env: String,
    pub debug_verbose: bool,

    // Cooldowns & refill
    pub duplicate_cooldown_sec: f64,
    pub instant_tp_refill: bool,
    pub suppress_after_cancel_sec: f64,
    pub suppress_on_unknown_sec: f64,
    pub pending_lock_max_sec: f64,

    // Trailing
    pub trail_up: bool,
    pub trail_trigger_steps: u32,
    pub trail_max_cancel_per_reanchor: u32,

    // Price refresh
    pub price_refresh_sec: f64,

    // Notifications
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,

    // Derived
    pub futures_http_base: String,
}

fn parse_bool(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => true,
            "0" | "false" | "no" | "n" => false,
            _ => {
                log::warn!("[CONFIG] invalid bool for {}={:?}, defaulting to {}", var, v, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_f64(var: &str, default: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            log::warn!("[CONFIG] invalid float for {}={:?}, defaulting to {}", var, v, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_u32(var: &str, default: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            log::warn!("[CONFIG] invalid int for {}={:?}, defaulting to {}", var, v, default);
            default
        }),
        Err(_) => default,
    }
}

impl EngineConfig {
    pub fn load(cli: &Cli) -> EngineConfig {
        let use_testnet = cli.testnet || parse_bool("USE_TESTNET", false);
        let futures_http_base = if use_testnet {
            "https://testnet.binancefuture.com".to_string()
        } else {
            "https://fapi.binance.com".to_string()
        };

        EngineConfig {
            symbol: cli
                .symbol
                .clone()
                .unwrap_or_else(|| env::var("SYMBOL").unwrap_or_else(|_| "SOLUSDT".to_string()))
                .to_uppercase(),
            grid_step: cli.grid_step.unwrap_or_else(|| parse_f64("GRID_STEP_USD", 1.0)),
            take_profit_offset: cli
                .take_profit_offset
                .unwrap_or_else(|| parse_f64("TAKE_PROFIT_USD", 1.0)),
            max_ladders: cli.max_ladders.unwrap_or_else(|| parse_u32("MAX_LADDERS", 15)),
            qty_per_ladder: cli
                .qty_per_ladder
                .unwrap_or_else(|| parse_f64("QTY_PER_LADDER", 1.0)),
            max_spread_bps: parse_f64("MAX_SPREAD_BPS", 8.0),
            max_open_trades: parse_u32("MAX_OPEN_TRADES", 20),
            margin_mode: env::var("MARGIN_MODE").unwrap_or_else(|_| "CROSSED".to_string()).to_uppercase(),
            strategy_side: StrategySide::parse(
                &env::var("STRATEGY_SIDE").unwrap_or_else(|_| "LONG_ONLY".to_string()),
                StrategySide::LongOnly,
            ),

            api_key: env::var("BINANCE_API_KEY").unwrap_or_default(),
            api_secret: env::var("BINANCE_API_SECRET").unwrap_or_default(),
            use_testnet,
            dry_run: !cli.live && parse_bool("DRY_RUN", true),
            confirm_live: cli.confirm_live,

            taker_fee: parse_f64("TAKER_FEE", 0.0005),
            max_daily_notional: parse_f64("MAX_DAILY_USDT", 10_000.0),
            auto_fee: parse_bool("AUTO_FEE", false),

            csv_file: env::var("CSV_FILE").unwrap_or_else(|_| "trades.csv".to_string()),
            state_file: cli
                .state_file
                .clone()
                .unwrap_or_else(|| env::var("STATE_FILE").unwrap_or_else(|_| "bot_state.json".to_string())),
            session_tag_env: env::var("SESSION_TAG").unwrap_or_default(),
            debug_verbose: parse_bool("DEBUG_VERBOSE", true),

            duplicate_cooldown_sec: parse_f64("DUPLICATE_COOLDOWN_SEC", 90.0),
            instant_tp_refill: parse_bool("INSTANT_TP_REFILL", false),
            suppress_after_cancel_sec: parse_f64("SUPPRESS_SEC_AFTER_CANCEL", 8.0),
            suppress_on_unknown_sec: parse_f64("SUPPRESS_SEC_ON_UNKNOWN", 3.0),
            pending_lock_max_sec: parse_f64("PENDING_LOCK_MAX_SEC", 3.0),

            trail_up: parse_bool("TRAIL_UP", true),
            trail_trigger_steps: parse_u32("TRAIL_TRIGGER_STEPS", 1).max(1),
            trail_max_cancel_per_reanchor: parse_u32("TRAIL_MAX_CANCEL_PER_REANCHOR", 100),

            price_refresh_sec: cli
                .price_refresh_sec
                .unwrap_or_else(|| parse_f64("PRICE_REFRESH_SEC", 0.5)),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),

            futures_http_base,
        }
    }

    /// Fatal per spec §7: missing credentials while live and not dry-run.
    pub fn validate_for_live(&self) -> Result<(), crate::errors::EngineError> {
        if !self.dry_run {
            if self.api_key.is_empty() || self.api_secret.is_empty() {
                return Err(crate::errors::EngineError::MissingCredentials);
            }
            if !self.confirm_live {
                return Err(crate::errors::EngineError::Config(
                    "live mode requires --confirm-live".to_string(),
                ));
            }
        }
        Ok(())
    }
}
