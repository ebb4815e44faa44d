// main.rs — wiring: load config, build venue + engine, spawn tasks, run
//
// Shape grounded on the base engine's main.rs: dotenvy + env_logger init,
// build a venue client behind a trait object depending on a run mode
// (there: shadow vs live Hyperliquid; here: dry-run vs live Binance
// futures), spawn auxiliary tokio tasks (there: latency/drawdown/stall
// monitors; here: price feed + shutdown signal listener), then drive one
// core loop. `clap` parses the CLI surface the base engine didn't need.
mod anchor;
mod client_id;
mod config;
mod engine;
mod errors;
mod grid;
mod journal;
mod notify;
mod placement;
mod price_feed;
mod quantize;
mod reconciler;
mod shutdown;
mod signing;
mod state;
mod tp;
mod venue;

use std::sync::Arc;

use clap::Parser;

use config::{Cli, EngineConfig};
use journal::Journal;
use notify::TelegramNotifier;
use venue::{DryRunVenue, LiveVenue, VenueClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = EngineConfig::load(&cli);

    init_logging(config.debug_verbose);

    if let Err(e) = config.validate_for_live() {
        log::error!("[MAIN] fatal config error: {}", e);
        std::process::exit(1);
    }

    log::info!(
        "[MAIN] starting grid-engine-rs symbol={} dry_run={} testnet={}",
        config.symbol,
        config.dry_run,
        config.use_testnet
    );

    let live = Arc::new(LiveVenue::new(
        config.futures_http_base.clone(),
        config.api_key.clone(),
        config.api_secret.clone(),
    ));
    let venue: Arc<dyn VenueClient> = if config.dry_run {
        log::info!("[MAIN] DRY_RUN active, orders are simulated locally");
        Arc::new(DryRunVenue::new(live))
    } else {
        live
    };

    let filters = match venue.exchange_filters(&config.symbol).await {
        Ok(f) => f,
        Err(e) => {
            log::error!("[MAIN] failed to fetch exchange filters: {}", e);
            std::process::exit(1);
        }
    };

    let journal = match Journal::new(&config.csv_file) {
        Ok(j) => j,
        Err(e) => {
            log::error!("[MAIN] failed to open journal: {}", e);
            std::process::exit(1);
        }
    };

    let notifier = TelegramNotifier::build(&config.telegram_bot_token, &config.telegram_chat_id);

    let symbol = config.symbol.clone();
    let refresh_sec = config.price_refresh_sec;
    let ticks = price_feed::spawn_price_feed(venue.clone(), symbol, refresh_sec);

    let shutdown_coord = Arc::new(shutdown::ShutdownCoordinator::new());
    shutdown_coord.spawn_signal_listener();

    let eng = match engine::Engine::new(config, filters, venue, journal, notifier) {
        Ok(e) => e,
        Err(e) => {
            log::error!("[MAIN] failed to initialize engine: {}", e);
            std::process::exit(1);
        }
    };

    engine::run(eng, ticks, shutdown_coord).await;
    log::info!("[MAIN] shutdown complete");
}

fn init_logging(debug_verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() && debug_verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}
