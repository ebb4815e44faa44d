// price_feed.rs — REST-polled (bid, ask) ticks
//
// Grounded on original_source/src/gridbot/price.py's `refresh_prices`: a
// loop that fetches the book ticker, pushes it into a bounded queue with
// `put_nowait` (dropping the newest tick if the consumer has fallen
// behind), then sleeps `PRICE_REFRESH_SEC`. Replaces the base engine's
// `ingestor.rs` WebSocket L2 subscriber — the spec explicitly allows
// either a streaming source or a periodic poll (§4.4), and the poll model
// needs none of `tokio-tungstenite`/`futures-util`, which this crate drops.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::venue::{BookTicker, VenueClient};

pub const CHANNEL_CAPACITY: usize = 1000;

/// Spawns the polling task. Ticks are pushed with `try_send`; a full
/// channel means the processor has fallen behind and the newest tick is
/// simply dropped rather than blocking the feed (matches `put_nowait`'s
/// drop-on-full semantics in the Python original).
pub fn spawn_price_feed(
    venue: Arc<dyn VenueClient>,
    symbol: String,
    refresh_sec: f64,
) -> mpsc::Receiver<BookTicker> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let interval = Duration::from_secs_f64(refresh_sec.max(0.1));
        loop {
            match venue.book_ticker(&symbol).await {
                Ok(tick) => {
                    if tx.try_send(tick).is_err() {
                        log::debug!("[PRICE_FEED] channel full, dropping tick");
                    }
                }
                Err(e) => {
                    log::warn!("[PRICE_FEED] book_ticker failed: {}", e);
                }
            }
            tokio::time::sleep(interval).await;
            if tx.is_closed() {
                log::info!("[PRICE_FEED] receiver dropped, stopping feed");
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::SymbolFilters;
    use crate::venue::FakeVenue;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn feed_delivers_ticks_from_venue() {
        let venue: Arc<dyn VenueClient> =
            Arc::new(FakeVenue::new(SymbolFilters::default(), dec!(100), dec!(100.1)));
        let mut rx = spawn_price_feed(venue, "SOLUSDT".to_string(), 0.1);
        let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tick.bid, dec!(100));
    }
}
