// client_id.rs — deterministic client order ids
//
// Grounded on original_source/src/gridbot/core/grid_logic.py's
// `_is_ours`/`tp_client_id` and broker/binance_connector.py's `_cid`:
// buy ids are `B-<session>-<price_cents>-<nonce>`, truncated to 32 chars
// (Binance's own limit on `newClientOrderId`); TP ids are a pure function
// of entry price and quantity (`T-<session>-<entry_cents>-<qty_mills>`),
// which is what makes TP placement idempotent across restarts — replaying
// `ensure_tps_for_positions` against the same position always produces the
// same id instead of a fresh one.
use rust_decimal::prelude::*;

const MAX_CID_LEN: usize = 32;

fn truncate(id: String) -> String {
    if id.len() <= MAX_CID_LEN {
        id
    } else {
        id[..MAX_CID_LEN].to_string()
    }
}

pub fn buy_client_id(session: &str, price: Decimal, nonce: u64) -> String {
    let cents = (price * Decimal::from(100)).round().to_i64().unwrap_or(0);
    truncate(format!("B-{}-{}-{}", session, cents, nonce))
}

pub fn tp_client_id(session: &str, entry: Decimal, qty: Decimal) -> String {
    let entry_cents = (entry * Decimal::from(100)).round().to_i64().unwrap_or(0);
    let qty_mills = (qty * Decimal::from(1000)).round().to_i64().unwrap_or(0);
    truncate(format!("T-{}-{}-{}", session, entry_cents, qty_mills))
}

/// Does this client order id belong to our session? (`_is_ours`)
pub fn is_ours(client_order_id: &str, session: &str) -> bool {
    client_order_id.starts_with(&format!("B-{}-", session))
        || client_order_id.starts_with(&format!("T-{}-", session))
}

pub fn sanitize_tag(raw: &str, default: &str, max_len: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let cleaned = if cleaned.is_empty() { default.to_string() } else { cleaned };
    if cleaned.len() > max_len {
        cleaned[..max_len].to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tp_client_id_is_pure_function_of_entry_and_qty() {
        let a = tp_client_id("r123", dec!(100.50), dec!(1.000));
        let b = tp_client_id("r123", dec!(100.50), dec!(1.000));
        assert_eq!(a, b);
    }

    #[test]
    fn tp_client_id_differs_on_entry() {
        let a = tp_client_id("r123", dec!(100.50), dec!(1.000));
        let b = tp_client_id("r123", dec!(101.50), dec!(1.000));
        assert_ne!(a, b);
    }

    #[test]
    fn buy_client_id_respects_max_length() {
        let id = buy_client_id("some-very-long-session-tag-value", dec!(99999.99), 123456789);
        assert!(id.len() <= MAX_CID_LEN);
    }

    #[test]
    fn is_ours_matches_own_session_prefix() {
        let id = buy_client_id("r1", dec!(100), 1);
        assert!(is_ours(&id, "r1"));
        assert!(!is_ours(&id, "r2"));
    }

    #[test]
    fn sanitize_tag_strips_invalid_chars_and_truncates() {
        let tag = sanitize_tag("he!!o wor/ld", "r", 5);
        assert_eq!(tag, "heowo");
    }

    #[test]
    fn sanitize_tag_falls_back_to_default_when_empty() {
        let tag = sanitize_tag("!!!", "r", 10);
        assert_eq!(tag, "r");
    }
}
