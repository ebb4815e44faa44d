// journal.rs — append-only CSV trade/event log
//
// Grounded on original_source/src/gridbot/state/manager.py's `init_csv`/
// `log_trade`: columns `time, event, price, qty, pnl, total_pnl, note`.
// Replaces the base engine's reliance on plain log lines for trade history
// (it has no equivalent durable CSV journal) with the `csv` crate, already
// a base-engine dependency kept for exactly this purpose.
use std::path::Path;

use chrono::Utc;
use csv::Writer;

pub struct Journal {
    path: std::path::PathBuf,
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub event: String,
    pub price: String,
    pub qty: String,
    pub pnl: String,
    pub total_pnl: String,
    pub note: String,
}

impl Journal {
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut w = Writer::from_path(&path)?;
            w.write_record(["time", "event", "price", "qty", "pnl", "total_pnl", "note"])?;
            w.flush()?;
        }
        Ok(Journal { path })
    }

    pub fn log(&self, entry: &JournalEntry) -> std::io::Result<()> {
        let file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
        let mut w = Writer::from_writer(file);
        w.write_record(&[
            Utc::now().to_rfc3339(),
            entry.event.clone(),
            entry.price.clone(),
            entry.qty.clone(),
            entry.pnl.clone(),
            entry.total_pnl.clone(),
            entry.note.clone(),
        ])?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_journal_writes_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let _j1 = Journal::new(&path).unwrap();
        let _j2 = Journal::new(&path).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().count(), 1);
    }

    #[test]
    fn log_appends_a_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let j = Journal::new(&path).unwrap();
        j.log(&JournalEntry {
            event: "BUY_PLACED".to_string(),
            price: "100.0".to_string(),
            qty: "1.0".to_string(),
            pnl: "0".to_string(),
            total_pnl: "0".to_string(),
            note: "".to_string(),
        })
        .unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().count(), 2);
        assert!(body.contains("BUY_PLACED"));
    }
}
