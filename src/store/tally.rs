//! Win/loss tallies for the market review screen.

use super::aggregator::round_ratio;
use super::{keys, read_u64, write_logged, KeyValueStore};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TallySnapshot {
    pub wins: u64,
    pub losses: u64,
    /// `round(wins / total * 100)`, 0 when there are no trades.
    pub win_rate: u64,
}

/// Counters persisted under their own keys.
pub struct Tally {
    store: Arc<dyn KeyValueStore>,
}

impl Tally {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn wins(&self) -> u64 {
        read_u64(self.store.as_ref(), keys::MARKET_WINS)
    }

    pub fn losses(&self) -> u64 {
        read_u64(self.store.as_ref(), keys::MARKET_LOSSES)
    }

    pub fn record_win(&self) -> TallySnapshot {
        self.adjust(keys::MARKET_WINS, |n| n.saturating_add(1))
    }

    pub fn record_loss(&self) -> TallySnapshot {
        self.adjust(keys::MARKET_LOSSES, |n| n.saturating_add(1))
    }

    pub fn undo_win(&self) -> TallySnapshot {
        self.adjust(keys::MARKET_WINS, |n| n.saturating_sub(1))
    }

    pub fn undo_loss(&self) -> TallySnapshot {
        self.adjust(keys::MARKET_LOSSES, |n| n.saturating_sub(1))
    }

    pub fn reset(&self) -> TallySnapshot {
        write_logged(self.store.as_ref(), keys::MARKET_WINS, "0");
        write_logged(self.store.as_ref(), keys::MARKET_LOSSES, "0");
        self.snapshot()
    }

    pub fn win_rate(&self) -> u64 {
        self.snapshot().win_rate
    }

    pub fn snapshot(&self) -> TallySnapshot {
        let wins = self.wins();
        let losses = self.losses();
        TallySnapshot {
            wins,
            losses,
            win_rate: round_ratio(wins.saturating_mul(100), wins.saturating_add(losses)),
        }
    }

    fn adjust(&self, key: &str, f: impl Fn(u64) -> u64) -> TallySnapshot {
        let next = f(read_u64(self.store.as_ref(), key));
        write_logged(self.store.as_ref(), key, &next.to_string());
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_empty_tally_has_zero_rate() {
        let tally = Tally::new(Arc::new(MemoryStore::new()));
        let snap = tally.snapshot();
        assert_eq!(snap.wins, 0);
        assert_eq!(snap.losses, 0);
        assert_eq!(snap.win_rate, 0);
    }

    #[test]
    fn test_win_rate_rounds() {
        let tally = Tally::new(Arc::new(MemoryStore::new()));
        tally.record_win();
        tally.record_win();
        let snap = tally.record_loss();

        assert_eq!(snap.wins, 2);
        assert_eq!(snap.losses, 1);
        // 66.67 rounds to 67
        assert_eq!(snap.win_rate, 67);
    }

    #[test]
    fn test_undo_saturates_and_reset() {
        let store = Arc::new(MemoryStore::new());
        let tally = Tally::new(store.clone());

        assert_eq!(tally.undo_loss().losses, 0);
        tally.record_win();
        assert_eq!(tally.undo_win().wins, 0);

        tally.record_loss();
        let snap = tally.reset();
        assert_eq!((snap.wins, snap.losses), (0, 0));
        assert_eq!(store.get(keys::MARKET_LOSSES).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_garbage_counter_reads_as_zero() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::MARKET_WINS, "NaN").unwrap();
        let tally = Tally::new(store);

        assert_eq!(tally.wins(), 0);
        assert_eq!(tally.record_win().wins, 1);
    }
}
