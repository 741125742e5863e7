//! Session statistics

use serde::{Deserialize, Serialize};

/// Running totals over completed spins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_spins: u64,
    pub total_bet: f64,
    pub total_win: f64,
    pub wins: u64,
    pub losses: u64,
    /// Largest win / bet ratio seen
    pub max_win_ratio: f64,
    /// Spins abandoned by a force stop (bet refunded)
    pub aborted_spins: u64,
}

impl SessionStats {
    pub fn record(&mut self, bet: f64, win: f64) {
        self.total_spins += 1;
        self.total_bet += bet;
        self.total_win += win;
        if win > 0.0 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        if bet > 0.0 {
            self.max_win_ratio = self.max_win_ratio.max(win / bet);
        }
    }

    /// Return to player, in percent
    pub fn rtp(&self) -> f64 {
        if self.total_bet > 0.0 {
            (self.total_win / self.total_bet) * 100.0
        } else {
            0.0
        }
    }

    /// Share of winning spins, in percent
    pub fn hit_rate(&self) -> f64 {
        if self.total_spins > 0 {
            (self.wins as f64 / self.total_spins as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rtp_and_hit_rate() {
        let mut stats = SessionStats::default();
        assert_eq!(stats.rtp(), 0.0);
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record(2.0, 0.0);
        stats.record(2.0, 5.0);
        stats.record(2.0, 0.0);
        stats.record(2.0, 1.0);

        assert_relative_eq!(stats.rtp(), 75.0);
        assert_relative_eq!(stats.hit_rate(), 50.0);
        assert_relative_eq!(stats.max_win_ratio, 2.5);
        assert_eq!(stats.losses, 2);
    }
}
