//! Rebroadcast scheduling: which known id to re-announce on a tick.
//!
//! Every id must eventually be re-announced so new or recovering peers
//! converge, but the swarm as a whole tolerates only a small aggregate
//! message rate. The scheduler walks candidates most-overdue first and a
//! single global budget caps how often this node speaks at all.

use crate::ledger::AnnounceLedger;
use crate::message::{Announcement, ContentId};
use std::time::Duration;
use tracing::debug;

/// Tuning for the rebroadcast scheduler.
#[derive(Debug, Clone)]
pub struct RebroadcastConfig {
    /// Aggregate message rate the swarm should tolerate, in messages/sec.
    pub target_rate: f64,
    /// Assumed number of peers sharing that aggregate rate.
    pub estimated_peers: u32,
    /// Lower bound on the interval between two of our broadcasts.
    pub min_interval_floor: Duration,
    /// Longest a known id may go unmentioned before it becomes overdue.
    pub max_silence: Duration,
}

impl Default for RebroadcastConfig {
    fn default() -> Self {
        Self {
            target_rate: 0.33,
            estimated_peers: 3,
            min_interval_floor: Duration::from_secs(10),
            max_silence: Duration::from_secs(30),
        }
    }
}

impl RebroadcastConfig {
    /// Sets the aggregate target rate.
    #[must_use]
    pub const fn with_target_rate(mut self, rate: f64) -> Self {
        self.target_rate = rate;
        self
    }

    /// Sets the assumed peer count.
    #[must_use]
    pub const fn with_estimated_peers(mut self, peers: u32) -> Self {
        self.estimated_peers = peers;
        self
    }

    /// Sets the broadcast interval floor.
    #[must_use]
    pub const fn with_min_interval_floor(mut self, floor: Duration) -> Self {
        self.min_interval_floor = floor;
        self
    }

    /// Sets the maximum silence before an id becomes overdue.
    #[must_use]
    pub const fn with_max_silence(mut self, silence: Duration) -> Self {
        self.max_silence = silence;
        self
    }

    /// Effective minimum interval between two broadcasts, in seconds.
    ///
    /// The larger of the per-peer share of the target rate and the
    /// configured floor; with the defaults the floor dominates.
    #[must_use]
    pub fn min_interval(&self) -> f64 {
        let shared = self.target_rate / f64::from(self.estimated_peers.max(1));
        shared.max(self.min_interval_floor.as_secs_f64())
    }
}

/// Selects overdue ids for re-announcement under a global rate budget.
///
/// Candidates are visited most-overdue first: never-mentioned ids ahead
/// of everything, then by ascending mention time, ties broken by id, so
/// the selection is deterministic for a given ledger and clock.
#[derive(Debug, Default)]
pub struct RebroadcastScheduler {
    config: RebroadcastConfig,
    last_broadcast: Option<i64>,
}

impl RebroadcastScheduler {
    /// Creates a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: RebroadcastConfig) -> Self {
        Self {
            config,
            last_broadcast: None,
        }
    }

    /// Creates a scheduler with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RebroadcastConfig::default())
    }

    /// Returns the current configuration.
    #[must_use]
    pub const fn config(&self) -> &RebroadcastConfig {
        &self.config
    }

    /// When this node last broadcast anything, if ever.
    #[must_use]
    pub const fn last_broadcast(&self) -> Option<i64> {
        self.last_broadcast
    }

    /// Runs one scheduling pass at `now` (seconds since epoch).
    ///
    /// Emitting a message stamps the id's mention in the ledger and
    /// consumes the global budget, so a tick yields at most one message
    /// for any positive effective interval. A quiet tick returns an
    /// empty vector.
    pub fn tick(&mut self, ledger: &mut AnnounceLedger, now: i64) -> Vec<Announcement> {
        let min_interval = self.config.min_interval();
        let max_silence = self.config.max_silence.as_secs_f64();

        let mut candidates: Vec<(Option<i64>, ContentId)> = ledger
            .ids()
            .map(|id| (ledger.last_mention(id), id.clone()))
            .collect();
        candidates.sort();

        let mut emitted = Vec::new();
        for (mention, id) in candidates {
            let overdue = match mention {
                None => true,
                Some(at) => (now - at) as f64 > max_silence,
            };
            if !overdue {
                continue;
            }
            let budget_open = self
                .last_broadcast
                .is_none_or(|at| (now - at) as f64 > min_interval);
            if !budget_open {
                continue;
            }

            ledger.mark_mentioned(&id, now);
            self.last_broadcast = Some(now);
            debug!(id = %id, "scheduling rebroadcast");
            emitted.push(Announcement::new(id));
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use test_case::test_case;

    fn id(s: &str) -> ContentId {
        ContentId::new(s)
    }

    fn ledger_with(known: &[&str], mentions: &[(&str, i64)]) -> AnnounceLedger {
        let known: HashSet<ContentId> = known.iter().map(|s| id(s)).collect();
        let mentions: HashMap<ContentId, i64> =
            mentions.iter().map(|(s, at)| (id(s), *at)).collect();
        AnnounceLedger::from_parts(known, mentions)
    }

    // ========== Config Tests ==========

    #[test_case(0.33, 3, 10, 10.0 ; "floor dominates at defaults")]
    #[test_case(60.0, 2, 5, 30.0 ; "per peer share dominates when coarse")]
    #[test_case(0.5, 0, 10, 10.0 ; "zero peer estimate falls back to floor")]
    fn min_interval_takes_the_larger_bound(rate: f64, peers: u32, floor: u64, expected: f64) {
        let config = RebroadcastConfig::default()
            .with_target_rate(rate)
            .with_estimated_peers(peers)
            .with_min_interval_floor(Duration::from_secs(floor));

        assert!((config.min_interval() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn config_defaults() {
        let config = RebroadcastConfig::default();

        assert_eq!(config.estimated_peers, 3);
        assert_eq!(config.min_interval_floor, Duration::from_secs(10));
        assert_eq!(config.max_silence, Duration::from_secs(30));
    }

    // ========== Eligibility Tests ==========

    #[test]
    fn empty_ledger_yields_nothing() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = AnnounceLedger::new();

        assert!(scheduler.tick(&mut ledger, 0).is_empty());
    }

    #[test]
    fn fresh_mention_is_not_yet_overdue() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = AnnounceLedger::new();
        ledger.ingest(&Announcement::new("Qm123"), 0);

        // Silence of zero is under the 30s ceiling.
        assert!(scheduler.tick(&mut ledger, 0).is_empty());
    }

    #[test]
    fn silent_id_is_rebroadcast_once_overdue() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = AnnounceLedger::new();
        ledger.ingest(&Announcement::new("Qm123"), 0);

        let emitted = scheduler.tick(&mut ledger, 31);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].id, id("Qm123"));
        assert_eq!(ledger.last_mention(&id("Qm123")), Some(31));
        assert_eq!(scheduler.last_broadcast(), Some(31));
    }

    #[test]
    fn silence_at_exactly_max_is_not_overdue() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = AnnounceLedger::new();
        ledger.ingest(&Announcement::new("Qm123"), 0);

        assert!(scheduler.tick(&mut ledger, 30).is_empty());
    }

    #[test]
    fn never_mentioned_id_is_always_eligible() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = ledger_with(&["Qm123"], &[]);

        let emitted = scheduler.tick(&mut ledger, 0);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].id, id("Qm123"));
    }

    // ========== Ordering Tests ==========

    #[test]
    fn never_mentioned_sorts_before_longest_silent() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = ledger_with(&["QmAaa", "QmZzz"], &[("QmAaa", 10)]);

        // QmAaa is deeply overdue, but QmZzz has never been mentioned at all.
        let emitted = scheduler.tick(&mut ledger, 1000);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].id, id("QmZzz"));
    }

    #[test]
    fn oldest_mention_wins_among_mentioned() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = ledger_with(&["QmNewer", "QmOlder"], &[("QmNewer", 50), ("QmOlder", 10)]);

        let emitted = scheduler.tick(&mut ledger, 1000);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].id, id("QmOlder"));
    }

    #[test]
    fn equal_mentions_break_ties_by_id() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = ledger_with(&["QmBbb", "QmAaa"], &[("QmBbb", 10), ("QmAaa", 10)]);

        let emitted = scheduler.tick(&mut ledger, 1000);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].id, id("QmAaa"));
    }

    // ========== Budget Tests ==========

    #[test]
    fn budget_allows_at_most_one_emission_per_window() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = ledger_with(&["QmAaa", "QmBbb"], &[]);

        // Both candidates are eligible, but the first emission consumes
        // the global budget for this tick.
        let first = scheduler.tick(&mut ledger, 50);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, id("QmAaa"));

        // 5s later: under the 10s minimum interval, nothing goes out.
        assert!(scheduler.tick(&mut ledger, 55).is_empty());

        // 11s later: the window reopens for the remaining candidate.
        let third = scheduler.tick(&mut ledger, 61);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].id, id("QmBbb"));
    }

    #[test]
    fn two_ticks_within_the_window_yield_at_most_one_message() {
        let mut scheduler = RebroadcastScheduler::with_defaults();
        let mut ledger = ledger_with(&["Qm123"], &[]);

        let first = scheduler.tick(&mut ledger, 100);
        let second = scheduler.tick(&mut ledger, 105);

        assert_eq!(first.len() + second.len(), 1);
    }

    // ========== Proptest ==========

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tick_emits_at_most_one_message(
                entries in prop::collection::hash_map(
                    "[a-z]{1,6}",
                    proptest::option::of(0i64..1000),
                    0..20,
                ),
                now in 0i64..2000,
            ) {
                let known: HashSet<ContentId> =
                    entries.keys().map(|s| ContentId::new(s.as_str())).collect();
                let mentions: HashMap<ContentId, i64> = entries
                    .iter()
                    .filter_map(|(s, at)| at.map(|at| (ContentId::new(s.as_str()), at)))
                    .collect();
                let mut ledger = AnnounceLedger::from_parts(known, mentions);
                let mut scheduler = RebroadcastScheduler::with_defaults();

                prop_assert!(scheduler.tick(&mut ledger, now).len() <= 1);
            }

            #[test]
            fn emission_always_stamps_the_ledger(
                ids in prop::collection::hash_set("[a-z]{1,6}", 1..10),
                now in 0i64..1000,
            ) {
                let known: HashSet<ContentId> =
                    ids.iter().map(|s| ContentId::new(s.as_str())).collect();
                let mut ledger = AnnounceLedger::from_parts(known, HashMap::new());
                let mut scheduler = RebroadcastScheduler::with_defaults();

                for announcement in scheduler.tick(&mut ledger, now) {
                    prop_assert_eq!(ledger.last_mention(&announcement.id), Some(now));
                }
            }
        }
    }
}
