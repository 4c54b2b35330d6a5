//! # Race Tracker
//!
//! Settlement board and fastest-source detector for one aggregation request.
//!
//! Every source task reports its outcome through [`RaceTracker::settle`].
//! Within the same critical section the tracker stores the outcome, bumps
//! the settle count and, for the first success only, commits the race
//! winner. Failures never win. When every source has settled without a
//! success the race resolves with no winner.
//!
//! At the deadline the engine calls [`RaceTracker::seal`], which takes an
//! atomic snapshot of outcomes and winner. Settlements arriving after the
//! seal are ignored, so the winner is always among the reported successes.

use crate::domain::entities::WeatherReport;
use crate::domain::errors::DomainResult;
use crate::domain::value_objects::{Reading, SourceName};
use crate::infrastructure::sources::error::{SourceError, SourceResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio::sync::Notify;

/// State of the fastest-source race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RaceState {
    /// No source has succeeded and some are still pending.
    Pending,
    /// This source was the first to succeed.
    Won(SourceName),
    /// Every source settled (or the board was sealed) without a success.
    NoWinner,
}

impl RaceState {
    /// Returns the winner, if any.
    #[must_use]
    pub(crate) fn winner(&self) -> Option<&SourceName> {
        match self {
            Self::Won(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Race {
    Pending,
    Won(usize),
    NoWinner,
}

#[derive(Debug)]
struct Board {
    names: Vec<SourceName>,
    outcomes: Vec<Option<SourceResult<Reading>>>,
    race: Race,
    settled: usize,
    sealed: bool,
}

impl Board {
    fn is_complete(&self) -> bool {
        self.sealed || self.settled == self.names.len()
    }

    fn race_state(&self) -> RaceState {
        match self.race {
            Race::Pending => RaceState::Pending,
            Race::Won(index) => RaceState::Won(self.names[index].clone()),
            Race::NoWinner => RaceState::NoWinner,
        }
    }
}

/// Lock-guarded settlement board shared by the source tasks of one request.
#[derive(Debug)]
pub struct RaceTracker {
    board: Mutex<Board>,
    settled: Notify,
    resolved: Notify,
}

impl RaceTracker {
    /// Creates a tracker for the given sources, all pending.
    ///
    /// With no sources the tracker is complete and the race already resolved
    /// with no winner.
    #[must_use]
    pub fn new(names: Vec<SourceName>) -> Self {
        let race = if names.is_empty() {
            Race::NoWinner
        } else {
            Race::Pending
        };
        let outcomes = vec![None; names.len()];
        Self {
            board: Mutex::new(Board {
                names,
                outcomes,
                race,
                settled: 0,
                sealed: false,
            }),
            settled: Notify::new(),
            resolved: Notify::new(),
        }
    }

    /// Records the outcome of the source at `index`.
    ///
    /// Returns true if this settlement won the race. Settlements for an
    /// unknown index, a source that already settled, or a sealed board are
    /// ignored.
    pub fn settle(&self, index: usize, outcome: SourceResult<Reading>) -> bool {
        let (won, complete, resolved) = {
            let mut board = self.board.lock();
            if board.sealed || board.outcomes.get(index).is_none_or(Option::is_some) {
                return false;
            }

            let was_pending = board.race == Race::Pending;
            let won = was_pending && outcome.is_ok();
            board.outcomes[index] = Some(outcome);
            board.settled += 1;

            if won {
                board.race = Race::Won(index);
            } else if was_pending && board.settled == board.names.len() {
                board.race = Race::NoWinner;
            }

            let resolved = was_pending && board.race != Race::Pending;
            (won, board.is_complete(), resolved)
        };

        if resolved {
            self.resolved.notify_waiters();
        }
        if complete {
            self.settled.notify_waiters();
        }
        won
    }

    /// Returns the current race state.
    #[must_use]
    pub(crate) fn race_state(&self) -> RaceState {
        self.board.lock().race_state()
    }

    /// Returns the number of sources that have settled.
    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.board.lock().settled
    }

    /// Returns true once every source settled or the board was sealed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.board.lock().is_complete()
    }

    /// Waits until every source has settled or the board is sealed.
    pub async fn all_settled(&self) {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }

    /// Waits for the race to resolve and returns the winner, if any.
    ///
    /// Resolves as soon as the first success settles, usually well before
    /// every source has settled.
    pub async fn resolved(&self) -> Option<SourceName> {
        loop {
            let notified = self.resolved.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            match self.race_state() {
                RaceState::Pending => notified.await,
                state => return state.winner().cloned(),
            }
        }
    }

    /// Freezes the board and returns its snapshot.
    ///
    /// Sources still pending are reported as timed out; a race still pending
    /// resolves with no winner. Sealing twice returns the same snapshot.
    pub fn seal(&self) -> Settlement {
        let (settlement, newly_sealed) = {
            let mut board = self.board.lock();
            let newly_sealed = !board.sealed;
            board.sealed = true;
            if board.race == Race::Pending {
                board.race = Race::NoWinner;
            }

            let fastest = match board.race {
                Race::Won(index) => Some(board.names[index].clone()),
                _ => None,
            };
            let outcomes = board
                .names
                .iter()
                .cloned()
                .zip(board.outcomes.iter().cloned())
                .map(|(name, outcome)| SourceOutcome {
                    name,
                    outcome: outcome.map_or(SourceStatus::Pending, SourceStatus::Settled),
                })
                .collect();

            (Settlement { outcomes, fastest }, newly_sealed)
        };

        if newly_sealed {
            self.resolved.notify_waiters();
            self.settled.notify_waiters();
        }
        settlement
    }
}

/// Status of one source in a sealed settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// The source call completed before the seal.
    Settled(SourceResult<Reading>),
    /// The source call had not completed before the seal.
    Pending,
}

/// Outcome of one source in a sealed settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Source name.
    pub name: SourceName,
    /// Settlement status.
    pub outcome: SourceStatus,
}

impl SourceOutcome {
    /// Returns the reading if the source succeeded.
    #[must_use]
    pub fn reading(&self) -> Option<Reading> {
        match &self.outcome {
            SourceStatus::Settled(Ok(reading)) => Some(*reading),
            _ => None,
        }
    }

    /// Returns the failure cause, treating a pending source as timed out.
    #[must_use]
    pub fn failure(&self) -> Option<SourceError> {
        match &self.outcome {
            SourceStatus::Settled(Ok(_)) => None,
            SourceStatus::Settled(Err(error)) => Some(error.clone()),
            SourceStatus::Pending => Some(SourceError::timeout(format!(
                "{} did not answer before the deadline",
                self.name
            ))),
        }
    }
}

/// Frozen outcomes of every source plus the race winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    outcomes: Vec<SourceOutcome>,
    fastest: Option<SourceName>,
}

impl Settlement {
    /// Returns the per-source outcomes in configuration order.
    #[must_use]
    pub fn outcomes(&self) -> &[SourceOutcome] {
        &self.outcomes
    }

    /// Returns the fastest successful source, if any.
    #[must_use]
    pub fn fastest(&self) -> Option<&SourceName> {
        self.fastest.as_ref()
    }

    /// Returns the sources that had not settled when the board was sealed.
    pub fn pending_sources(&self) -> impl Iterator<Item = &SourceName> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == SourceStatus::Pending)
            .map(|o| &o.name)
    }

    /// Partitions the outcomes into a report.
    ///
    /// Successes go into the reading map; failures and pending sources go
    /// into the failure list in configuration order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InconsistentReport` if the outcomes violate the
    /// report invariants (for example a duplicated source name).
    pub fn into_report(self) -> DomainResult<WeatherReport> {
        let mut readings = BTreeMap::new();
        let mut failed = Vec::new();
        for outcome in self.outcomes {
            match outcome.reading() {
                Some(reading) => {
                    readings.insert(outcome.name, reading);
                }
                None => failed.push(outcome.name),
            }
        }
        WeatherReport::new(readings, failed, self.fastest)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn tracker(names: &[&str]) -> RaceTracker {
        RaceTracker::new(names.iter().map(|n| SourceName::new(*n)).collect())
    }

    fn fail(name: &str) -> SourceResult<Reading> {
        Err(SourceError::unavailable(format!("Fail in {name}")))
    }

    #[test]
    fn first_success_wins_once() {
        let t = tracker(&["API1", "API2", "API3"]);

        assert!(!t.settle(0, fail("API1")));
        assert_eq!(t.race_state(), RaceState::Pending);

        assert!(t.settle(2, Ok(Reading::new(24))));
        assert!(!t.settle(1, Ok(Reading::new(22))));

        assert_eq!(t.race_state(), RaceState::Won(SourceName::new("API3")));
        assert!(t.is_complete());
    }

    #[test]
    fn all_failures_resolve_without_winner() {
        let t = tracker(&["API1", "API2"]);
        t.settle(0, fail("API1"));
        assert_eq!(t.race_state(), RaceState::Pending);
        t.settle(1, fail("API2"));
        assert_eq!(t.race_state(), RaceState::NoWinner);
    }

    #[test]
    fn duplicate_and_out_of_range_settlements_are_ignored() {
        let t = tracker(&["API1", "API2"]);
        t.settle(0, fail("API1"));
        assert!(!t.settle(0, Ok(Reading::new(20))));
        assert!(!t.settle(7, Ok(Reading::new(20))));
        assert_eq!(t.settled_count(), 1);
        assert_eq!(t.race_state(), RaceState::Pending);
    }

    #[test]
    fn seal_reports_pending_as_failed() {
        let t = tracker(&["API1", "API2", "API3"]);
        t.settle(1, Ok(Reading::new(22)));

        let settlement = t.seal();
        assert!(!t.settle(0, Ok(Reading::new(20))));

        let pending: Vec<&str> = settlement.pending_sources().map(SourceName::as_str).collect();
        assert_eq!(pending, vec!["API1", "API3"]);
        assert!(matches!(
            settlement.outcomes()[0].failure(),
            Some(SourceError::Timeout { .. })
        ));

        let report = settlement.into_report().unwrap();
        assert_eq!(report.fastest_source(), "API2");
        assert_eq!(report.average_temperature(), 22.0);
        assert_eq!(
            report.failed_sources(),
            &[SourceName::new("API1"), SourceName::new("API3")]
        );
    }

    #[test]
    fn seal_with_pending_race_has_no_winner() {
        let t = tracker(&["API1"]);
        let report = t.seal().into_report().unwrap();
        assert_eq!(report.fastest_source(), "Unknown");
        assert_eq!(report.average_temperature(), 0.0);
        assert_eq!(t.race_state(), RaceState::NoWinner);
    }

    #[test]
    fn empty_tracker_is_complete() {
        let t = tracker(&[]);
        assert!(t.is_complete());
        assert_eq!(t.race_state(), RaceState::NoWinner);
        assert_eq!(t.seal().into_report().unwrap(), WeatherReport::empty());
    }

    #[tokio::test]
    async fn waiters_wake_on_settlement() {
        let t = Arc::new(tracker(&["API1", "API2"]));

        let settled = tokio::spawn({
            let t = Arc::clone(&t);
            async move { t.all_settled().await }
        });
        let resolved = tokio::spawn({
            let t = Arc::clone(&t);
            async move { t.resolved().await }
        });

        tokio::task::yield_now().await;
        t.settle(1, Ok(Reading::new(30)));
        assert_eq!(resolved.await.unwrap(), Some(SourceName::new("API2")));

        t.settle(0, fail("API1"));
        tokio::time::timeout(Duration::from_secs(1), settled)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn resolved_returns_while_sources_are_pending() {
        let t = tracker(&["API1", "API2", "API3"]);
        t.settle(2, fail("API3"));
        t.settle(1, Ok(Reading::new(12)));

        let fastest = tokio::time::timeout(Duration::from_secs(1), t.resolved())
            .await
            .unwrap();
        assert_eq!(fastest, Some(SourceName::new("API2")));
        assert_eq!(t.settled_count(), 2);
        assert!(!t.is_complete());
    }

    #[tokio::test]
    async fn seal_wakes_waiters() {
        let t = Arc::new(tracker(&["API1"]));
        let waiter = tokio::spawn({
            let t = Arc::clone(&t);
            async move { t.all_settled().await }
        });

        tokio::task::yield_now().await;
        t.seal();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_successes_commit_exactly_one_winner() {
        let names: Vec<String> = (0..32).map(|i| format!("S{i}")).collect();
        let t = Arc::new(RaceTracker::new(
            names.iter().map(|n| SourceName::new(n.as_str())).collect(),
        ));

        let handles: Vec<_> = (0..names.len())
            .map(|i| {
                let t = Arc::clone(&t);
                tokio::spawn(async move { t.settle(i, Ok(Reading::new(i as i32))) })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        let winner = t.race_state().winner().cloned().unwrap();
        let report = t.seal().into_report().unwrap();
        assert_eq!(report.fastest_source(), winner.as_str());
        assert_eq!(report.success_count(), 32);
    }
}
