//! Status board for the tracked mint attempt.
//!
//! Holds the single attempt's status/error pair and fans events out to
//! subscribers. Status and error are mutually exclusive: progress clears the
//! error, failure clears the status.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::minting::phase::{MintEvent, MintOutcome, MintPhase};
use crate::minting::MintError;

/// Point-in-time view of the tracked attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub attempt: Option<Uuid>,
    pub phase: MintPhase,
    pub status: Option<String>,
    pub error: Option<String>,
    pub outcome: Option<MintOutcome>,
}

/// Shared progress state plus event fan-out.
pub struct StatusBoard {
    state: Mutex<BoardState>,
    events: broadcast::Sender<MintEvent>,
}

#[derive(Default)]
struct BoardState {
    snapshot: StatusSnapshot,
    /// Held by a maintenance action; no attempt may begin.
    claimed: bool,
}

impl BoardState {
    fn busy(&self) -> bool {
        self.claimed || self.snapshot.phase.is_active()
    }
}

/// Exclusive hold on an idle board. Dropping it forgets the finished attempt
/// and lets new attempts begin.
#[must_use = "the board is released when the claim is dropped"]
pub struct BoardClaim<'a> {
    board: &'a StatusBoard,
}

impl Drop for BoardClaim<'_> {
    fn drop(&mut self) {
        let mut state = self.board.lock();
        state.snapshot = StatusSnapshot::default();
        state.claimed = false;
    }
}

impl StatusBoard {
    /// Create a board whose subscribers may lag by up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(BoardState::default()),
            events,
        }
    }

    /// Start tracking `attempt`, unless another attempt is in flight.
    ///
    /// Clears the previous status and error and enters `Validating`.
    pub fn begin(&self, attempt: Uuid) -> Result<(), MintError> {
        let event = {
            let mut state = self.lock();
            if state.busy() {
                return Err(MintError::AlreadyRunning);
            }
            let message = MintPhase::Validating.status_text().to_string();
            state.snapshot = StatusSnapshot {
                attempt: Some(attempt),
                phase: MintPhase::Validating,
                status: Some(message.clone()),
                error: None,
                outcome: None,
            };
            MintEvent::Progress {
                attempt,
                phase: MintPhase::Validating,
                message,
            }
        };
        let _ = self.events.send(event);
        Ok(())
    }

    /// Apply an event to the tracked attempt and broadcast it.
    ///
    /// Events for other attempts or illegal transitions are dropped.
    pub fn publish(&self, event: MintEvent) {
        {
            let mut guard = self.lock();
            let state = &mut guard.snapshot;
            if state.attempt != Some(event.attempt()) || !state.phase.can_advance_to(event.phase()) {
                tracing::warn!(
                    attempt = %event.attempt(),
                    from = %state.phase,
                    to = %event.phase(),
                    "Dropping out-of-order mint event"
                );
                return;
            }
            state.phase = event.phase();
            match &event {
                MintEvent::Progress { message, .. } => {
                    state.status = Some(message.clone());
                    state.error = None;
                }
                MintEvent::Completed { outcome, .. } => {
                    state.status = Some(outcome.summary());
                    state.error = None;
                    state.outcome = Some(outcome.clone());
                }
                MintEvent::Failed { error, .. } => {
                    state.status = None;
                    state.error = Some(error.clone());
                }
            }
        }
        let _ = self.events.send(event);
    }

    /// Hold the board so no attempt can begin until the claim is dropped.
    ///
    /// Fails while an attempt is in flight or another claim is held.
    pub fn claim(&self) -> Result<BoardClaim<'_>, MintError> {
        let mut state = self.lock();
        if state.busy() {
            return Err(MintError::AlreadyRunning);
        }
        state.claimed = true;
        Ok(BoardClaim { board: self })
    }

    /// Current phase.
    pub fn phase(&self) -> MintPhase {
        self.lock().snapshot.phase
    }

    /// Copy of the tracked state.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot.clone()
    }

    /// Receive events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MintEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoardState> {
        self.state.lock().expect("status board mutex poisoned")
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(attempt: Uuid, phase: MintPhase) -> MintEvent {
        MintEvent::Progress {
            attempt,
            phase,
            message: phase.status_text().to_string(),
        }
    }

    #[test]
    fn test_begin_guards_running_attempt() {
        let board = StatusBoard::default();
        let first = Uuid::new_v4();
        board.begin(first).unwrap();

        let second = board.begin(Uuid::new_v4());
        assert!(matches!(second, Err(MintError::AlreadyRunning)));
        assert_eq!(board.snapshot().attempt, Some(first));
    }

    #[test]
    fn test_failure_clears_status_and_new_attempt_clears_error() {
        let board = StatusBoard::default();
        let attempt = Uuid::new_v4();
        board.begin(attempt).unwrap();
        board.publish(progress(attempt, MintPhase::CreatingMint));
        board.publish(MintEvent::Failed {
            attempt,
            phase: MintPhase::CreatingMint,
            error: "insufficient funds".to_string(),
        });

        let snapshot = board.snapshot();
        assert_eq!(snapshot.phase, MintPhase::Failed);
        assert_eq!(snapshot.status, None);
        assert_eq!(snapshot.error.as_deref(), Some("insufficient funds"));

        board.begin(Uuid::new_v4()).unwrap();
        let snapshot = board.snapshot();
        assert_eq!(snapshot.error, None);
        assert_eq!(snapshot.status.as_deref(), Some("Starting minting process..."));
    }

    #[test]
    fn test_out_of_order_events_are_dropped() {
        let board = StatusBoard::default();
        let attempt = Uuid::new_v4();
        board.begin(attempt).unwrap();

        board.publish(progress(attempt, MintPhase::Minting));
        assert_eq!(board.phase(), MintPhase::Validating);

        board.publish(progress(Uuid::new_v4(), MintPhase::CreatingMint));
        assert_eq!(board.phase(), MintPhase::Validating);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let board = StatusBoard::default();
        let mut rx = board.subscribe();
        let attempt = Uuid::new_v4();

        board.begin(attempt).unwrap();
        board.publish(progress(attempt, MintPhase::CreatingMint));

        assert_eq!(rx.recv().await.unwrap().phase(), MintPhase::Validating);
        assert_eq!(rx.recv().await.unwrap().phase(), MintPhase::CreatingMint);
    }

    #[test]
    fn test_claim_refused_while_running() {
        let board = StatusBoard::default();
        board.begin(Uuid::new_v4()).unwrap();
        assert!(matches!(board.claim(), Err(MintError::AlreadyRunning)));
    }

    #[test]
    fn test_claim_blocks_begin_until_dropped() {
        let board = StatusBoard::default();
        let attempt = Uuid::new_v4();
        board.begin(attempt).unwrap();
        board.publish(MintEvent::Failed {
            attempt,
            phase: MintPhase::Validating,
            error: "boom".to_string(),
        });

        let claim = board.claim().unwrap();
        assert!(matches!(board.begin(Uuid::new_v4()), Err(MintError::AlreadyRunning)));
        assert!(board.claim().is_err());
        assert_eq!(board.phase(), MintPhase::Failed);

        drop(claim);
        assert_eq!(board.snapshot(), StatusSnapshot::default());
        board.begin(Uuid::new_v4()).unwrap();
    }
}
