#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session persistence: the snapshot string format, the stores that hold it and
//! the autosave system that reacts to world events.
//!
//! Saving is fire-and-forget. A failed write is logged and the session keeps
//! running; the next mutating event tries again.

mod codec;
mod store;

pub use codec::{decode_snapshot, encode_snapshot, SnapshotError, SNAPSHOT_HEADER};
pub use store::{FileStore, MemoryStore, SnapshotStore, StoreError};

use geomerge_core::{Event, SessionSnapshot};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure raised while moving a session in or out of a store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The stored string was not a valid snapshot.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// What the system did in response to a batch of events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No event changed persisted state.
    Skipped,
    /// The current session was written to the store.
    Saved,
    /// Writing failed; the failure was logged.
    Failed,
}

/// Autosave system owning the snapshot store.
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
}

impl<S: SnapshotStore> Persistence<S> {
    /// Creates the system around the provided store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrows the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reacts to world events, saving the snapshot produced by `capture` when
    /// any of them mutated persisted state.
    ///
    /// A `GameReset` erases the previous save before the fresh state is
    /// written. Failures never propagate.
    pub fn handle<F>(&mut self, events: &[Event], capture: F) -> SaveOutcome
    where
        F: FnOnce() -> SessionSnapshot,
    {
        if !events.iter().any(Event::is_mutating) {
            return SaveOutcome::Skipped;
        }

        if events
            .iter()
            .any(|event| matches!(event, Event::GameReset { .. }))
        {
            if let Err(error) = self.store.erase() {
                warn!(%error, "failed to erase previous session");
            }
        }

        match self.save(&capture()) {
            Ok(()) => {
                debug!("session saved");
                SaveOutcome::Saved
            }
            Err(error) => {
                warn!(%error, "failed to save session");
                SaveOutcome::Failed
            }
        }
    }

    /// Encodes and writes `snapshot` immediately.
    pub fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), PersistenceError> {
        let payload = encode_snapshot(snapshot)?;
        self.store.save(&payload)?;
        Ok(())
    }

    /// Reads the stored session, surfacing every failure.
    pub fn load(&self) -> Result<Option<SessionSnapshot>, PersistenceError> {
        match self.store.load()? {
            Some(payload) => Ok(Some(decode_snapshot(&payload)?)),
            None => Ok(None),
        }
    }

    /// Reads the stored session, treating missing or unreadable data as no
    /// saved game.
    pub fn load_session(&self) -> Option<SessionSnapshot> {
        match self.load() {
            Ok(Some(snapshot)) => {
                info!(saved_at = snapshot.saved_at, "restoring saved session");
                Some(snapshot)
            }
            Ok(None) => {
                info!("no saved session found");
                None
            }
            Err(error) => {
                warn!(%error, "ignoring unreadable saved session");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomerge_core::{CellCoord, GeoPosition, InteractionError, MovementMode, Token};

    fn snapshot(saved_at: u64) -> SessionSnapshot {
        SessionSnapshot::fresh(GeoPosition::new(10.0, 20.0), MovementMode::Step, saved_at)
    }

    #[test]
    fn rejected_interactions_do_not_save() {
        let mut persistence = Persistence::new(MemoryStore::new());
        let events = [Event::InteractionRejected {
            cell: CellCoord::new(0, 0),
            reason: InteractionError::NothingToDo,
        }];

        let outcome = persistence.handle(&events, || panic!("no capture expected"));

        assert_eq!(outcome, SaveOutcome::Skipped);
        assert_eq!(persistence.store().payload(), None);
    }

    #[test]
    fn mutating_events_save_the_captured_snapshot() {
        let mut persistence = Persistence::new(MemoryStore::new());
        let events = [Event::TokenCollected {
            cell: CellCoord::new(1, 2),
            token: Token::BASE,
        }];

        let outcome = persistence.handle(&events, || snapshot(5));

        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(persistence.load().expect("load"), Some(snapshot(5)));
    }

    #[test]
    fn corrupt_payload_loads_as_no_session() {
        let persistence = Persistence::new(MemoryStore::with_payload("geomerge:v1:%%%"));

        assert!(matches!(
            persistence.load(),
            Err(PersistenceError::Snapshot(SnapshotError::InvalidEncoding(_)))
        ));
        assert_eq!(persistence.load_session(), None);
    }
}
