//! Change notifications backing live-updating queries.

use quiz_core::model::{AttemptId, QuizId};
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 64;

/// A committed write, published after the backend accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChange {
    QuizSaved(QuizId),
    /// The quiz and all of its attempts are gone.
    QuizDeleted(QuizId),
    AttemptAppended {
        quiz_id: QuizId,
        attempt_id: AttemptId,
    },
}

impl StorageChange {
    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        match self {
            StorageChange::QuizSaved(id) | StorageChange::QuizDeleted(id) => *id,
            StorageChange::AttemptAppended { quiz_id, .. } => *quiz_id,
        }
    }

    #[must_use]
    pub fn touches_quizzes(&self) -> bool {
        matches!(
            self,
            StorageChange::QuizSaved(_) | StorageChange::QuizDeleted(_)
        )
    }
}

/// Broadcast channel shared by every repository of one `Storage`.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StorageChange>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Publishes a change. Having no subscribers is not an error.
    pub fn publish(&self, change: StorageChange) {
        let _ = self.tx.send(change);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
