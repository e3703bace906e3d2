//! Live queries: a result set that is re-read whenever storage reports a
//! relevant change.

use std::future::Future;
use std::pin::Pin;

use storage::StorageChange;
use storage::repository::StorageError;
use tokio::sync::broadcast::{self, error::RecvError};

type Snapshot<T> = Result<Vec<T>, StorageError>;
type Fetch<T> = Box<dyn Fn() -> Pin<Box<dyn Future<Output = Snapshot<T>> + Send>> + Send + Sync>;
type Filter = Box<dyn Fn(&StorageChange) -> bool + Send + Sync>;

/// Stream of snapshots for one query.
///
/// The first call to [`LiveQuery::next`] yields the current result; later calls
/// wait for a matching change and yield the refreshed result.
pub struct LiveQuery<T> {
    changes: broadcast::Receiver<StorageChange>,
    filter: Filter,
    fetch: Fetch<T>,
    primed: bool,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new(
        changes: broadcast::Receiver<StorageChange>,
        filter: impl Fn(&StorageChange) -> bool + Send + Sync + 'static,
        fetch: impl Fn() -> Pin<Box<dyn Future<Output = Snapshot<T>> + Send>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            changes,
            filter: Box::new(filter),
            fetch: Box::new(fetch),
            primed: false,
        }
    }

    /// Next snapshot, or `None` once the change feed is gone.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        if !self.primed {
            self.primed = true;
            return Some((self.fetch)().await);
        }
        loop {
            match self.changes.recv().await {
                Ok(change) if (self.filter)(&change) => return Some((self.fetch)().await),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live query lagged; refreshing");
                    return Some((self.fetch)().await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
