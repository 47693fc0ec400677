use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::InterruptHandle;

use crate::error::{Error, Result};

/// Token that aborts a row query. Clones share state, so one clone can be
/// handed to the code running the query and another kept to cancel it.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
    interrupt: Option<Arc<InterruptHandle>>,
}

impl CancellationSignal {
    /// A signal checked between rows only.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that also interrupts whatever statement is running on the
    /// connection the handle came from.
    pub(crate) fn with_interrupt(handle: InterruptHandle) -> Self {
        Self {
            cancelled: Arc::default(),
            interrupt: Some(Arc::new(handle)),
        }
    }

    /// Mark the signal cancelled and interrupt the running statement, if any.
    /// Row loops see the flag at their next row.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.interrupt {
            handle.interrupt();
        }
    }

    /// Whether `cancel` has been called on this signal or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .field("interrupts", &self.interrupt.is_some())
            .finish()
    }
}

/// Fail fast when an optional signal has already fired.
pub(crate) fn check(signal: Option<&CancellationSignal>) -> Result<()> {
    signal.map_or(Ok(()), CancellationSignal::check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    use crate::db::BookDatabase;
    use crate::error::SqlContext;
    use crate::DatabaseConfig;

    #[test]
    fn clones_share_cancellation() {
        let signal = CancellationSignal::new();
        let other = signal.clone();
        assert!(check(Some(&other)).is_ok());

        signal.cancel();
        assert!(other.is_cancelled());
        assert!(matches!(check(Some(&other)), Err(Error::Cancelled)));
        assert!(check(None).is_ok());
    }

    #[test]
    fn cancel_interrupts_a_running_statement() {
        let db = BookDatabase::open_in_memory(&DatabaseConfig::default()).unwrap();
        let signal = db.cancellation_signal();
        let done = Arc::new(AtomicBool::new(false));
        let canceller = {
            let signal = signal.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(10));
                    signal.cancel();
                }
            })
        };

        // Never finishes on its own.
        let result: Result<i64> = db
            .connection()
            .query_row(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n)
                 SELECT COUNT(*) FROM n",
                [],
                |row| row.get(0),
            )
            .context("failed to count forever");
        done.store(true, Ordering::SeqCst);
        canceller.join().unwrap();

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
