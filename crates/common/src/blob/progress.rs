use std::sync::Arc;

use tokio::sync::watch;

/// Snapshot of a transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferProgress {
    pub transferred: u64,
    /// Total size, when the source knows it up front
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completed fraction in `0.0..=1.0`, if the total is known
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.transferred as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Publishes [`TransferProgress`] updates to any number of watchers
///
/// Updates never fail: with nobody watching they are simply recorded.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<TransferProgress>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl ProgressReporter {
    pub fn new() -> (Self, watch::Receiver<TransferProgress>) {
        let (tx, rx) = watch::channel(TransferProgress::default());
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// A reporter nobody is listening to yet
    pub fn silent() -> Self {
        Self::new().0
    }

    pub fn subscribe(&self) -> watch::Receiver<TransferProgress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> TransferProgress {
        *self.tx.borrow()
    }

    pub fn set_total(&self, total: Option<u64>) {
        self.tx.send_modify(|p| p.total = total);
    }

    pub fn advance(&self, bytes: u64) {
        self.tx
            .send_modify(|p| p.transferred = p.transferred.saturating_add(bytes));
    }

    /// Restart counting at zero with a new total
    pub fn reset(&self, total: Option<u64>) {
        self.tx.send_replace(TransferProgress {
            transferred: 0,
            total,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fraction() {
        let p = TransferProgress {
            transferred: 25,
            total: Some(100),
        };
        assert_eq!(p.fraction(), Some(0.25));
        assert_eq!(TransferProgress::default().fraction(), None);
        let empty = TransferProgress {
            transferred: 0,
            total: Some(0),
        };
        assert_eq!(empty.fraction(), Some(1.0));
    }

    #[tokio::test]
    async fn test_watchers_see_updates() {
        let (reporter, mut rx) = ProgressReporter::new();
        reporter.set_total(Some(10));
        reporter.advance(4);
        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            TransferProgress {
                transferred: 4,
                total: Some(10)
            }
        );

        let late = reporter.clone().subscribe();
        reporter.advance(6);
        assert_eq!(late.borrow().transferred, 10);
    }

    #[test]
    fn test_silent_reporter_records() {
        let reporter = ProgressReporter::silent();
        reporter.advance(3);
        reporter.advance(3);
        assert_eq!(reporter.current().transferred, 6);
        reporter.reset(None);
        assert_eq!(reporter.current(), TransferProgress::default());
    }
}
