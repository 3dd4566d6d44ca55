use std::time::Duration;

use tokio::task::AbortHandle;

/// Trailing-edge debounce holding at most one pending task.
///
/// Every [`schedule`](Self::schedule) aborts the pending task and hands out a new
/// ticket; only the task carrying the latest ticket may be acted upon.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    pending: Option<AbortHandle>,
    ticket: u64,
}

impl DebounceTimer {
    /// Run `fire(ticket)` after `delay` unless rescheduled or cancelled first.
    pub fn schedule<F>(&mut self, delay: Duration, fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.ticket += 1;
        let ticket = self.ticket;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(ticket);
        });
        self.pending = Some(task.abort_handle());
        ticket
    }

    /// Abort the pending task. Returns false when nothing was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().inspect(AbortHandle::abort).is_some()
    }

    /// Consume `ticket` if it belongs to the pending task.
    ///
    /// A task can fire and queue its message just before being superseded, so the
    /// receiver checks the ticket rather than trusting the abort.
    pub fn take_fired(&mut self, ticket: u64) -> bool {
        if self.pending.is_some() && ticket == self.ticket {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn timer_with_channel() -> (DebounceTimer, mpsc::UnboundedSender<u64>, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (DebounceTimer::default(), tx, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_schedule_fires() {
        let (mut timer, tx, mut rx) = timer_with_channel();
        for _ in 0..3 {
            let tx = tx.clone();
            timer.schedule(Duration::from_millis(500), move |t| {
                let _ = tx.send(t);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        drop(tx);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, 3);
        assert!(timer.take_fired(fired));
        assert!(!timer.cancel(), "Fired task is no longer pending");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (mut timer, tx, mut rx) = timer_with_channel();
        timer.schedule(Duration::from_millis(500), move |t| {
            let _ = tx.send(t);
        });
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_is_rejected() {
        let (mut timer, tx, _rx) = timer_with_channel();
        let first = timer.schedule(Duration::from_millis(10), |_| {});
        let second = timer.schedule(Duration::from_millis(10), move |t| {
            let _ = tx.send(t);
        });

        assert!(!timer.take_fired(first));
        assert!(timer.take_fired(second));
        assert!(!timer.take_fired(second));
    }
}
