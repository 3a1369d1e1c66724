//! Typewriter reveal scheduling.
//!
//! The timer task never touches the session. It only pushes a tick event
//! into the UI's event channel; the UI loop then calls
//! [`Session::advance_reveal`](crate::state::Session::advance_reveal) and
//! disarms the timer once nothing is left to reveal.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Approximate number of ticks a full reveal takes, whatever the length
pub const REVEAL_TICKS: usize = 180;

pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(20);

/// Characters revealed per tick for content of `len` characters
pub fn step_size(len: usize) -> usize {
    len.div_ceil(REVEAL_TICKS).max(1)
}

/// Single-owner handle to the repeating reveal timer.
///
/// At most one timer task runs per handle: arming replaces any running task
/// and dropping the handle aborts it.
#[derive(Debug)]
pub struct RevealTimer {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl RevealTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Starts sending `event` on every tick, cancelling any prior timer
    pub fn arm<E>(&mut self, tx: UnboundedSender<E>, event: E)
    where
        E: Clone + Send + 'static,
    {
        self.disarm();
        let period = self.interval;
        tracing::debug!(?period, "arming reveal timer");
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of a tokio interval fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!("disarming reveal timer");
            task.abort();
        }
    }
}

impl Default for RevealTimer {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_INTERVAL)
    }
}

impl Drop for RevealTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_step_size() {
        assert_eq!(step_size(0), 1);
        assert_eq!(step_size(5), 1);
        assert_eq!(step_size(180), 1);
        assert_eq!(step_size(181), 2);
        assert_eq!(step_size(1000), 6);
    }

    #[test]
    fn test_reveal_takes_about_180_ticks() {
        for len in [181usize, 500, 3600, 10_007] {
            let ticks = len.div_ceil(step_size(len));
            assert!(ticks <= REVEAL_TICKS, "len {len} took {ticks} ticks");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_timer_sends_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RevealTimer::new(Duration::from_millis(20));
        timer.arm(tx, ());
        assert!(timer.is_armed());

        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(20)).await;
            assert_eq!(rx.recv().await, Some(()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let mut timer = RevealTimer::new(Duration::from_millis(20));
        timer.arm(tx, ());
        timer.disarm();
        assert!(!timer.is_armed());

        // The aborted task drops its sender, closing the channel
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RevealTimer::new(Duration::from_millis(20));
        timer.arm(tx.clone(), 1u8);
        timer.arm(tx, 2u8);

        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(rx.recv().await, Some(2));
        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        {
            let mut timer = RevealTimer::default();
            timer.arm(tx, ());
        }
        assert_eq!(rx.recv().await, None);
    }
}
