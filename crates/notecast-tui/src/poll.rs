//! Single-slot periodic ticker for status polling.
//!
//! At most one ticker task exists per slot: `start` aborts the previous one
//! before spawning, and each run is tagged with a generation number so a tick
//! already queued by an aborted run can be recognised and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Default)]
pub struct PollSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl PollSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `period`, first tick one period from now.
    /// `make` turns the run's generation into the message to send.
    pub fn start<T, F>(&mut self, period: Duration, tx: mpsc::Sender<T>, make: F) -> u64
    where
        T: Send + 'static,
        F: Fn(u64) -> T + Send + 'static,
    {
        self.stop();
        self.generation += 1;
        let generation = self.generation;
        debug!("poll: start generation={} period={:?}", generation, period);

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(make(generation)).await.is_err() {
                    break;
                }
            }
        }));
        generation
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("poll: stop generation={}", self.generation);
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// True when `generation` belongs to the currently running ticker.
    pub fn accepts(&self, generation: u64) -> bool {
        self.is_active() && generation == self.generation
    }
}

impl Drop for PollSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(2);

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut slot = PollSlot::new();
        let generation = slot.start(PERIOD, tx, |g| g);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(generation));
        assert!(slot.accepts(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_runs_two_tickers() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut slot = PollSlot::new();
        let first = slot.start(PERIOD, tx.clone(), |g| g);
        let second = slot.start(PERIOD, tx, |g| g);
        assert_ne!(first, second);
        assert!(!slot.accepts(first));

        tokio::time::sleep(Duration::from_secs(7)).await;
        let mut ticks = Vec::new();
        while let Ok(g) = rx.try_recv() {
            ticks.push(g);
        }
        assert_eq!(ticks, vec![second, second, second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_ticker() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut slot = PollSlot::new();
        let generation = slot.start(PERIOD, tx, |g| g);
        slot.stop();
        assert!(!slot.is_active());
        assert!(!slot.accepts(generation));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_ticker() {
        let (tx, mut rx) = mpsc::channel(8);
        {
            let mut slot = PollSlot::new();
            slot.start(PERIOD, tx, |g| g);
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(rx.recv().await, None);
    }
}
