use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One elapsed sweep interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepTick;

/// A periodic timer thread that emits [`SweepTick`]s.
///
/// The ticker never touches the stack itself: the owner drains ticks on its
/// own thread and runs the sweep there. Dropping the ticker cancels the timer
/// and joins the thread.
pub struct SweepTicker {
    stop_tx: Option<Sender<()>>,
    ticks: Receiver<SweepTick>,
    handle: Option<JoinHandle<()>>,
}

impl SweepTicker {
    pub fn start(interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (tick_tx, ticks) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("tstack-sweeper".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if tick_tx.send(SweepTick).is_err() {
                                break;
                            }
                        }
                        // explicit stop, or the ticker was dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "sweeper started");
        Ok(SweepTicker {
            stop_tx: Some(stop_tx),
            ticks,
            handle: Some(handle),
        })
    }

    /// Non-blocking: number of ticks that arrived since the last call.
    pub fn poll(&self) -> usize {
        let mut n = 0;
        loop {
            match self.ticks.try_recv() {
                Ok(SweepTick) => n += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return n,
            }
        }
    }

    /// Block until the next tick or `timeout`. Returns true on a tick.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.ticks.recv_timeout(timeout).is_ok()
    }

    /// Stop the timer thread and wait for it to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("sweeper thread panicked");
            } else {
                tracing::debug!("sweeper stopped");
            }
        }
    }
}

impl Drop for SweepTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn ticks_arrive_at_interval() {
        let ticker = SweepTicker::start(Duration::from_millis(10)).unwrap();
        assert!(ticker.wait(Duration::from_secs(2)));
        assert!(ticker.wait(Duration::from_secs(2)));
    }

    #[test]
    fn poll_drains_pending_ticks() {
        let ticker = SweepTicker::start(Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(60));
        assert!(ticker.poll() >= 1);
    }

    #[test]
    fn cancel_returns_promptly() {
        let ticker = SweepTicker::start(Duration::from_secs(3600)).unwrap();
        let start = Instant::now();
        ticker.cancel();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn no_ticks_before_first_interval() {
        let ticker = SweepTicker::start(Duration::from_secs(3600)).unwrap();
        assert_eq!(ticker.poll(), 0);
    }
}
