//! Periodic flush timer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{RecvTimeoutError, Sender};
use eventdepot_core::DepotError;
use parking_lot::Mutex;
use tracing::debug;

use crate::SendThrottle;

enum Control {
    Suspend,
    Resume,
    Shutdown,
}

/// Calls `tick` once per send period, re-reading the period from the
/// throttle before every wait. Suspending stops the timer until resumed; a
/// resume restarts the full period.
pub struct FlushScheduler {
    control: Sender<Control>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    /// Start the timer thread. The thread exits when `tick` returns `false`,
    /// on shutdown, or when the scheduler is dropped.
    pub fn spawn<F>(throttle: Arc<SendThrottle>, mut tick: F) -> Result<Self, DepotError>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (control, commands) = crossbeam_channel::unbounded();
        let timer = thread::Builder::new()
            .name("eventdepot-flush".to_string())
            .spawn(move || {
                let mut suspended = false;
                loop {
                    let command = if suspended {
                        commands.recv().map_err(|_| RecvTimeoutError::Disconnected)
                    } else {
                        commands.recv_timeout(throttle.period())
                    };

                    match command {
                        Ok(Control::Suspend) => suspended = true,
                        Ok(Control::Resume) => suspended = false,
                        Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            if !tick() {
                                break;
                            }
                        }
                    }
                }
                debug!("Flush scheduler stopped");
            })?;

        Ok(Self {
            control,
            timer: Mutex::new(Some(timer)),
        })
    }

    pub fn suspend(&self) {
        let _ = self.control.send(Control::Suspend);
    }

    pub fn resume(&self) {
        let _ = self.control.send(Control::Resume);
    }

    pub fn shutdown(&self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(timer) = self.timer.lock().take() {
            let _ = timer.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_throttle() -> Arc<SendThrottle> {
        Arc::new(SendThrottle::new(
            Duration::from_millis(10),
            Duration::from_millis(50),
        ))
    }

    #[test]
    fn test_ticks_until_shutdown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let scheduler = FlushScheduler::spawn(fast_throttle(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        thread::sleep(Duration::from_millis(200));
        scheduler.shutdown();
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected several ticks, saw {seen}");

        thread::sleep(Duration::from_millis(50));
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_suspend_stops_ticking() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let scheduler = FlushScheduler::spawn(fast_throttle(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        scheduler.suspend();
        thread::sleep(Duration::from_millis(30));
        let before = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(ticks.load(Ordering::SeqCst), before);

        scheduler.resume();
        thread::sleep(Duration::from_millis(150));
        assert!(ticks.load(Ordering::SeqCst) > before);
        scheduler.shutdown();
    }

    #[test]
    fn test_tick_returning_false_stops_timer() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let scheduler = FlushScheduler::spawn(fast_throttle(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        scheduler.shutdown();
    }
}
