//! The periodic ticker driving head traversal.
//!
//! The clock owns no grid state: it only pushes [`WorldMsg::Tick`] onto the
//! world service channel at a fixed interval, so a tick is ordered with all
//! other world operations and never races an evaluation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;

use crate::service::WorldMsg;

#[derive(Clone)]
pub struct Clock {
    inner: Arc<Mutex<ClockInner>>,
}

struct ClockInner {
    interval: Duration,
    running: bool,
    stop_tx: Option<Sender<()>>,
    tick_tx: Sender<WorldMsg>,
}

impl Clock {
    pub fn new(interval_ms: u64, tick_tx: Sender<WorldMsg>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                interval: Duration::from_millis(interval_ms),
                running: false,
                stop_tx: None,
                tick_tx,
            })),
        }
    }

    /// Spawn the ticker thread. Rejects when already running.
    pub fn start(&self) -> Result<(), String> {
        let mut inner = self.inner.lock();
        if inner.running {
            return Err("clock is already running".to_string());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = inner.interval;
        let tick_tx = inner.tick_tx.clone();
        inner.stop_tx = Some(stop_tx);
        inner.running = true;

        thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if tick_tx.send(WorldMsg::Tick).is_err() {
                            break;
                        }
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
        });

        Ok(())
    }

    /// Signal the ticker thread to exit. Rejects when not running.
    pub fn stop(&self) -> Result<(), String> {
        let mut inner = self.inner.lock();
        if !inner.running {
            return Err("clock is not running".to_string());
        }
        inner.running = false;
        // dropping the sender disconnects the stop channel, ending the loop
        inner.stop_tx = None;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    pub fn interval(&self) -> Duration {
        self.inner.lock().interval
    }

    /// Change the tick interval; only allowed while stopped.
    pub fn set_interval(&self, interval_ms: u64) -> Result<(), String> {
        let mut inner = self.inner.lock();
        if inner.running {
            return Err("cannot change interval while clock is running".to_string());
        }
        inner.interval = Duration::from_millis(interval_ms);
        Ok(())
    }
}
