//! Fixed-rate tick driver.
//!
//! [`TickDriver`] runs [`Simulation::step`] on a worker thread at a fixed
//! period. The simulation is shared behind a mutex so input can be set and
//! state read from other threads between ticks; snapshots are best consumed
//! through the simulation's [`SnapshotBoard`](crate::snapshot::SnapshotBoard).
//!
//! Stopping joins the worker, so no tick executes after [`TickDriver::stop`]
//! returns. Restarting joins the old worker before spawning the new one, so
//! at most one worker ever steps the simulation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::simulation::Simulation;

/// Default tick rate in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<u64>,
}

/// Drives a shared [`Simulation`] from a background thread.
pub struct TickDriver {
    simulation: Arc<Mutex<Simulation>>,
    period: Duration,
    worker: Option<Worker>,
    ticks: u64,
}

impl std::fmt::Debug for TickDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickDriver")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl TickDriver {
    /// Wraps `simulation`, ticking `rate` times per second once started.
    ///
    /// A rate of zero is treated as one.
    #[must_use]
    pub fn new(simulation: Simulation, rate: u32) -> Self {
        Self::shared(Arc::new(Mutex::new(simulation)), rate)
    }

    /// Drives an already shared simulation.
    #[must_use]
    pub fn shared(simulation: Arc<Mutex<Simulation>>, rate: u32) -> Self {
        Self {
            simulation,
            period: Duration::from_secs(1) / rate.max(1),
            worker: None,
            ticks: 0,
        }
    }

    /// Time between ticks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Handle to the driven simulation.
    #[must_use]
    pub fn simulation(&self) -> Arc<Mutex<Simulation>> {
        Arc::clone(&self.simulation)
    }

    /// Locks the simulation, recovering from a poisoned lock.
    #[must_use]
    pub fn lock(&self) -> MutexGuard<'_, Simulation> {
        self.simulation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ticks run by every joined worker so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns `true` while the worker thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts the simulation and the worker. Restarts a running worker.
    pub fn start(&mut self) {
        self.stop();
        self.lock().start();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(self.period);
        let simulation = Arc::clone(&self.simulation);

        let handle = thread::spawn(move || {
            let mut ticks = 0_u64;
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        let mut sim = simulation.lock().unwrap_or_else(PoisonError::into_inner);
                        if sim.step().is_some() {
                            ticks += 1;
                        }
                    }
                }
            }
            ticks
        });

        tracing::info!(period_ms = self.period.as_secs_f64() * 1000.0, "tick driver started");
        self.worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
    }

    /// Stops the worker and the simulation.
    ///
    /// Returns the ticks run by all workers this driver has spawned,
    /// including ones replaced by a restart. No-op when not running.
    pub fn stop(&mut self) -> u64 {
        let Some(worker) = self.worker.take() else {
            return self.ticks;
        };
        // The worker may already be gone; joining is what matters.
        let _ = worker.stop.send(());
        let ticks = worker.handle.join().unwrap_or_else(|_| {
            tracing::error!("tick worker panicked");
            0
        });
        self.ticks += ticks;
        self.lock().stop();
        tracing::info!(ticks, total = self.ticks, "tick driver stopped");
        self.ticks
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
