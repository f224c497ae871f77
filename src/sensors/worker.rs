//! Periodic sensor poller.
//!
//! ```text
//!  ┌────────────── sensor-worker thread ──────────────┐
//!  │ loop {                                           │
//!  │   for sensor in sensors {                        │
//!  │     poll ── Ok ──▶ readings.send()  (blocks)     │──▶ controller
//!  │          └─ Err ─▶ warn!, skip                   │
//!  │   }                                              │
//!  │   sleep(interval)   (wakes early on stop)        │
//!  │ }                                                │
//!  └──────────────────────────────────────────────────┘
//! ```
//!
//! The reading channel holds a single slot, so a slow consumer throttles
//! the worker instead of queueing stale readings.  Stop is observed between
//! cycles; a send still blocked on a departed consumer is released too.

use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future;
use log::{info, warn};

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::task;

use super::{Sensor, SensorReading};

/// Reading channel depth.
pub const READING_DEPTH: usize = 1;

/// Channel carrying readings from the worker to the controller.
pub type ReadingChannel = Channel<CriticalSectionRawMutex, SensorReading, READING_DEPTH>;

/// Longest uninterrupted sleep between stop checks.
const STOP_CHECK: Duration = Duration::from_millis(50);

/// Sensor set under construction.  [`start`](Self::start) consumes it, so
/// sensors cannot be added to a running worker.
pub struct SensorWorker {
    sensors: Vec<Sensor>,
    interval: Duration,
    readings: Arc<ReadingChannel>,
}

impl SensorWorker {
    pub fn new(interval: Duration) -> Self {
        Self {
            sensors: Vec::new(),
            interval,
            readings: Arc::new(Channel::new()),
        }
    }

    /// Append a sensor.  Poll order follows insertion order.
    pub fn add(&mut self, sensor: impl Into<Sensor>) -> &mut Self {
        self.sensors.push(sensor.into());
        self
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// The stream readings will be emitted on.
    pub fn readings(&self) -> Arc<ReadingChannel> {
        Arc::clone(&self.readings)
    }

    /// Spawn the polling thread.
    pub fn start(self) -> Result<WorkerHandle, Error> {
        let stop = CancelToken::new();
        let readings = Arc::clone(&self.readings);

        let thread = {
            let stop = stop.clone();
            task::spawn_named("sensor-worker", task::LOOP_STACK_KB, move || {
                self.run(&stop);
            })?
        };

        Ok(WorkerHandle {
            stop,
            thread: Some(thread),
            readings,
        })
    }

    fn run(self, stop: &CancelToken) {
        info!(
            "Sensor worker started ({} sensors, interval {:?})",
            self.sensors.len(),
            self.interval
        );

        'cycles: while !stop.is_cancelled() {
            for sensor in &self.sensors {
                match sensor.poll() {
                    Ok(reading) => {
                        if !deliver(&self.readings, stop, reading) {
                            break 'cycles;
                        }
                    }
                    Err(e) => warn!("{} read failed: {}", sensor, e),
                }
            }
            sleep_unless_stopped(self.interval, stop);
        }

        info!("Sensor worker stopped");
    }
}

/// Send one reading, giving up if `stop` fires while the channel is full.
fn deliver(readings: &ReadingChannel, stop: &CancelToken, reading: SensorReading) -> bool {
    future::block_on(future::or(
        async {
            readings.send(reading).await;
            true
        },
        async {
            stop.cancelled().await;
            false
        },
    ))
}

fn sleep_unless_stopped(total: Duration, stop: &CancelToken) {
    let deadline = Instant::now() + total;
    while !stop.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(STOP_CHECK));
    }
}

/// Control handle for a running worker.  Dropping it requests a stop
/// without waiting for the thread.
pub struct WorkerHandle {
    stop: CancelToken,
    thread: Option<JoinHandle<()>>,
    readings: Arc<ReadingChannel>,
}

impl WorkerHandle {
    pub fn readings(&self) -> Arc<ReadingChannel> {
        Arc::clone(&self.readings)
    }

    /// Request termination.  Takes effect at the next cycle boundary.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Stop and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Sensor worker panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
