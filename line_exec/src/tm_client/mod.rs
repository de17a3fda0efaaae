//! # Telemetry client
//!
//! Publishes snapshots of the control loop to a set of [`TmSink`]s without
//! ever holding up the loop. Packets go through a bounded queue to a worker
//! thread which owns the sinks; if the queue is full the packet is dropped.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod sinks;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, warn};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc::{self, SyncSender, TrySendError},
    Arc
};
use std::thread::{self, JoinHandle};

// Internal
pub use sinks::*;
use comms_if::tm::{TmPacket, TmSink};
use crate::loop_ctrl::LoopSnapshot;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Fire-and-forget telemetry publisher.
pub struct TmPublisher {
    tx: Option<SyncSender<TmPacket>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

/// Delivery statistics of a [`TmPublisher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TmStats {
    /// Number of packets delivered to a sink
    pub sent: u64,

    /// Number of packets a sink failed to deliver
    pub failed: u64,

    /// Number of packets dropped because the queue was full
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmClientError {
    #[error("Could not start the telemetry worker: {0}")]
    WorkerStartError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmPublisher {
    /// Start the publisher's worker thread.
    ///
    /// At most `queue_len` packets wait for the sinks at any one time.
    pub fn new(
        sinks: Vec<Box<dyn TmSink + Send>>,
        queue_len: usize
    ) -> Result<Self, TmClientError> {
        let (tx, rx) = mpsc::sync_channel::<TmPacket>(queue_len);
        let counters = Arc::new(Counters::default());

        let worker_counters = counters.clone();
        let mut sinks = sinks;

        let worker = thread::Builder::new()
            .name("tm_client".into())
            .spawn(move || {
                // Runs until the publisher drops the sender
                for packet in rx {
                    for sink in sinks.iter_mut() {
                        match sink.send(&packet) {
                            Ok(()) => {
                                worker_counters.sent.fetch_add(1, Ordering::Relaxed);
                            },
                            Err(e) => {
                                let prev = worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                                if prev == 0 {
                                    warn!("Telemetry delivery failed: {}", e);
                                }
                            }
                        }
                    }
                }
            })
            .map_err(TmClientError::WorkerStartError)?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            counters,
        })
    }

    /// Queue a packet for publishing, never blocks.
    ///
    /// Returns false if the packet was dropped.
    pub fn publish(&self, packet: TmPacket) -> bool {
        let result = match self.tx {
            Some(ref tx) => tx.try_send(packet),
            None => return false
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let prev = self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                if prev == 0 {
                    debug!("Telemetry queue full, dropping packets");
                }
                false
            }
        }
    }

    /// Current delivery statistics.
    pub fn stats(&self) -> TmStats {
        TmStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Deliver any queued packets, stop the worker, and return the final
    /// statistics.
    pub fn shutdown(mut self) -> TmStats {
        self.join();
        self.stats()
    }

    fn join(&mut self) {
        // Dropping the sender ends the worker's receive loop
        self.tx.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Telemetry worker panicked");
            }
        }
    }
}

impl Drop for TmPublisher {
    fn drop(&mut self) {
        self.join();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a telemetry packet from a loop snapshot.
pub fn packet_from_snapshot(snapshot: &LoopSnapshot, time_s: f64) -> TmPacket {
    TmPacket {
        time_s,
        cycle: snapshot.cycle,
        sensors: snapshot.sensors.clone(),
        left_duty: snapshot.cmd.left_duty,
        right_duty: snapshot.cmd.right_duty,
        offset: snapshot.offset,
        detected: snapshot.detected,
        turn: snapshot.turn,
        base_speed: snapshot.base_speed,
        state: snapshot.state.to_string(),
    }
}

/// One line summary of a packet, for example `□□□■■□□□ Pos: +0.00 | ON`.
pub fn debug_line(packet: &TmPacket) -> String {
    format!(
        "{} Pos: {:+.2} | {} | L {:5} R {:5}",
        packet.sensor_string(),
        packet.offset,
        if packet.detected { "ON" } else { "LOST" },
        packet.left_duty,
        packet.right_duty
    )
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tm::TmSinkError;
    use std::sync::{Barrier, Mutex};

    fn packet(cycle: u64) -> TmPacket {
        TmPacket {
            time_s: cycle as f64 * 0.01,
            cycle,
            sensors: vec![false, true, true, false],
            left_duty: 9000,
            right_duty: 11000,
            offset: -0.5,
            detected: true,
            turn: 1000.0,
            base_speed: 10000,
            state: "RUNNING".into(),
        }
    }

    /// Sink collecting every packet.
    struct VecSink(Arc<Mutex<Vec<u64>>>);

    impl TmSink for VecSink {
        fn send(&mut self, packet: &TmPacket) -> Result<(), TmSinkError> {
            self.0.lock().unwrap().push(packet.cycle);
            Ok(())
        }
    }

    struct FailingSink;

    impl TmSink for FailingSink {
        fn send(&mut self, _: &TmPacket) -> Result<(), TmSinkError> {
            Err(TmSinkError::Unavailable)
        }
    }

    /// Sink which holds the worker until the test releases it.
    struct BlockingSink {
        entered: Arc<Barrier>,
        release: Arc<Barrier>,
    }

    impl TmSink for BlockingSink {
        fn send(&mut self, _: &TmPacket) -> Result<(), TmSinkError> {
            self.entered.wait();
            self.release.wait();
            Ok(())
        }
    }

    #[test]
    fn test_publish() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tm = TmPublisher::new(
            vec![Box::new(VecSink(seen.clone())), Box::new(FailingSink)],
            8
        ).unwrap();

        for i in 0..3 {
            assert!(tm.publish(packet(i)));
        }

        let stats = tm.shutdown();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(stats, TmStats { sent: 3, failed: 3, dropped: 0 });
    }

    #[test]
    fn test_full_queue_drops() {
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let tm = TmPublisher::new(
            vec![Box::new(BlockingSink {
                entered: entered.clone(),
                release: release.clone()
            })],
            1
        ).unwrap();

        // Worker is now stuck delivering the first packet
        assert!(tm.publish(packet(0)));
        entered.wait();

        // One packet fits in the queue, the rest are dropped
        assert!(tm.publish(packet(1)));
        assert!(!tm.publish(packet(2)));
        assert!(!tm.publish(packet(3)));
        assert_eq!(tm.stats().dropped, 2);

        release.wait();
        entered.wait();
        release.wait();

        let stats = tm.shutdown();
        assert_eq!(stats, TmStats { sent: 2, failed: 0, dropped: 2 });
    }

    #[test]
    fn test_debug_line() {
        let mut p = packet(0);
        assert_eq!(debug_line(&p), "□■■□ Pos: -0.50 | ON | L  9000 R 11000");

        p.detected = false;
        assert!(debug_line(&p).contains("| LOST |"));
    }
}
