//! Replay a loaded capture into a sink as if it were arriving live.
//!
//! ```text
//! transport thread ──bounded(CHANNEL_CAPACITY)──▶ ingestion thread ──▶ CaptureData
//!   (paces by timer end time)                      (stops on fatal IngestError)
//! ```
//!
//! The ingestion thread is the only producer of the sink, so every timer
//! chain sees exactly one writer. Dropping either end of the channel stops
//! the other thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use livescope_common::CaptureEvent;
use log::{debug, error, info};

use crate::capture::{CaptureData, CaptureListener};
use crate::domain::IngestError;

/// Events buffered between transport and ingestion.
pub const CHANNEL_CAPACITY: usize = 1000;

/// Longest uninterrupted sleep while pacing.
const PACING_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplayOptions {
    /// Playback speed relative to the recorded timeline. `None` replays as
    /// fast as ingestion keeps up.
    pub speed: Option<f64>,
}

/// Outcome of a finished replay.
#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub events_sent: usize,
    pub events_ingested: usize,
    pub timers_rejected: usize,
    /// Set when ingestion ended early on a fatal error.
    pub fatal: Option<IngestError>,
}

#[derive(Debug, Default)]
struct IngestSummary {
    events_ingested: usize,
    timers_rejected: usize,
    fatal: Option<IngestError>,
}

/// A running replay.
pub struct Replay {
    stop: Arc<AtomicBool>,
    transport: JoinHandle<usize>,
    ingestion: JoinHandle<IngestSummary>,
}

impl Replay {
    /// Spawn the transport and ingestion threads.
    #[must_use]
    pub fn start(
        events: Vec<CaptureEvent>,
        data: Arc<CaptureData>,
        options: ReplayOptions,
    ) -> Self {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));

        let transport = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || send_events(events, &tx, options, &stop))
        };
        let ingestion = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || ingest_events(&data, &rx, &stop))
        };

        Self { stop, transport, ingestion }
    }

    /// Ask both threads to stop. Events already queued are still ingested.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// True once ingestion has consumed everything it will consume.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ingestion.is_finished()
    }

    /// Wait for both threads.
    ///
    /// # Errors
    ///
    /// Returns an error if either thread panicked.
    pub fn join(self) -> Result<ReplaySummary> {
        let events_sent =
            self.transport.join().map_err(|_| anyhow!("Replay transport thread panicked"))?;
        let ingest =
            self.ingestion.join().map_err(|_| anyhow!("Replay ingestion thread panicked"))?;
        Ok(ReplaySummary {
            events_sent,
            events_ingested: ingest.events_ingested,
            timers_rejected: ingest.timers_rejected,
            fatal: ingest.fatal,
        })
    }
}

/// Transport loop. Returns the number of events handed to the channel.
fn send_events(
    events: Vec<CaptureEvent>,
    tx: &Sender<CaptureEvent>,
    options: ReplayOptions,
    stop: &AtomicBool,
) -> usize {
    let mut pacer = options.speed.filter(|s| *s > 0.0).map(Pacer::new);
    let mut sent = 0;

    for event in events {
        if stop.load(Ordering::Relaxed) {
            info!("Replay stopped after {sent} events");
            break;
        }
        if let (Some(pacer), CaptureEvent::Timer(timer)) = (pacer.as_mut(), &event) {
            if !pacer.wait_for(timer.end_ns, stop) {
                info!("Replay stopped after {sent} events");
                break;
            }
        }
        if tx.send(event).is_err() {
            debug!("Ingestion hung up; transport exiting");
            break;
        }
        sent += 1;
    }
    sent
}

/// Ingestion loop. Runs until the channel closes or a fatal error.
fn ingest_events(
    data: &CaptureData,
    rx: &Receiver<CaptureEvent>,
    stop: &AtomicBool,
) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for event in rx {
        match data.handle(event) {
            Ok(()) => summary.events_ingested += 1,
            Err(err) if err.is_fatal() => {
                error!("Capture ingestion stopped: {err}");
                stop.store(true, Ordering::Relaxed);
                summary.fatal = Some(err);
                break;
            }
            // Already logged by the sink
            Err(_) => summary.timers_rejected += 1,
        }
    }
    summary
}

/// Maps recorded timestamps onto wall-clock time.
struct Pacer {
    speed: f64,
    started: Instant,
    first_ns: Option<u64>,
}

impl Pacer {
    fn new(speed: f64) -> Self {
        Self { speed, started: Instant::now(), first_ns: None }
    }

    /// Wall-clock instant `timestamp_ns` is due at, or `None` when that lies
    /// beyond what `Instant` can represent.
    #[allow(clippy::cast_precision_loss)]
    fn due_at(&mut self, timestamp_ns: u64) -> Option<Instant> {
        let first = *self.first_ns.get_or_insert(timestamp_ns);
        let offset_ns = timestamp_ns.saturating_sub(first) as f64 / self.speed;
        let offset = Duration::try_from_secs_f64(offset_ns / 1e9).ok()?;
        self.started.checked_add(offset)
    }

    /// Block until `timestamp_ns` is due. False if stopped first.
    fn wait_for(&mut self, timestamp_ns: u64, stop: &AtomicBool) -> bool {
        let due = self.due_at(timestamp_ns);

        // Sleep in slices so a stop request is honored promptly.
        loop {
            if stop.load(Ordering::Relaxed) {
                return false;
            }
            let now = Instant::now();
            let remaining = match due {
                Some(due) if now >= due => return true,
                Some(due) => due - now,
                None => PACING_SLICE,
            };
            std::thread::sleep(remaining.min(PACING_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConfig, SessionInfo};
    use livescope_common::TimerRecord;

    fn timers(calls: &[(i32, u64, u64)]) -> Vec<CaptureEvent> {
        calls
            .iter()
            .map(|&(tid, start, end)| CaptureEvent::Timer(TimerRecord::new(0x10, tid, start, end)))
            .collect()
    }

    fn data(block_capacity: usize) -> Arc<CaptureData> {
        Arc::new(CaptureData::new(SessionInfo::default(), CaptureConfig { block_capacity }))
    }

    #[test]
    fn test_replay_delivers_every_event() {
        let data = data(4);
        let mut events = timers(&[(1, 0, 10), (2, 5, 20), (1, 10, 12)]);
        events.push(CaptureEvent::ThreadName { thread_id: 1, name: "main".to_owned() });

        let summary = Replay::start(events, Arc::clone(&data), ReplayOptions::default())
            .join()
            .unwrap();

        assert_eq!(summary.events_sent, 4);
        assert_eq!(summary.events_ingested, 4);
        assert!(summary.fatal.is_none());
        assert_eq!(data.function_stats().get(0x10).count, 3);
        assert_eq!(data.thread_name(crate::domain::Tid(1)).as_deref(), Some("main"));
    }

    #[test]
    fn test_malformed_timers_do_not_stop_replay() {
        let data = data(4);
        let events = timers(&[(1, 0, 10), (1, 30, 20), (1, 40, 50)]);

        let summary = Replay::start(events, Arc::clone(&data), ReplayOptions::default())
            .join()
            .unwrap();

        assert_eq!(summary.events_ingested, 2);
        assert_eq!(summary.timers_rejected, 1);
        assert_eq!(data.timers_rejected(), 1);
    }

    #[test]
    fn test_allocation_failure_stops_ingestion() {
        let data = data(usize::MAX / 2);
        let events = timers(&[(1, 0, 10), (1, 10, 20)]);

        let summary = Replay::start(events, Arc::clone(&data), ReplayOptions::default())
            .join()
            .unwrap();

        assert!(matches!(summary.fatal, Some(IngestError::BlockAllocation { .. })));
        assert_eq!(summary.events_ingested, 0);
        assert!(data.is_aborted());
    }

    #[test]
    fn test_paced_replay_follows_timeline() {
        let data = data(4);
        // 40ms of recorded time at double speed.
        let events = timers(&[(1, 0, 0), (1, 0, 40_000_000)]);

        let started = Instant::now();
        Replay::start(events, data, ReplayOptions { speed: Some(2.0) }).join().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stop_interrupts_paced_replay() {
        let data = data(4);
        let events = timers(&[(1, 0, 0), (1, 0, 3_600_000_000_000)]);

        let replay = Replay::start(events, data, ReplayOptions { speed: Some(1.0) });
        replay.stop();
        let summary = replay.join().unwrap();
        assert!(summary.events_sent <= 1);
    }

    #[test]
    fn test_unreachable_due_time_waits_for_stop() {
        let data = data(4);
        let events = timers(&[(1, 0, 0), (1, 0, 1000)]);

        let replay = Replay::start(events, data, ReplayOptions { speed: Some(1e-300) });
        std::thread::sleep(Duration::from_millis(20));
        assert!(!replay.is_finished());
        replay.stop();

        let summary = replay.join().unwrap();
        assert_eq!(summary.events_sent, 1);
        assert_eq!(summary.events_ingested, 1);
    }
}
