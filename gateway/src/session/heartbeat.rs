//! The heartbeat liveness protocol.
//!
//! Two cooperating tasks plus an on-demand path in the reader: the pulse
//! enqueues a beat immediately and then on every interval tick; the
//! heartbeater drains the queue, writes exactly one beat per iteration, and
//! treats a missing acknowledgement as a dead connection. When the server
//! requests a beat, the reader enqueues one directly and counts the request
//! itself as evidence the link is alive.

use super::manager::{Context, Signal};
use crate::error::SessionError;
use accord_model::gateway::{payload::outgoing::Heartbeat, CloseCode};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc::{Receiver, Sender, UnboundedSender},
    time::{self, Instant},
};
use tokio_tungstenite::tungstenite::{
    protocol::{frame::coding::CloseCode as FrameCloseCode, CloseFrame},
    Message,
};

/// Information about the latency of a session's websocket connection.
#[derive(Clone, Debug)]
pub struct Latency {
    average: Option<Duration>,
    heartbeats: u32,
    recent: VecDeque<Duration>,
    received: Option<Instant>,
    sent: Option<Instant>,
}

impl Latency {
    /// Average time to receive an acknowledgement over the session.
    ///
    /// `None` when no heartbeat has been acknowledged yet.
    pub fn average(&self) -> Option<Duration> {
        self.average
    }

    /// Total number of heartbeats sent during this session.
    pub const fn heartbeats(&self) -> u32 {
        self.heartbeats
    }

    /// The 5 most recent round trips, oldest first.
    pub const fn recent(&self) -> &VecDeque<Duration> {
        &self.recent
    }

    /// When the last acknowledgement was received.
    pub const fn received(&self) -> Option<Instant> {
        self.received
    }

    /// When the last heartbeat was sent.
    pub const fn sent(&self) -> Option<Instant> {
        self.sent
    }
}

#[derive(Debug, Default)]
struct HeartbeatTimes {
    received: Option<Instant>,
    recent: VecDeque<u64>,
    sent: Option<Instant>,
}

/// Round-trip bookkeeping shared between the heartbeater and the reader.
#[derive(Debug, Default)]
pub(crate) struct Heartbeats {
    times: Mutex<HeartbeatTimes>,
    total_iterations: AtomicU32,
    total_time_ms: AtomicU64,
}

impl Heartbeats {
    pub fn latency(&self) -> Latency {
        let iterations = self.total_iterations.load(Ordering::Relaxed);
        let total = Duration::from_millis(self.total_time_ms.load(Ordering::Relaxed));
        let times = self.times.lock().expect("heartbeats poisoned");

        Latency {
            average: total.checked_div(iterations),
            heartbeats: iterations,
            recent: times
                .recent
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            received: times.received,
            sent: times.sent,
        }
    }

    /// Record an acknowledgement arriving.
    pub fn receive(&self) {
        let now = Instant::now();
        let mut times = self.times.lock().expect("heartbeats poisoned");
        times.received = Some(now);

        if let Some(sent) = times.sent {
            let millis = u64::try_from(now.saturating_duration_since(sent).as_millis())
                .unwrap_or(u64::MAX);

            self.total_iterations.fetch_add(1, Ordering::Relaxed);
            self.total_time_ms.fetch_add(millis, Ordering::Relaxed);

            if times.recent.len() == 5 {
                times.recent.pop_front();
            }

            times.recent.push_back(millis);
        }
    }

    /// Record a beat going out.
    pub fn send(&self) {
        self.times.lock().expect("heartbeats poisoned").sent = Some(Instant::now());
    }
}

/// Timer task: enqueue the jitter beat immediately, then one beat per
/// interval tick, each carrying the sequence current at enqueue time.
pub(crate) async fn pulse(
    interval: Duration,
    seq: Arc<AtomicU64>,
    beats: Sender<u64>,
    mut context: Context,
    ready: Sender<()>,
) -> Result<(), SessionError> {
    let _ = ready.send(()).await;

    if beats.try_send(seq.load(Ordering::Acquire)).is_err() {
        return Ok(());
    }

    let mut ticker = time::interval_at(Instant::now() + interval, interval);

    loop {
        tokio::select! {
            () = context.done() => return Ok(()),
            _ = ticker.tick() => {
                // A full queue means unsent beats are already waiting; the
                // heartbeater keeps only the newest anyway.
                match beats.try_send(seq.load(Ordering::Acquire)) {
                    Ok(()) | Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
                    Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => return Ok(()),
                }
            }
        }
    }
}

/// Writer task: one beat per iteration, dead-connection detection first.
pub(crate) async fn heartbeater(
    mut beats: Receiver<u64>,
    acks: Arc<AtomicU32>,
    heartbeats: Arc<Heartbeats>,
    tx: UnboundedSender<Message>,
    context: Context,
    ready: Sender<()>,
) -> Result<(), SessionError> {
    let _ = ready.send(()).await;

    let mut done_context = context.clone();

    loop {
        let beat = tokio::select! {
            () = done_context.done() => return Ok(()),
            beat = beats.recv() => match beat {
                Some(beat) => beat,
                None => return Ok(()),
            },
        };

        // No acknowledgement since the last beat went out: the connection is
        // presumed dead.
        if acks.load(Ordering::Acquire) == 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!("heartbeat was not acknowledged; reconnecting");

            let frame = CloseFrame {
                code: FrameCloseCode::Library(CloseCode::RECONNECT),
                reason: "heartbeat ack timeout".into(),
            };
            let _ = tx.send(Message::Close(Some(frame)));
            context.cancel(Signal::Reconnect);

            return Ok(());
        }

        // An ack/tick race may have queued stale beats; keep the newest.
        let mut seq = beat;
        while let Ok(extra) = beats.try_recv() {
            seq = seq.max(extra);
        }

        let payload = Heartbeat::new((seq > 0).then_some(seq));
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(_source) => {
                #[cfg(feature = "tracing")]
                tracing::error!("serializing heartbeat failed: {_source}");

                continue;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(seq, "sending heartbeat");

        if tx.send(Message::Text(json)).is_err() {
            // The socket is gone; the reader will drive the reconnect.
            return Ok(());
        }

        heartbeats.send();
        acks.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::Heartbeats;

    #[test]
    fn latency_tracks_recent_round_trips() {
        let heartbeats = Heartbeats::default();
        assert_eq!(None, heartbeats.latency().average());

        for _ in 0..7 {
            heartbeats.send();
            heartbeats.receive();
        }

        let latency = heartbeats.latency();
        assert_eq!(7, latency.heartbeats());
        assert_eq!(5, latency.recent().len());
        assert!(latency.average().is_some());
        assert!(latency.sent().is_some());
        assert!(latency.received().is_some());
    }
}
