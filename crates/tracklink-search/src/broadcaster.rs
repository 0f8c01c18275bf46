//! Live progress delivery.
//!
//! Each job gets its own channel: a bounded backlog of recent events plus a
//! `tokio::sync::broadcast` sender for live fan-out. Subscribers first drain
//! the backlog (optionally from a given sequence number), then follow the live
//! channel. A subscriber that falls behind re-reads the backlog instead of
//! stalling the publisher.

use crate::error::{Result, SearchError};
use crate::event::ProgressEvent;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use tracklink_core::JobId;

/// Default number of events retained per job for replay.
pub const DEFAULT_BACKLOG_CAPACITY: usize = 200;

struct JobChannel {
    backlog: VecDeque<ProgressEvent>,
    next_seq: u64,
    /// `None` once the job has finished; live subscribers then see the end.
    sender: Option<broadcast::Sender<ProgressEvent>>,
}

type Channels = Arc<Mutex<HashMap<JobId, JobChannel>>>;

/// Per-job event fan-out with bounded replay.
pub struct ProgressBroadcaster {
    capacity: usize,
    channels: Channels,
}

impl ProgressBroadcaster {
    /// Create a broadcaster keeping `capacity` events per job.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a job. Publishing to an unregistered job is a no-op.
    pub fn open(&self, job_id: JobId) {
        let (sender, _) = broadcast::channel(self.capacity);
        self.channels
            .lock()
            .expect("acquire lock on progress channels")
            .entry(job_id)
            .or_insert_with(|| JobChannel {
                backlog: VecDeque::with_capacity(self.capacity),
                next_seq: 1,
                sender: Some(sender),
            });
    }

    /// Stamp `event` with the next sequence number and fan it out.
    ///
    /// Never blocks: subscribers that are gone or lagging are not waited on.
    /// Returns the assigned sequence number, or `None` if the job is unknown
    /// or already sealed.
    pub fn publish(&self, mut event: ProgressEvent) -> Option<u64> {
        let mut channels = self.channels.lock().expect("acquire lock on progress channels");
        let channel = channels.get_mut(&event.job_id)?;
        let sender = channel.sender.as_ref()?;

        event.seq = channel.next_seq;
        channel.next_seq += 1;

        if channel.backlog.len() == self.capacity {
            channel.backlog.pop_front();
        }
        channel.backlog.push_back(event.clone());

        let seq = event.seq;
        // no live subscribers is fine
        let _ = sender.send(event);
        Some(seq)
    }

    /// Mark the job's stream finished; subscribers end after the backlog.
    pub fn seal(&self, job_id: JobId) {
        if let Some(channel) = self
            .channels
            .lock()
            .expect("acquire lock on progress channels")
            .get_mut(&job_id)
        {
            channel.sender = None;
            debug!(job_id = %job_id, "Sealed progress channel");
        }
    }

    /// Drop a job's channel and backlog.
    pub fn release(&self, job_id: JobId) {
        self.channels
            .lock()
            .expect("acquire lock on progress channels")
            .remove(&job_id);
    }

    /// Events currently retained for a job.
    #[must_use]
    pub fn backlog(&self, job_id: JobId) -> Vec<ProgressEvent> {
        backlog_since(&self.channels, job_id, 0).into()
    }

    /// Subscribe to a job's events.
    ///
    /// With `since = Some(n)` only events with `seq > n` are delivered;
    /// otherwise the whole retained backlog is replayed first. The stream ends
    /// once the job is sealed and everything has been delivered.
    pub fn subscribe(
        &self,
        job_id: JobId,
        since: Option<u64>,
    ) -> Result<BoxStream<'static, ProgressEvent>> {
        let after = since.unwrap_or(0);

        // replay snapshot and live receiver are taken under one lock so no
        // event falls between them
        let (replay, receiver) = {
            let channels = self.channels.lock().expect("acquire lock on progress channels");
            let channel = channels.get(&job_id).ok_or(SearchError::JobNotFound(job_id))?;
            let replay: VecDeque<ProgressEvent> = channel
                .backlog
                .iter()
                .filter(|e| e.seq > after)
                .cloned()
                .collect();
            (replay, channel.sender.as_ref().map(broadcast::Sender::subscribe))
        };

        let state = Subscription {
            job_id,
            last_seq: after,
            replay,
            receiver,
            channels: Arc::clone(&self.channels),
        };

        Ok(stream::unfold(state, Subscription::next_event).boxed())
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG_CAPACITY)
    }
}

fn backlog_since(channels: &Channels, job_id: JobId, after: u64) -> VecDeque<ProgressEvent> {
    channels
        .lock()
        .expect("acquire lock on progress channels")
        .get(&job_id)
        .map(|c| c.backlog.iter().filter(|e| e.seq > after).cloned().collect())
        .unwrap_or_default()
}

struct Subscription {
    job_id: JobId,
    last_seq: u64,
    replay: VecDeque<ProgressEvent>,
    receiver: Option<broadcast::Receiver<ProgressEvent>>,
    channels: Channels,
}

impl Subscription {
    async fn next_event(mut self) -> Option<(ProgressEvent, Self)> {
        loop {
            if let Some(event) = self.replay.pop_front() {
                if event.seq > self.last_seq {
                    self.last_seq = event.seq;
                    return Some((event, self));
                }
                continue;
            }

            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) if event.seq > self.last_seq => {
                    self.last_seq = event.seq;
                    return Some((event, self));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(job_id = %self.job_id, skipped, "Subscriber lagged, replaying backlog");
                    self.replay = backlog_since(&self.channels, self.job_id, self.last_seq);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
