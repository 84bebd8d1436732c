//! Outbound pacing scheduler.
//!
//! Sits between the router's outbox and the transport writer. Mesh links are
//! slow and shared, so every frame goes through one queue that enforces a
//! global minimum gap between sends and prefers interactive replies over
//! replication traffic over public broadcasts.
//!
//! * Envelopes carry a category, a priority and an earliest send time.
//! * Bounded queue; on overflow the lowest-priority oldest envelope is dropped.
//! * Priority aging: envelopes waiting past the aging threshold move up one level.
//! * Periodic debug stats; `snapshot` and `shutdown` commands over the same channel.
//!
//! The queue is a `Vec` sorted on each tick; it stays small in practice.

use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

/// A frame ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// `None` for broadcast.
    pub to_node: Option<u32>,
    pub channel: u32,
    pub content: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MessageCategory {
    Direct,      // reply to an interactive user
    Replication, // sync record to a peer BBS
    Broadcast,   // public notice
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    fn escalated(self) -> Priority {
        match self {
            Priority::Low => Priority::Normal,
            Priority::Normal | Priority::High => Priority::High,
        }
    }
}

#[derive(Debug)]
pub struct MessageEnvelope {
    pub category: MessageCategory,
    pub priority: Priority,
    pub earliest: Instant,
    pub enqueued_at: Instant,
    /// Last enqueue or escalation; aging measures from here.
    pub aged_at: Instant,
    pub msg: OutgoingMessage,
}

impl MessageEnvelope {
    pub fn new(
        category: MessageCategory,
        priority: Priority,
        delay: Duration,
        msg: OutgoingMessage,
    ) -> Self {
        let now = Instant::now();
        Self {
            category,
            priority,
            earliest: now + delay,
            enqueued_at: now,
            aged_at: now,
            msg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub min_send_gap_ms: u64,
    pub max_queue: usize,
    pub aging_threshold_ms: u64,
    pub stats_interval_ms: u64,
}

impl SchedulerConfig {
    pub fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_send_gap_ms)
    }
    pub fn aging_threshold(&self) -> Duration {
        Duration::from_millis(self.aging_threshold_ms)
    }
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}

pub enum ScheduleCommand {
    Enqueue(MessageEnvelope),
    Snapshot(oneshot::Sender<SchedulerStats>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub queued: usize,
    pub dispatched_total: u64,
    pub dropped_total: u64,
    pub dropped_overflow: u64,
    pub escalations: u64,
    pub dispatched_replication: u64,
}

#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<ScheduleCommand>,
}

impl SchedulerHandle {
    pub fn enqueue(&self, env: MessageEnvelope) {
        if self.tx.send(ScheduleCommand::Enqueue(env)).is_err() {
            warn!("scheduler stopped; dropping message");
        }
    }

    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(ScheduleCommand::Shutdown(tx));
        let _ = rx.await;
    }

    pub async fn snapshot(&self) -> Option<SchedulerStats> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(ScheduleCommand::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }
}

/// Index of the envelope to drop on overflow: lowest priority, then oldest.
fn overflow_victim(queue: &[MessageEnvelope]) -> Option<usize> {
    queue
        .iter()
        .enumerate()
        .max_by(|(ai, a), (bi, b)| {
            a.priority
                .cmp(&b.priority)
                .then(b.enqueued_at.cmp(&a.enqueued_at))
                .then(bi.cmp(ai))
        })
        .map(|(i, _)| i)
}

/// Raise every envelope that has waited `threshold` since it last aged by one
/// priority level. Returns the number of escalations.
fn age(queue: &mut [MessageEnvelope], now: Instant, threshold: Duration) -> u64 {
    let mut escalations = 0;
    for env in queue.iter_mut() {
        if env.priority != Priority::High && now.duration_since(env.aged_at) >= threshold {
            env.priority = env.priority.escalated();
            env.aged_at = now;
            escalations += 1;
        }
    }
    escalations
}

pub fn start_scheduler(
    cfg: SchedulerConfig,
    outgoing: mpsc::UnboundedSender<OutgoingMessage>,
) -> SchedulerHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<ScheduleCommand>();
    let handle = SchedulerHandle { tx };

    tokio::spawn(async move {
        let mut last_sent: Option<Instant> = None;
        let mut queue: Vec<MessageEnvelope> = Vec::new();
        let mut stats = SchedulerStats::default();
        const TICK: Duration = Duration::from_millis(50);
        let mut last_stats_log = Instant::now();
        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(ScheduleCommand::Enqueue(env)) => {
                            if queue.len() >= cfg.max_queue {
                                if let Some(victim) = overflow_victim(&queue) {
                                    queue.remove(victim);
                                    stats.dropped_total += 1;
                                    stats.dropped_overflow += 1;
                                    warn!("scheduler overflow: dropped one message (queue_full={})", queue.len());
                                }
                            }
                            queue.push(env);
                        }
                        Some(ScheduleCommand::Snapshot(resp)) => {
                            let _ = resp.send(SchedulerStats { queued: queue.len(), ..stats.clone() });
                        }
                        Some(ScheduleCommand::Shutdown(done)) => {
                            let _ = done.send(());
                            break;
                        }
                        // every handle dropped
                        None => break,
                    }
                }
                _ = tokio::time::sleep(TICK) => {}
            }
            if queue.is_empty() {
                continue;
            }
            let now = Instant::now();

            if cfg.stats_interval_ms > 0 && now.duration_since(last_stats_log) >= cfg.stats_interval() {
                debug!(
                    "scheduler stats: queued={} dispatched_total={} replication={} dropped_total={} overflow={} escalations={}",
                    queue.len(),
                    stats.dispatched_total,
                    stats.dispatched_replication,
                    stats.dropped_total,
                    stats.dropped_overflow,
                    stats.escalations
                );
                last_stats_log = now;
            }

            stats.escalations += age(&mut queue, now, cfg.aging_threshold());

            queue.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.earliest.cmp(&b.earliest)));

            if let Some(pos) = queue.iter().position(|e| e.earliest <= now) {
                if let Some(last) = last_sent {
                    if now < last + cfg.min_gap() {
                        continue;
                    }
                }
                let ready = queue.remove(pos);
                let category = ready.category;
                if outgoing.send(ready.msg).is_err() {
                    warn!("outgoing channel closed; dropping message");
                    stats.dropped_total += 1;
                } else {
                    stats.dispatched_total += 1;
                    if category == MessageCategory::Replication {
                        stats.dispatched_replication += 1;
                    }
                    last_sent = Some(now);
                }
            }
        }
        debug!("scheduler loop terminated");
    });

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(to: Option<u32>, content: &str) -> OutgoingMessage {
        OutgoingMessage {
            to_node: to,
            channel: 0,
            content: content.into(),
        }
    }

    fn cfg(max_queue: usize) -> SchedulerConfig {
        SchedulerConfig {
            min_send_gap_ms: 0,
            max_queue,
            aging_threshold_ms: 60_000,
            stats_interval_ms: 0,
        }
    }

    #[test]
    fn aging_keeps_original_enqueue_order_for_drops() {
        let older = MessageEnvelope::new(MessageCategory::Broadcast, Priority::Low, Duration::from_secs(5), msg(None, "older"));
        let mut newer = MessageEnvelope::new(MessageCategory::Broadcast, Priority::Low, Duration::ZERO, msg(None, "newer"));
        newer.enqueued_at = older.enqueued_at + Duration::from_secs(1);
        newer.aged_at = newer.enqueued_at;
        let now = newer.enqueued_at + Duration::from_secs(1);

        // queue order follows send time, so the older envelope sits last
        let mut queue = vec![newer, older];
        assert_eq!(age(&mut queue, now, Duration::from_millis(500)), 2);
        assert!(queue.iter().all(|e| e.priority == Priority::Normal && e.aged_at == now));
        assert_eq!(overflow_victim(&queue), Some(1));
        assert_eq!(queue[1].msg.content, "older");

        // just aged: nothing moves until another threshold passes
        assert_eq!(age(&mut queue, now, Duration::from_millis(500)), 0);
    }

    #[test]
    fn overflow_victim_is_lowest_priority_oldest() {
        let queue = vec![
            MessageEnvelope::new(MessageCategory::Broadcast, Priority::Low, Duration::ZERO, msg(None, "old low")),
            MessageEnvelope::new(MessageCategory::Direct, Priority::High, Duration::ZERO, msg(Some(1), "hi")),
            MessageEnvelope::new(MessageCategory::Broadcast, Priority::Low, Duration::ZERO, msg(None, "new low")),
        ];
        assert_eq!(overflow_victim(&queue), Some(0));
    }

    #[tokio::test]
    async fn direct_preempts_queued_broadcast() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = start_scheduler(cfg(8), tx);
        let delay = Duration::from_millis(80);
        handle.enqueue(MessageEnvelope::new(MessageCategory::Broadcast, Priority::Low, delay, msg(None, "bcast")));
        handle.enqueue(MessageEnvelope::new(MessageCategory::Direct, Priority::High, delay, msg(Some(7), "dm")));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.content, "dm");
        assert_eq!(second.content, "bcast");
        let stats = handle.snapshot().await.unwrap();
        assert_eq!(stats.dispatched_total, 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn overflow_drops_and_counts() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = start_scheduler(cfg(2), tx);
        let later = Duration::from_secs(60);
        for i in 0..3 {
            handle.enqueue(MessageEnvelope::new(
                MessageCategory::Replication,
                Priority::Normal,
                later,
                msg(Some(i), "sync"),
            ));
        }
        let stats = handle.snapshot().await.unwrap();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.dropped_overflow, 1);
        handle.shutdown().await;
    }
}
