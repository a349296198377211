//! Ordered progress event stream.
//!
//! One internal event-producing core; callers consume it either by awaiting
//! events (`next_event`) or by draining into a callback (`for_each`). Both
//! are adapters over the same ordered sequence; pipeline logic is never
//! duplicated per consumption style.

use flipscope_core::{Opportunity, ScanCounters};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// An event in a scan's append-only progress stream.
///
/// Exactly one of `Complete`/`Error` terminates the stream, always last.
/// Events are delivered at-most-once; there is no replay or resume.
/// Reconnecting consumers use the status/poll surface instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Step progress with a monotonically non-decreasing percentage
    Progress {
        /// Human-readable step description
        message: String,
        /// Completion percentage, 0-100
        percent: u8,
        /// Counters snapshot at emission time
        counters: ScanCounters,
    },
    /// A discovered opportunity, emitted in discovery order
    Opportunity {
        /// The persisted opportunity
        opportunity: Box<Opportunity>,
    },
    /// Successful terminal event
    Complete {
        /// Final counters
        counters: ScanCounters,
        /// Summary message
        message: String,
    },
    /// Failure (or cancellation) terminal event
    Error {
        /// Terminal error message
        message: String,
    },
}

/// Create a connected sender/stream pair for one scan.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender {
            tx,
            last_percent: 0,
            terminated: false,
        },
        ProgressStream { rx },
    )
}

/// Single-producer ordered event sink.
///
/// Enforces the stream invariants: percent never decreases, and nothing is
/// emitted after the terminal event.
#[derive(Debug)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    last_percent: u8,
    terminated: bool,
}

impl ProgressSender {
    /// Emit a progress step.
    ///
    /// A percentage lower than a previously emitted one indicates an
    /// orchestrator bug; it is logged and clamped up rather than emitted
    /// out of order.
    pub fn progress(&mut self, message: impl Into<String>, percent: u8, counters: ScanCounters) {
        if self.terminated {
            tracing::warn!("Progress event after terminal event dropped");
            return;
        }

        let percent = percent.min(100);
        if percent < self.last_percent {
            tracing::warn!(
                percent,
                last = self.last_percent,
                "Non-monotonic progress percentage clamped"
            );
        }
        let percent = percent.max(self.last_percent);
        self.last_percent = percent;

        self.send(ProgressEvent::Progress {
            message: message.into(),
            percent,
            counters,
        });
    }

    /// Emit a discovered opportunity.
    pub fn opportunity(&mut self, opportunity: Opportunity) {
        if self.terminated {
            tracing::warn!("Opportunity event after terminal event dropped");
            return;
        }
        self.send(ProgressEvent::Opportunity {
            opportunity: Box::new(opportunity),
        });
    }

    /// Emit the successful terminal event and close the stream.
    pub fn complete(&mut self, counters: ScanCounters, message: impl Into<String>) {
        if self.terminated {
            tracing::warn!("Duplicate terminal event dropped");
            return;
        }
        self.terminated = true;
        self.send(ProgressEvent::Complete {
            counters,
            message: message.into(),
        });
    }

    /// Emit the failure terminal event and close the stream.
    pub fn error(&mut self, message: impl Into<String>) {
        if self.terminated {
            tracing::warn!("Duplicate terminal event dropped");
            return;
        }
        self.terminated = true;
        self.send(ProgressEvent::Error {
            message: message.into(),
        });
    }

    /// Whether a terminal event has been emitted.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn send(&self, event: ProgressEvent) {
        // A disconnected consumer is not an engine failure; the scan keeps
        // running and results remain available via the status surface.
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress consumer disconnected, event dropped");
        }
    }
}

/// Consumer half of a scan's progress stream.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressStream {
    /// Await the next event. Returns `None` once the stream is closed after
    /// its terminal event.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Drain the stream into a callback until it closes.
    pub async fn for_each<F>(mut self, mut callback: F)
    where
        F: FnMut(ProgressEvent),
    {
        while let Some(event) = self.rx.recv().await {
            callback(event);
        }
    }

    /// Collect every remaining event. Only returns once the sender is
    /// dropped; intended for tests and short-lived scans.
    pub async fn collect(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (mut sender, mut stream) = progress_channel();
        let counters = ScanCounters::default();

        sender.progress("loading", 0, counters);
        sender.progress("scanning", 50, counters);
        sender.complete(counters, "done");

        assert!(matches!(
            stream.next_event().await,
            Some(ProgressEvent::Progress { percent: 0, .. })
        ));
        assert!(matches!(
            stream.next_event().await,
            Some(ProgressEvent::Progress { percent: 50, .. })
        ));
        assert!(matches!(
            stream.next_event().await,
            Some(ProgressEvent::Complete { .. })
        ));
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_percent_is_clamped_monotonic() {
        let (mut sender, stream) = progress_channel();
        let counters = ScanCounters::default();

        sender.progress("a", 40, counters);
        sender.progress("b", 20, counters);
        sender.progress("c", 60, counters);
        drop(sender);

        let percents: Vec<u8> = stream
            .collect()
            .await
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect();

        assert_eq!(percents, vec![40, 40, 60]);
    }

    #[tokio::test]
    async fn test_nothing_emitted_after_terminal() {
        let (mut sender, stream) = progress_channel();
        let counters = ScanCounters::default();

        sender.error("boom");
        sender.progress("late", 90, counters);
        sender.complete(counters, "late");
        drop(sender);

        let events = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ProgressEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_percent_capped_at_100() {
        let (mut sender, mut stream) = progress_channel();
        sender.progress("overflow", 150, ScanCounters::default());

        assert!(matches!(
            stream.next_event().await,
            Some(ProgressEvent::Progress { percent: 100, .. })
        ));
    }

    #[tokio::test]
    async fn test_for_each_adapter_sees_all_events() {
        let (mut sender, stream) = progress_channel();
        let counters = ScanCounters::default();

        sender.progress("a", 10, counters);
        sender.complete(counters, "done");
        drop(sender);

        let mut seen = Vec::new();
        stream.for_each(|event| seen.push(event)).await;
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_consumer_does_not_panic() {
        let (mut sender, stream) = progress_channel();
        drop(stream);

        sender.progress("a", 10, ScanCounters::default());
        sender.complete(ScanCounters::default(), "done");
    }

    #[test]
    fn test_event_serialization_tags() {
        let event = ProgressEvent::Error {
            message: "boom".to_string(),
        };
        let json = serde_json::to_string(&event).expect("serialize event");
        assert_eq!(json, r#"{"type":"error","message":"boom"}"#);
    }
}
