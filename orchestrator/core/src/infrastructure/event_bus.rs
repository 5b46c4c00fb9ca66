// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - FIFO queue for mesh events
//
// Backed by a tokio unbounded mpsc channel. Closing the bus enqueues a close
// marker; events published before the marker are still delivered, and every
// receive after it reports the bus as closed.

use crate::domain::events::Event;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::debug;

enum BusMessage {
    Event(Event),
    Close,
}

/// Single-consumer FIFO of [`Event`]s.
pub struct EventBus {
    sender: mpsc::UnboundedSender<BusMessage>,
    receiver: mpsc::UnboundedReceiver<BusMessage>,
    closed: bool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            closed: false,
        }
    }

    /// Enqueue an event
    pub fn publish(&self, event: Event) {
        debug!(topic = %event.topic, source = %event.source, "Publishing event");
        // the receiver lives in `self`, so the channel cannot be closed here
        let _ = self.sender.send(BusMessage::Event(event));
    }

    /// Enqueue the close marker
    pub fn close(&self) {
        let _ = self.sender.send(BusMessage::Close);
    }

    /// Receive the next event, waiting until one is available.
    ///
    /// Returns `None` once the close marker has been reached.
    pub async fn recv(&mut self) -> Option<Event> {
        if self.closed {
            return None;
        }
        match self.receiver.recv().await {
            Some(BusMessage::Event(event)) => Some(event),
            Some(BusMessage::Close) | None => {
                self.closed = true;
                None
            }
        }
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<Event, EventBusError> {
        if self.closed {
            return Err(EventBusError::Closed);
        }
        match self.receiver.try_recv() {
            Ok(BusMessage::Event(event)) => Ok(event),
            Ok(BusMessage::Close) | Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                Err(EventBusError::Closed)
            }
            Err(mpsc::error::TryRecvError::Empty) => Err(EventBusError::Empty),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Event bus is empty")]
    Empty,
    #[error("Event bus is closed")]
    Closed,
}

/// Compiled topic glob.
///
/// A `*` segment matches exactly one non-empty dot-separated segment, and a
/// `*` inside a segment matches any run of non-dot characters. A `**`
/// segment matches any number of segments, including none, so `events.**`
/// matches `events` and `a.**.b` matches `a.b`. Everything else is literal.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    pattern: String,
    regex: Regex,
}

impl TopicPattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^{}$", translate(pattern)))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, topic: &str) -> bool {
        self.regex.is_match(topic)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

fn translate(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('.').collect();
    if segments == ["**"] {
        return ".*".to_string();
    }

    let mut regex = String::new();
    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            // the separator after a leading `**` is part of the optional group
            "**" if i == 0 => regex.push_str(r"(?:.*\.)?"),
            "**" => regex.push_str(r"(?:\..*)?"),
            _ => {
                if i > 0 && !(i == 1 && segments[0] == "**") {
                    regex.push_str(r"\.");
                }
                regex.push_str(&translate_segment(segment));
            }
        }
    }
    regex
}

fn translate_segment(segment: &str) -> String {
    if segment == "*" {
        return "[^.]+".to_string();
    }
    segment
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^.]*")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::board::JsonMap;

    fn event(topic: &str) -> Event {
        Event::new(topic, JsonMap::new(), "test")
    }

    // ── Queue ──

    #[tokio::test]
    async fn test_fifo_order() {
        let mut bus = EventBus::new();
        bus.publish(event("a"));
        bus.publish(event("b"));
        assert_eq!(bus.recv().await.unwrap().topic, "a");
        assert_eq!(bus.try_recv().unwrap().topic, "b");
        assert_eq!(bus.try_recv(), Err(EventBusError::Empty));
    }

    #[tokio::test]
    async fn test_close_after_pending_events() {
        let mut bus = EventBus::new();
        bus.publish(event("a"));
        bus.close();
        bus.publish(event("late"));

        assert_eq!(bus.recv().await.unwrap().topic, "a");
        assert!(bus.recv().await.is_none());
        assert!(bus.is_closed());
        assert_eq!(bus.try_recv(), Err(EventBusError::Closed));
    }

    #[test]
    fn test_try_recv_close_marker() {
        let mut bus = EventBus::new();
        bus.close();
        assert_eq!(bus.try_recv(), Err(EventBusError::Closed));
    }

    // ── Topic patterns ──

    #[test]
    fn test_single_star_matches_one_segment() {
        let pattern = TopicPattern::compile("task.*").unwrap();
        assert!(pattern.matches("task.created"));
        assert!(!pattern.matches("task.created.extra"));
        assert!(!pattern.matches("task"));
        assert!(!pattern.matches("other.created"));
    }

    #[test]
    fn test_double_star_matches_any_depth() {
        let pattern = TopicPattern::compile("task.**").unwrap();
        assert!(pattern.matches("task.created"));
        assert!(pattern.matches("task.a.b.c"));
        assert!(pattern.matches("task"));

        let all = TopicPattern::compile("**").unwrap();
        assert!(all.matches("orchestration.start"));
        assert!(all.matches(""));
    }

    #[test]
    fn test_double_star_matches_zero_segments() {
        let trailing = TopicPattern::compile("events.**").unwrap();
        assert!(trailing.matches("events"));
        assert!(trailing.matches("events.a"));
        assert!(!trailing.matches("eventsX"));

        let middle = TopicPattern::compile("a.**.b").unwrap();
        assert!(middle.matches("a.b"));
        assert!(middle.matches("a.x.y.b"));
        assert!(!middle.matches("ab"));
        assert!(!middle.matches("a.b.c"));

        let leading = TopicPattern::compile("**.done").unwrap();
        assert!(leading.matches("done"));
        assert!(leading.matches("research.step.done"));
        assert!(!leading.matches("undone"));
    }

    #[test]
    fn test_single_star_rejects_empty_segment() {
        let pattern = TopicPattern::compile("orchestration.*").unwrap();
        assert!(!pattern.matches("orchestration."));
        assert!(pattern.matches("orchestration.start"));

        let partial = TopicPattern::compile("fs_*.done").unwrap();
        assert!(partial.matches("fs_.done"));
        assert!(partial.matches("fs_read.done"));
    }

    #[test]
    fn test_literal_and_mixed() {
        let exact = TopicPattern::compile("orchestration.start").unwrap();
        assert!(exact.matches("orchestration.start"));
        assert!(!exact.matches("orchestrationXstart"));

        let mixed = TopicPattern::compile("*.done").unwrap();
        assert!(mixed.matches("research.done"));
        assert!(!mixed.matches("a.research.done"));
        assert_eq!(mixed.as_str(), "*.done");
    }
}
